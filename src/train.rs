

use crate::config::{Params, TrainParams};
use crate::cooccurrence::CooccurrenceTable;
use crate::embeddings::Embeddings;
use crate::errors::{GloveError, Result};
use crate::factors::{FactorStore, PairGrads, PairRows, Role};
use crate::vocab::{Tokenizer, Vocabulary, WhitespaceTokenizer};

use ndarray::Zip;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};


// number of lines tokenized before a batch is counted in parallel
const BATCH_LINES: usize = 100_000;

/// Lets another thread ask a running `train` to stop once the current epoch ends.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// One directed training example: `i` in the main role, `j` as context, and their weight.
type Example = (usize, usize, f32);

/// A GloVe model for one training run.
///
/// Owns the vocabulary, the co-occurrence table and the factor matrices.
/// `preprocess` fills the first two and allocates the third, `train` fits it.
pub struct Trainer<T: Tokenizer = WhitespaceTokenizer> {
    params: TrainParams,
    window_size: usize,
    num_threads: usize,
    max_vocab_size: Option<usize>,
    tokenizer: T,
    vocab: Vocabulary,
    table: CooccurrenceTable,
    factors: FactorStore,
    rng: StdRng,
    stop: StopHandle,
}

impl Trainer<WhitespaceTokenizer> {

    pub fn new(params: &Params) -> Result<Self> {
        Trainer::with_tokenizer(params, WhitespaceTokenizer)
    }

    /// A trainer over counts saved by an earlier run, ready to `train`.
    pub fn from_counts(params: &Params, mut vocab: Vocabulary, mut table: CooccurrenceTable) -> Result<Self> {

        if table.bound() > vocab.size() {
            return Err(GloveError::InvalidId { id: table.bound() - 1, bound: vocab.size() });
        }

        vocab.seal();
        table.set_bound(vocab.size());

        let mut trainer = Trainer::new(params)?;
        trainer.vocab = vocab;
        trainer.table = table;
        trainer.allocate()?;
        Ok(trainer)
    }

}

impl<T: Tokenizer> Trainer<T> {

    /// Fails with `Config` when `params` does not validate.
    pub fn with_tokenizer(params: &Params, tokenizer: T) -> Result<Self> {

        params.validate()?;

        Ok(Self {
            params: params.train.clone(),
            window_size: params.window_size,
            num_threads: params.num_threads_cooc,
            max_vocab_size: params.max_vocab_size,
            tokenizer,
            vocab: Self::empty_vocab(params.max_vocab_size),
            table: CooccurrenceTable::new(0),
            factors: FactorStore::default(),
            rng: Self::seeded(params.train.seed),
            stop: StopHandle::default(),
        })
    }

    fn empty_vocab(max_vocab_size: Option<usize>) -> Vocabulary {
        match max_vocab_size {
            Some(max) => Vocabulary::with_max_size(max),
            None => Vocabulary::new(),
        }
    }

    fn seeded(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn table(&self) -> &CooccurrenceTable {
        &self.table
    }

    pub fn factors(&self) -> &FactorStore {
        &self.factors
    }

    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Forgets the vocabulary, the counts and the factors, and withdraws a pending stop request.
    pub fn reset(&mut self) {
        self.vocab = Self::empty_vocab(self.max_vocab_size);
        self.table.clear();
        self.factors.reset();
        self.rng = Self::seeded(self.params.seed);
        self.stop.clear();
    }

    /// Builds the vocabulary and the co-occurrence counts from a corpus,
    /// then allocates the factor matrices.
    ///
    /// The stream is read from its start. Lines are tokenized and mapped to
    /// ids sequentially, while counting a batch of lines is spread over
    /// `num_threads_cooc` workers. Any read error aborts with `Scan` and
    /// leaves the trainer empty, as after `reset`.
    pub fn preprocess<S: Read + Seek>(&mut self, stream: S) -> Result<()> {

        if self.vocab.is_sealed() {
            return Err(GloveError::AlreadyPreprocessed);
        }

        let counted = self.count(stream);
        if counted.is_err() {
            // partial counts must not leak into the next attempt
            self.reset();
        }
        counted
    }

    fn count<S: Read + Seek>(&mut self, mut stream: S) -> Result<()> {

        let timer = Instant::now();
        stream.seek(SeekFrom::Start(0)).map_err(GloveError::Scan)?;
        let pool = ThreadPoolBuilder::new().num_threads(self.num_threads).build()?;

        let mut batch: Vec<Vec<usize>> = Vec::new();
        let mut n_lines = 0usize;
        for line in BufReader::new(stream).lines() {
            let line = line.map_err(GloveError::Scan)?;
            batch.push(self.to_ids(&line)?);
            n_lines += 1;

            if batch.len() == BATCH_LINES {
                self.count_batch(&pool, &batch)?;
                batch.clear();
                debug!(n_lines, pairs = self.table.len(), "counted batch");
            }
        }
        self.count_batch(&pool, &batch)?;

        self.vocab.seal();
        info!(
            lines = n_lines,
            vocab_size = self.vocab.size(),
            pairs = self.table.len(),
            secs = timer.elapsed().as_secs(),
            "finished counting co-occurrences"
        );

        self.allocate()
    }

    fn to_ids(&mut self, line: &str) -> Result<Vec<usize>> {
        let mut ids = Vec::new();
        for token in self.tokenizer.tokenize(line) {
            // tokens past a full vocabulary are dropped like unknown words
            if let Some(id) = self.vocab.intern(&token)? {
                ids.push(id);
            }
        }
        self.table.set_bound(self.vocab.size());
        Ok(ids)
    }

    // every worker counts a contiguous chunk of lines into its own table, the
    // partial tables are merged in chunk order so reruns sum in the same order
    fn count_batch(&mut self, pool: &ThreadPool, batch: &[Vec<usize>]) -> Result<()> {

        if batch.is_empty() {
            return Ok(());
        }

        let window_size = self.window_size;
        let bound = self.vocab.size();
        let chunk_len = (batch.len() + self.num_threads - 1) / self.num_threads;

        let partials: Vec<CooccurrenceTable> = pool.install(|| {
            batch.par_chunks(chunk_len.max(1)).map(|chunk| {
                let mut local = CooccurrenceTable::new(bound);
                for ids in chunk {
                    local.scan(ids, window_size)?;
                }
                Ok(local)
            }).collect::<Result<Vec<CooccurrenceTable>>>()
        })?;

        for partial in partials {
            self.table.merge(partial);
        }
        Ok(())
    }

    fn allocate(&mut self) -> Result<()> {
        if self.vocab.is_empty() {
            warn!("empty vocabulary, factor matrices are not allocated");
            return Ok(());
        }
        self.factors.allocate(self.vocab.size(), self.params.embedding_dim, self.params.optimizer, &mut self.rng)
    }

    // both directions of every merged pair
    fn examples(&self) -> Vec<Example> {
        self.table
            .entries()
            .flat_map(|(pair, x)| [(pair.i, pair.j, x), (pair.j, pair.i, x)])
            .collect()
    }

    /// Runs `max_iter` epochs of weighted least squares updates over all pairs.
    ///
    /// Every epoch visits each pair in both directions in a fresh random order.
    /// Returns the mean weighted loss of each epoch that ran. A stop request
    /// ends this run after the current epoch and is then cleared.
    pub fn train(&mut self) -> Result<Vec<f32>> {

        if !self.factors.is_allocated() {
            return Err(GloveError::NotInitialized);
        }

        info!("{}", self.params);
        let mut losses = Vec::with_capacity(self.params.max_iter);
        let mut examples = self.examples();

        for epoch in 0..self.params.max_iter {

            let timer = Instant::now();
            examples.shuffle(&mut self.rng);

            let mut epoch_loss = 0.0f64;
            for &(i, j, x) in &examples {
                epoch_loss += self.step(i, j, x)? as f64;
            }

            let mean_loss = if examples.is_empty() { 0.0 } else { (epoch_loss / examples.len() as f64) as f32 };
            info!(epoch, loss = mean_loss, secs = timer.elapsed().as_secs_f32(), "finished epoch");
            losses.push(mean_loss);

            if self.stop.is_stopped() {
                // a request stops one run only
                self.stop.clear();
                info!(epoch, "stop requested, leaving training");
                break;
            }
        }

        Ok(losses)
    }

    /// Mean weighted squared error over both directions of every pair.
    pub fn loss(&self) -> Result<f32> {

        if !self.factors.is_allocated() {
            return Err(GloveError::NotInitialized);
        }

        let examples = self.examples();
        if examples.is_empty() {
            return Ok(0.0);
        }

        let mut total = 0.0f64;
        for &(i, j, x) in &examples {
            let w_i = self.factors.vector(Role::Main, i)?;
            let w_j = self.factors.vector(Role::Context, j)?;
            let diff = w_i.dot(&w_j) + self.factors.bias(Role::Main, i)? + self.factors.bias(Role::Context, j)? - x.ln();
            let weight = weighting_x(x, self.params.x_max, self.params.alpha);
            total += (0.5 * weight * diff * diff) as f64;
        }
        Ok((total / examples.len() as f64) as f32)
    }

    // one gradient step on the example (i as main, j as context), returns its loss
    fn step(&mut self, i: usize, j: usize, x: f32) -> Result<f32> {

        assert!(x > 0.0, "co-occurrence weight {} of ({}, {}) must be positive", x, i, j);

        let TrainParams { learning_rate, x_max, alpha, .. } = self.params;
        let weight = weighting_x(x, x_max, alpha);

        let PairRows { mut main, mut context, main_bias, context_bias, grads } = self.factors.pair_mut(i, j)?;

        let diff = main.dot(&context) + *main_bias + *context_bias - x.ln();
        let loss = 0.5 * weight * diff * diff;
        let fdiff = weight * diff;

        // both gradients are taken before either row moves
        let dl_dw_tok = &context * fdiff;
        let dl_dw_context = &main * fdiff;

        match grads {
            None => {
                main.scaled_add(-learning_rate, &dl_dw_tok);
                context.scaled_add(-learning_rate, &dl_dw_context);
                *main_bias -= learning_rate * fdiff;
                *context_bias -= learning_rate * fdiff;
            }
            Some(PairGrads { main: mut g_main, context: mut g_context, main_bias: g_main_bias, context_bias: g_context_bias }) => {
                Zip::from(&mut main).and(&dl_dw_tok).and(&g_main)
                    .for_each(|w, &g, &ag| *w -= learning_rate * g / ag.sqrt());
                Zip::from(&mut context).and(&dl_dw_context).and(&g_context)
                    .for_each(|w, &g, &ag| *w -= learning_rate * g / ag.sqrt());
                *main_bias -= learning_rate * fdiff / g_main_bias.sqrt();
                *context_bias -= learning_rate * fdiff / g_context_bias.sqrt();

                Zip::from(&mut g_main).and(&dl_dw_tok).for_each(|ag, &g| *ag += g * g);
                Zip::from(&mut g_context).and(&dl_dw_context).for_each(|ag, &g| *ag += g * g);
                *g_main_bias += fdiff * fdiff;
                *g_context_bias += fdiff * fdiff;
            }
        }

        Ok(loss)
    }

    /// Word vectors of the fitted model, see [`FactorStore::export`].
    pub fn embeddings(&self) -> Result<Embeddings> {
        Embeddings::new(self.vocab.words().to_vec(), self.factors.export()?)
    }

}

/// `min(1, (x / x_max)^alpha)`, keeps frequent pairs from dominating the loss.
pub fn weighting_x(x: f32, x_max: f32, alpha: f32) -> f32 {
    if x < x_max {
        (x / x_max).powf(alpha)
    } else {
        1.0
    }
}
