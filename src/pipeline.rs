
// imports
use crate::config::files_handling::{read_input, save_output};
use crate::config::Params;
use crate::cooccurrence::CooccurrenceTable;
use crate::embeddings::Embeddings;
use crate::errors::Result;
use crate::train::Trainer;
use crate::vocab::Vocabulary;

use ndarray_stats::QuantileExt;
use std::fs::File;
use std::time::Instant;
use tracing::{info, warn};

pub struct Pipeline {}

impl Pipeline {

    // runs the main procedure of 3 steps -
    // -> cooccurrences counting (or loading the saved counts)
    // -> training
    // -> saving the vectors as `vecs.npy` and `vectors.txt`

    pub fn run(params: &Params) -> Result<Embeddings> {

        info!("{}", params);
        let output_dir = params.output_dir.as_str();

        let mut trainer = if params.saved_counts {

            let vocab: Vocabulary = read_input(output_dir, "words")?;
            let table: CooccurrenceTable = read_input(output_dir, "cooc")?;
            info!(vocab_size = vocab.size(), pairs = table.len(), "loaded saved counts");
            Trainer::from_counts(params, vocab, table)?

        } else {

            let timer = Instant::now();
            info!("starting vocab building...");

            let mut trainer = Trainer::new(params)?;
            trainer.preprocess(File::open(&params.corpus_file)?)?;

            save_output(output_dir, "cooc", trainer.table())?;
            save_output(output_dir, "words", trainer.vocab())?;
            info!(secs = timer.elapsed().as_secs(), "finished creation and saved vocab");
            trainer

        };

        // run training part
        let timer = Instant::now();
        info!("starting training part...");
        trainer.train()?;

        let embeddings = trainer.embeddings()?;
        save_output(output_dir, "vecs", embeddings.vectors())?;
        let path = save_output(output_dir, "vectors", &embeddings)?;

        match embeddings.vectors().mapv(f32::abs).max() {
            Ok(largest) => info!(largest = *largest, "largest vector component"),
            Err(e) => warn!("vectors have no well defined maximum: {}", e),
        }
        info!(secs = timer.elapsed().as_secs(), path = %path.display(), "finished training, saved vecs");

        Ok(embeddings)
    }

}
