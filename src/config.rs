

use crate::errors::{GloveError, Result};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, fs::File, io::BufReader, path::Path};

/// Update rule applied to each co-occurrence example.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Optimizer {
    /// plain stochastic gradient descent with a fixed learning rate
    #[default]
    Sgd,
    /// per-component learning rates scaled by accumulated squared gradients
    Adagrad,
}

impl Display for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Optimizer::Sgd => write!(f, "sgd"),
            Optimizer::Adagrad => write!(f, "adagrad"),
        }
    }
}

/// Hyper parameters of the fitting stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainParams {
    #[serde(default = "defaults::max_iter")]
    pub max_iter: usize,
    #[serde(default = "defaults::embedding_dim")]
    pub embedding_dim: usize,
    #[serde(default = "defaults::learning_rate")]
    pub learning_rate: f32,
    /// co-occurrence weight at which the loss weighting saturates to 1
    #[serde(default = "defaults::x_max")]
    pub x_max: f32,
    /// exponent of the loss weighting below `x_max`
    #[serde(default = "defaults::alpha")]
    pub alpha: f32,
    #[serde(default)]
    pub optimizer: Optimizer,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            max_iter: defaults::max_iter(),
            embedding_dim: defaults::embedding_dim(),
            learning_rate: defaults::learning_rate(),
            x_max: defaults::x_max(),
            alpha: defaults::alpha(),
            optimizer: Optimizer::default(),
            seed: None,
        }
    }
}

impl Display for TrainParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "training hyper parameters:
        max_iter: {},
        embedding_dim: {},
        learning_rate: {},
        x_max: {},
        alpha: {},
        optimizer: {},
        seed: {:?}",
        self.max_iter, self.embedding_dim, self.learning_rate, self.x_max, self.alpha, self.optimizer, self.seed
        )
    }
}

impl TrainParams {

    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(GloveError::Config("max_iter must be positive".into()));
        }
        if self.embedding_dim == 0 {
            return Err(GloveError::Config("embedding_dim must be positive".into()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(GloveError::Config(format!("learning_rate {} must be positive", self.learning_rate)));
        }
        if !(self.x_max > 0.0) {
            return Err(GloveError::Config(format!("x_max {} must be positive", self.x_max)));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(GloveError::Config(format!("alpha {} must be in (0, 1]", self.alpha)));
        }
        Ok(())
    }

}

/// Run level parameters, read from a flat json object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub corpus_file: String,
    pub output_dir: String,
    #[serde(default = "defaults::window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub max_vocab_size: Option<usize>,
    #[serde(default = "defaults::num_threads_cooc")]
    pub num_threads_cooc: usize,
    /// skip counting and load `cooc.bin.gz` and `words.json` from `output_dir`
    #[serde(default)]
    pub saved_counts: bool,
    #[serde(flatten)]
    pub train: TrainParams,
}

impl Display for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using hyper-params:
        corpus_file: {}
        output_dir: {}
        window_size: {}
        max_vocab_size: {:?}
        num_threads_cooc: {}
        saved_counts: {},
        Using {}",
        self.corpus_file, self.output_dir, self.window_size, self.max_vocab_size, self.num_threads_cooc, self.saved_counts, self.train)
    }
}

impl Params {

    /// Parameters with defaults for everything but the two paths.
    pub fn new(corpus_file: &str, output_dir: &str) -> Params {
        Params {
            corpus_file: corpus_file.to_owned(),
            output_dir: output_dir.to_owned(),
            window_size: defaults::window_size(),
            max_vocab_size: None,
            num_threads_cooc: defaults::num_threads_cooc(),
            saved_counts: false,
            train: TrainParams::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(GloveError::Config("window_size must be positive".into()));
        }
        if self.num_threads_cooc == 0 {
            return Err(GloveError::Config("num_threads_cooc must be positive".into()));
        }
        if self.max_vocab_size == Some(0) {
            return Err(GloveError::Config("max_vocab_size must be positive when given".into()));
        }
        self.train.validate()
    }

}

pub struct Config {
    params: Params
}

impl Config {

    pub fn get_params(&self) -> Params {
        self.params.clone()
    }

    pub fn from_json(json: &str) -> Result<Config> {
        let params: Params = serde_json::from_str(json)?;
        params.validate()?;
        Ok(Self { params })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let f = BufReader::new(File::open(path)?);
        let params: Params = serde_json::from_reader(f)?;
        params.validate()?;
        Ok(Self { params })
    }

}

mod defaults {
    pub fn window_size() -> usize { 10 }
    pub fn num_threads_cooc() -> usize { 4 }
    pub fn max_iter() -> usize { 50 }
    pub fn embedding_dim() -> usize { 300 }
    pub fn learning_rate() -> f32 { 0.05 }
    pub fn x_max() -> f32 { 100.0 }
    pub fn alpha() -> f32 { 0.75 }
}


pub mod files_handling {

    // reading and saving the artifacts of a run under one output directory,
    // the file extension is decided by the type that is saved.

    use crate::errors::Result;
    use std::{fs, path::{Path, PathBuf}};

    pub fn read_input<R: ReadFile>(input_dir: &str, file_name: &str) -> Result<R> {
        let path = Path::new(input_dir).join(format!("{}.{}", file_name, R::EXTENSION));
        R::read_file(&path)
    }

    pub fn save_output<S: SaveFile>(output_dir: &str, file_name: &str, item: &S) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)?;
        let path = Path::new(output_dir).join(format!("{}.{}", file_name, S::EXTENSION));
        item.save_file(&path)?;
        Ok(path)
    }

    pub trait ReadFile: Sized {
        const EXTENSION: &'static str;
        fn read_file(path: &Path) -> Result<Self>;
    }

    pub trait SaveFile {
        const EXTENSION: &'static str;
        fn save_file(&self, path: &Path) -> Result<()>;
    }

}
