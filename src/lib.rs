pub mod config;
pub mod cooccurrence;
pub mod embeddings;
pub mod errors;
pub mod factors;
pub mod pipeline;
pub mod similarity;
pub mod train;
pub mod vocab;

pub use config::{files_handling, Config, Optimizer, Params, TrainParams};
pub use cooccurrence::{CooccurrenceTable, Pair};
pub use embeddings::Embeddings;
pub use errors::{GloveError, Result};
pub use factors::{FactorStore, Role};
pub use pipeline::Pipeline;
pub use similarity::Similarity;
pub use train::{StopHandle, Trainer};
pub use vocab::{Tokenizer, Vocabulary, WhitespaceTokenizer};
