
// error types shared by the counting, fitting and export stages

use std::io;

/// Result type used across the crate, defaults to [`GloveError`].
pub type Result<T, E = GloveError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum GloveError {
    /// A pair referenced a word id outside the current vocabulary bound.
    #[error("word id {id} is outside the vocabulary bound {bound}")]
    InvalidId { id: usize, bound: usize },

    /// The factor matrices were allocated twice without a reset.
    #[error("factor matrices are already allocated")]
    AlreadyAllocated,

    /// Training or row access was attempted before allocation.
    #[error("factor matrices are not allocated, run preprocessing first")]
    NotInitialized,

    /// A row was requested past the number of allocated rows.
    #[error("row {id} is out of range for {rows} rows")]
    OutOfRange { id: usize, rows: usize },

    /// The corpus stream failed while scanning.
    #[error("unable to complete scanning: {0}")]
    Scan(#[source] io::Error),

    /// The corpus was already preprocessed, the trainer must be reset first.
    #[error("corpus was already preprocessed, reset the trainer first")]
    AlreadyPreprocessed,

    #[error("vocabulary is sealed, cannot add '{0}'")]
    VocabularySealed(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed embeddings at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("token '{0}' is not in the vocabulary")]
    UnknownWord(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error(transparent)]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
