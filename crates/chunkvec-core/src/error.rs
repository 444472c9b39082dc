use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cosine similarity is undefined for a zero-norm vector")]
    ZeroVector,

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Wraps an embedder failure, keeping the whole context chain in the message.
    pub fn embedding(err: &anyhow::Error) -> Self {
        Self::Embedding(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
