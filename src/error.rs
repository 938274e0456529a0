use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("No documents found: {0}")]
    MissingInput(String),

    #[error("Vector store not found at '{}'. Run `secrag build` first to create it.", .0.display())]
    MissingIndex(PathBuf),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Invalid chunking parameters: overlap {overlap} must be smaller than \
         chunk size {chunk_size}"
    )]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("Corrupt vector store: {0}")]
    CorruptStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::ExternalService(err.to_string())
    }
}
