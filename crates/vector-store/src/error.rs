use crate::provider::ProviderError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Embedding provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Duplicate chunk id: {0}")]
    DuplicateChunk(String),

    #[error("Embedding model mismatch: index built with '{stored}', active provider is '{active}'")]
    ModelMismatch { stored: String, active: String },

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Snapshot lock error: {0}")]
    Lock(String),
}
