use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error on {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] advisor_text_chunker::ChunkerError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] advisor_vector_store::VectorStoreError),

    #[error("Failed to read PDF {path}: {message}")]
    PdfError { path: PathBuf, message: String },

    #[error("Invalid document path: {0}")]
    InvalidPath(String),
}

impl IndexerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn pdf(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::PdfError {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
