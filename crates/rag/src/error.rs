use advisor_indexer::IndexerError;
use advisor_vector_store::{ProviderError, VectorStoreError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

/// Failure taxonomy surfaced to callers of the engine
#[derive(Error, Debug)]
pub enum RagError {
    /// Bad question, bad `k` or unreadable ingestion input; never retried
    #[error("Invalid input: {0}")]
    Input(String),

    /// Embedding or generation provider failed after the retry budget
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Index and active embedding provider disagree
    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RagError {
    pub(crate) fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }
}

impl From<VectorStoreError> for RagError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::Provider(err) => Self::Provider(err),
            VectorStoreError::ModelMismatch { .. }
            | VectorStoreError::InvalidDimension { .. }
            | VectorStoreError::DuplicateChunk(_) => Self::Consistency(err.to_string()),
            VectorStoreError::Config(message) => Self::Config(message),
            VectorStoreError::IoError(_)
            | VectorStoreError::SerializationError(_)
            | VectorStoreError::CorruptSnapshot(_)
            | VectorStoreError::Lock(_) => Self::Persistence(err.to_string()),
        }
    }
}

impl From<IndexerError> for RagError {
    fn from(err: IndexerError) -> Self {
        match err {
            IndexerError::VectorStoreError(err) => err.into(),
            IndexerError::ChunkerError(err) => Self::Config(err.to_string()),
            IndexerError::IoError { .. }
            | IndexerError::PdfError { .. }
            | IndexerError::InvalidPath(_) => Self::Input(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_vector_store::ProviderErrorKind;

    #[test]
    fn vector_store_errors_map_onto_taxonomy() {
        let mismatch = VectorStoreError::ModelMismatch {
            stored: "stub/a/8".into(),
            active: "stub/b/8".into(),
        };
        assert!(matches!(RagError::from(mismatch), RagError::Consistency(_)));

        let timeout = VectorStoreError::Provider(ProviderError::timeout("slow"));
        assert!(matches!(
            RagError::from(timeout),
            RagError::Provider(ProviderError { kind: ProviderErrorKind::Timeout, .. })
        ));

        let lock = VectorStoreError::Lock("busy".into());
        assert!(matches!(RagError::from(lock), RagError::Persistence(_)));
    }

    #[test]
    fn indexer_io_errors_are_input_errors() {
        let err = IndexerError::InvalidPath("/nope".into());
        assert!(matches!(RagError::from(err), RagError::Input(_)));
    }
}
