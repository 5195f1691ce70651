use crate::generation::GenerationConfig;
use crate::retriever::RetrievalConfig;
use advisor_text_chunker::ChunkerConfig;
use advisor_vector_store::EmbeddingConfig;
use serde::{Deserialize, Serialize};

/// Typed settings for a [`crate::RagEngine`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub chunking: ChunkerConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
}
