use advisor_text_chunker::Chunk;
use serde::{Deserialize, Serialize};

/// One chunk id and its vector, 1:1 with the chunks of an index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddingRecord<'a> {
    pub chunk_id: &'a str,
    pub vector: &'a [f32],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    /// Cosine similarity, higher is more relevant
    pub score: f32,
}

/// Summary of an index, cheap to compute and safe to print
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub chunks: usize,
    pub sources: usize,
    pub model_id: String,
    pub dimension: usize,
}
