use crate::error::{RagError, Result};
use advisor_vector_store::{CallPolicy, EmbeddingIndex, EmbeddingProvider, RetrievalResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Embeds questions with the ingestion provider and searches the index
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    policy: CallPolicy,
    default_k: usize,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, policy: CallPolicy, default_k: usize) -> Self {
        Self {
            provider,
            policy,
            default_k,
        }
    }

    /// Validate the request and resolve `k`
    pub fn check(&self, query: &str, k: Option<usize>) -> Result<usize> {
        if query.trim().is_empty() {
            return Err(RagError::input("question must not be empty"));
        }
        match k.unwrap_or(self.default_k) {
            0 => Err(RagError::input("k must be at least 1")),
            k => Ok(k),
        }
    }

    /// Embed a validated query
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let vector = self
            .policy
            .run("embed query", || self.provider.embed(query))
            .await?;
        Ok(vector)
    }

    /// Top-k chunks for `query`, best first
    pub async fn retrieve(
        &self,
        index: &EmbeddingIndex,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<RetrievalResult>> {
        let k = self.check(query, k)?;
        index.ensure_model(self.provider.model_id())?;
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embed_query(query).await?;
        self.search(index, &vector, k)
    }

    /// Search with an already embedded query
    pub fn search(
        &self,
        index: &EmbeddingIndex,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        index.ensure_model(self.provider.model_id())?;
        let results = index.search(vector, k)?;
        log::debug!(
            "Retrieved {} chunks (top score {:.3})",
            results.len(),
            results.first().map_or(0.0, |r| r.score)
        );
        Ok(results)
    }
}
