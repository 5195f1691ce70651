use crate::embeddings::{cosine_similarity, EmbeddingProvider};
use crate::error::{Result, VectorStoreError};
use crate::provider::{CallPolicy, ProviderError};
use crate::types::{EmbeddingRecord, IndexStats, RetrievalResult};
use advisor_text_chunker::Chunk;
use std::collections::{HashMap, HashSet};

/// Chunks embedded outside the index, merged later in one step so readers
/// never see half of a batch.
#[derive(Debug, Clone)]
pub struct EmbeddedBatch {
    model_id: String,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddedBatch {
    /// Embed `chunks` in provider calls of at most `batch_size` texts, each
    /// call under `policy`.
    pub async fn embed(
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
        policy: &CallPolicy,
        batch_size: usize,
    ) -> Result<Self> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for group in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = group.iter().map(|c| c.text.clone()).collect();
            let embedded = policy
                .run("embed batch", || provider.embed_batch(&texts))
                .await?;
            if embedded.len() != texts.len() {
                return Err(ProviderError::malformed(format!(
                    "provider returned {} vectors for {} texts",
                    embedded.len(),
                    texts.len()
                ))
                .into());
            }
            vectors.extend(embedded);
        }

        log::debug!(
            "Embedded {} chunks with {}",
            chunks.len(),
            provider.model_id()
        );

        Ok(Self {
            model_id: provider.model_id().to_string(),
            chunks,
            vectors,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// In-memory embedding index: chunk metadata plus one vector per chunk,
/// kept in ingestion order.
///
/// Single writer: `merge`/`add` take `&mut self`; share it behind a lock.
#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    model_id: String,
    dimension: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    ids: HashSet<String>,
    next_sequence: HashMap<String, usize>,
}

impl EmbeddingIndex {
    #[must_use]
    pub fn new(model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
            chunks: Vec::new(),
            vectors: Vec::new(),
            ids: HashSet::new(),
            next_sequence: HashMap::new(),
        }
    }

    #[must_use]
    pub fn for_provider(provider: &dyn EmbeddingProvider) -> Self {
        Self::new(provider.model_id(), provider.dimension())
    }

    /// Rebuild an index from persisted parts, validating every invariant.
    pub(crate) fn from_parts(
        model_id: String,
        dimension: usize,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        let mut index = Self::new(model_id.clone(), dimension);
        index.merge(EmbeddedBatch {
            model_id,
            chunks,
            vectors,
        })?;
        Ok(index)
    }

    /// Embed and append chunks
    pub async fn add(
        &mut self,
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
        policy: &CallPolicy,
        batch_size: usize,
    ) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let batch = EmbeddedBatch::embed(chunks, provider, policy, batch_size).await?;
        self.merge(batch)
    }

    /// Append an embedded batch. The batch is validated as a whole first;
    /// on error the index is unchanged.
    pub fn merge(&mut self, batch: EmbeddedBatch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        self.ensure_model(&batch.model_id)?;
        if batch.chunks.len() != batch.vectors.len() {
            return Err(VectorStoreError::CorruptSnapshot(format!(
                "{} chunks but {} vectors",
                batch.chunks.len(),
                batch.vectors.len()
            )));
        }

        let dimension = if self.chunks.is_empty() {
            batch.vectors[0].len()
        } else {
            self.dimension
        };

        let mut seen = HashSet::with_capacity(batch.len());
        for (chunk, vector) in batch.chunks.iter().zip(&batch.vectors) {
            if vector.len() != dimension {
                return Err(VectorStoreError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if self.ids.contains(&chunk.id) || !seen.insert(chunk.id.as_str()) {
                return Err(VectorStoreError::DuplicateChunk(chunk.id.clone()));
            }
        }
        if dimension != self.dimension {
            log::info!(
                "Index dimension set to {dimension} by first batch (configured {})",
                self.dimension
            );
            self.dimension = dimension;
        }

        let added = batch.len();
        for (chunk, vector) in batch.chunks.into_iter().zip(batch.vectors) {
            let next = self.next_sequence.entry(chunk.source.clone()).or_insert(0);
            *next = (*next).max(chunk.sequence_index + 1);
            self.ids.insert(chunk.id.clone());
            self.chunks.push(chunk);
            self.vectors.push(vector);
        }

        log::info!("Added {added} chunks to index. Total: {}", self.chunks.len());
        Ok(added)
    }

    /// Top-k chunks by cosine similarity to `query`.
    ///
    /// Ties go to the lower `sequence_index`, then to the earlier ingested
    /// chunk. An empty index yields no results.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, vector)| (pos, cosine_similarity(query, vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| {
                    self.chunks[a.0]
                        .sequence_index
                        .cmp(&self.chunks[b.0].sequence_index)
                })
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| RetrievalResult {
                chunk: self.chunks[pos].clone(),
                score,
            })
            .collect())
    }

    /// Fail when vectors from `active_model_id` would be compared against
    /// this index.
    pub fn ensure_model(&self, active_model_id: &str) -> Result<()> {
        if self.model_id == active_model_id {
            Ok(())
        } else {
            Err(VectorStoreError::ModelMismatch {
                stored: self.model_id.clone(),
                active: active_model_id.to_string(),
            })
        }
    }

    /// First unused sequence index for `source`
    #[must_use]
    pub fn next_sequence_index(&self, source: &str) -> usize {
        self.next_sequence.get(source).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Chunk ids paired with their vectors, in insertion order
    pub fn records(&self) -> impl Iterator<Item = EmbeddingRecord<'_>> {
        self.chunks
            .iter()
            .zip(&self.vectors)
            .map(|(chunk, vector)| EmbeddingRecord {
                chunk_id: &chunk.id,
                vector: vector.as_slice(),
            })
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            chunks: self.chunks.len(),
            sources: self.next_sequence.len(),
            model_id: self.model_id.clone(),
            dimension: self.dimension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::StubEmbedder;
    use pretty_assertions::assert_eq;

    fn chunk(source: &str, seq: usize, text: &str) -> Chunk {
        Chunk::new(source, seq, 0, text.to_string())
    }

    fn batch(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> EmbeddedBatch {
        EmbeddedBatch {
            model_id: "test".to_string(),
            chunks,
            vectors,
        }
    }

    #[test]
    fn test_search_orders_by_cosine() {
        let mut index = EmbeddingIndex::new("test", 3);
        index
            .merge(batch(
                vec![chunk("a", 0, "x"), chunk("a", 1, "y"), chunk("b", 0, "z")],
                vec![vec![1.0, 0.0, 0.0], vec![0.9, 0.1, 0.0], vec![0.0, 1.0, 0.0]],
            ))
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "a#0");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[1].chunk.id, "a#1");
        assert!(results[1].score > 0.9);
    }

    #[test]
    fn test_search_empty_index_returns_empty() {
        let index = EmbeddingIndex::new("test", 3);
        assert!(index.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
        assert!(index.search(&[1.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_k_larger_than_index() {
        let mut index = EmbeddingIndex::new("test", 2);
        index
            .merge(batch(
                vec![chunk("a", 0, "x"), chunk("a", 1, "y"), chunk("a", 2, "z")],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            ))
            .unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 5).unwrap().len(), 3);
    }

    #[test]
    fn test_ties_prefer_lower_sequence_then_ingestion_order() {
        let mut index = EmbeddingIndex::new("test", 2);
        index
            .merge(batch(
                vec![chunk("b", 3, "x"), chunk("a", 1, "y"), chunk("c", 1, "z")],
                vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]],
            ))
            .unwrap();

        let ids: Vec<String> = index
            .search(&[1.0, 0.0], 3)
            .unwrap()
            .into_iter()
            .map(|r| r.chunk.id)
            .collect();
        assert_eq!(ids, vec!["a#1", "c#1", "b#3"]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = EmbeddingIndex::new("test", 2);
        let err = index
            .merge(batch(
                vec![chunk("a", 0, "x"), chunk("a", 1, "y")],
                vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
            ))
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::InvalidDimension { .. }));
        assert!(index.is_empty(), "failed batch must not be partially merged");

        index
            .merge(batch(vec![chunk("a", 0, "x")], vec![vec![1.0, 0.0]]))
            .unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut index = EmbeddingIndex::new("test", 2);
        index
            .merge(batch(vec![chunk("a", 0, "x")], vec![vec![1.0, 0.0]]))
            .unwrap();
        let err = index
            .merge(batch(vec![chunk("a", 0, "again")], vec![vec![0.0, 1.0]]))
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::DuplicateChunk(id) if id == "a#0"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_next_sequence_index_tracks_sources() {
        let mut index = EmbeddingIndex::new("test", 2);
        assert_eq!(index.next_sequence_index("kb"), 0);
        index
            .merge(batch(
                vec![chunk("kb", 0, "x"), chunk("kb", 1, "y"), chunk("doc", 0, "z")],
                vec![vec![1.0, 0.0]; 3],
            ))
            .unwrap();
        assert_eq!(index.next_sequence_index("kb"), 2);
        assert_eq!(index.next_sequence_index("doc"), 1);
        assert_eq!(index.stats().sources, 2);
    }

    #[test]
    fn test_model_mismatch_rejected() {
        let index = EmbeddingIndex::new("stub/a/8", 8);
        assert!(index.ensure_model("stub/a/8").is_ok());
        let err = index.ensure_model("stub/b/8").unwrap_err();
        assert!(matches!(err, VectorStoreError::ModelMismatch { .. }));
    }

    #[tokio::test]
    async fn test_add_embeds_in_batches() {
        let stub = StubEmbedder::new("v1", 16);
        let mut index = EmbeddingIndex::for_provider(&stub);
        let chunks = (0..5).map(|i| chunk("doc", i, &format!("text {i}"))).collect();

        let added = index
            .add(chunks, &stub, &CallPolicy::default(), 2)
            .await
            .unwrap();
        assert_eq!(added, 5);
        assert_eq!(stub.batch_calls(), 3);
        assert_eq!(index.records().count(), 5);
        assert!(index.records().all(|r| r.vector.len() == 16));
    }
}
