use crate::document::Document;
use crate::error::Result;
use crate::stats::IngestStats;
use advisor_text_chunker::{Chunk, Chunker};
use advisor_vector_store::{CallPolicy, EmbeddedBatch, EmbeddingIndex, EmbeddingProvider};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Chunks documents and embeds them for an [`EmbeddingIndex`]
pub struct DocumentIndexer {
    chunker: Chunker,
    provider: Arc<dyn EmbeddingProvider>,
    policy: CallPolicy,
    batch_size: usize,
}

/// Chunks ready to embed, with the counts of the run that produced them
#[derive(Debug, Clone)]
pub struct PreparedChunks {
    pub chunks: Vec<Chunk>,
    pub stats: IngestStats,
}

impl DocumentIndexer {
    pub fn new(
        chunker: Chunker,
        provider: Arc<dyn EmbeddingProvider>,
        policy: CallPolicy,
        batch_size: usize,
    ) -> Self {
        Self {
            chunker,
            provider,
            policy,
            batch_size: batch_size.max(1),
        }
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Normalize and chunk `documents`.
    ///
    /// Sequence numbers continue per source from `next_sequence`, so chunk
    /// ids stay unique across ingestions and across documents that share a
    /// source.
    pub fn prepare(
        &self,
        documents: &[Document],
        next_sequence: impl Fn(&str) -> usize,
    ) -> PreparedChunks {
        let mut counters: HashMap<&str, usize> = HashMap::new();
        let mut stats = IngestStats::new();
        let mut chunks = Vec::new();

        for document in documents {
            let text = document.normalized_text();
            let counter = counters
                .entry(document.source.as_str())
                .or_insert_with(|| next_sequence(&document.source));

            for mut chunk in self.chunker.split(&text, &document.source) {
                chunk.renumber(*counter);
                *counter += 1;
                stats.add_chunk(&chunk.source);
                chunks.push(chunk.with_page(document.page));
            }
        }

        stats.add_documents(documents.len());
        log::debug!(
            "Prepared {} chunks from {} documents",
            chunks.len(),
            documents.len()
        );
        PreparedChunks { chunks, stats }
    }

    /// Embed prepared chunks without touching any index
    pub async fn embed(&self, chunks: Vec<Chunk>) -> Result<EmbeddedBatch> {
        let batch =
            EmbeddedBatch::embed(chunks, self.provider.as_ref(), &self.policy, self.batch_size)
                .await?;
        Ok(batch)
    }

    /// Chunk, embed and merge `documents` into an index owned by the caller.
    pub async fn index_documents(
        &self,
        index: &mut EmbeddingIndex,
        documents: &[Document],
    ) -> Result<IngestStats> {
        let started = Instant::now();
        index.ensure_model(self.provider.model_id())?;

        let PreparedChunks { chunks, mut stats } =
            self.prepare(documents, |source| index.next_sequence_index(source));
        let batch = self.embed(chunks).await?;
        index.merge(batch)?;

        stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::info!(
            "Indexed {} documents into {} chunks in {}ms",
            stats.documents,
            stats.chunks,
            stats.time_ms
        );
        Ok(stats)
    }
}
