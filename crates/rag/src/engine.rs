use crate::answer::{Answer, AnswerGenerator};
use crate::config::EngineConfig;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::retriever::Retriever;
use advisor_indexer::{Document, DocumentIndexer, IngestStats, KnowledgeBase, PreparedChunks};
use advisor_text_chunker::Chunker;
use advisor_vector_store::{
    EmbeddingIndex, EmbeddingProvider, IndexStats, RetrievalResult, SnapshotStore,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// How [`RagEngine::bootstrap`] obtained its index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// Snapshot loaded from disk
    Loaded { chunks: usize },
    /// Snapshot missing or corrupt; rebuilt from the knowledge base and saved
    Rebuilt(IngestStats),
    /// Nothing on disk and no knowledge base to rebuild from
    Empty,
}

/// Question-answering engine over one embedding index.
///
/// Queries take the index read lock; ingestion embeds outside any lock and
/// holds the write lock only while merging, so readers never see half a
/// batch. Ingestions are serialized by a separate mutex.
pub struct RagEngine {
    index: RwLock<EmbeddingIndex>,
    ingest_lock: Mutex<()>,
    indexer: DocumentIndexer,
    retriever: Retriever,
    generator: AnswerGenerator,
    store: Option<SnapshotStore>,
}

impl RagEngine {
    /// Engine with an empty in-memory index
    pub fn new(
        config: &EngineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        let chunker =
            Chunker::new(config.chunking).map_err(|err| RagError::Config(err.to_string()))?;
        let embed_policy = config.embedding.call_policy();
        let generation = &config.generation;

        Ok(Self {
            index: RwLock::new(EmbeddingIndex::for_provider(embedder.as_ref())),
            ingest_lock: Mutex::new(()),
            indexer: DocumentIndexer::new(
                chunker,
                Arc::clone(&embedder),
                embed_policy,
                config.embedding.batch_size,
            ),
            retriever: Retriever::new(embedder, embed_policy, config.retrieval.top_k),
            generator: AnswerGenerator::new(
                generator,
                generation.call_policy(),
                generation.options(),
                generation.system_prompt.clone(),
            ),
            store: None,
        })
    }

    /// Persist to and load from `store`
    #[must_use]
    pub fn with_snapshot(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        self.indexer.provider().model_id()
    }

    /// Answer `question` from the top `top_k` chunks
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with_k(question, None).await
    }

    pub async fn ask_with_k(&self, question: &str, k: Option<usize>) -> Result<Answer> {
        let started = Instant::now();
        let retrieved = self.retrieve(question, k).await?;
        let answer = self.generator.answer(question, retrieved).await?;
        log::info!(
            "Answered with {} sources in {}ms",
            answer.citations.len(),
            started.elapsed().as_millis()
        );
        Ok(answer)
    }

    /// Top-k chunks for `query` without generating an answer
    pub async fn retrieve(&self, query: &str, k: Option<usize>) -> Result<Vec<RetrievalResult>> {
        let k = self.retriever.check(query, k)?;
        {
            let index = self.index.read().await;
            index.ensure_model(self.model_id())?;
            if index.is_empty() {
                return Ok(Vec::new());
            }
        }

        let vector = self.retriever.embed_query(query).await?;
        let index = self.index.read().await;
        self.retriever.search(&index, &vector, k)
    }

    /// Chunk, embed and append `documents`. Does not save.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestStats> {
        let _guard = self.ingest_lock.lock().await;
        let started = Instant::now();

        let PreparedChunks { chunks, mut stats } = {
            let index = self.index.read().await;
            index.ensure_model(self.model_id())?;
            self.indexer
                .prepare(documents, |source| index.next_sequence_index(source))
        };
        let batch = self.indexer.embed(chunks).await?;
        self.index.write().await.merge(batch)?;

        stats.time_ms = elapsed_ms(started);
        log::info!(
            "Ingested {} documents as {} chunks in {}ms",
            stats.documents,
            stats.chunks,
            stats.time_ms
        );
        Ok(stats)
    }

    /// Ingest a JSON Lines knowledge base file
    pub async fn ingest_knowledge_base(&self, path: &Path) -> Result<IngestStats> {
        let kb = KnowledgeBase::load(path).await?;
        let mut stats = self.ingest(&kb.documents).await?;
        stats.add_skipped(kb.skipped);
        Ok(stats)
    }

    /// Replace the index with one built from scratch out of `kb_path`
    pub async fn rebuild(&self, kb_path: Option<&Path>) -> Result<IngestStats> {
        let _guard = self.ingest_lock.lock().await;
        let started = Instant::now();

        let mut fresh = EmbeddingIndex::for_provider(self.indexer.provider().as_ref());
        let mut stats = IngestStats::new();
        if let Some(path) = kb_path {
            let kb = KnowledgeBase::load(path).await?;
            stats = self.indexer.index_documents(&mut fresh, &kb.documents).await?;
            stats.add_skipped(kb.skipped);
        }

        *self.index.write().await = fresh;
        stats.time_ms = elapsed_ms(started);
        log::info!("Rebuilt index with {} chunks", stats.chunks);
        Ok(stats)
    }

    /// Load the snapshot, or rebuild from `kb_path` and save when the
    /// snapshot is missing or corrupt. A snapshot from another embedding
    /// model is an error, never silently replaced.
    pub async fn bootstrap(&self, kb_path: Option<&Path>) -> Result<Bootstrap> {
        if let Some(chunks) = self.load().await? {
            return Ok(Bootstrap::Loaded { chunks });
        }
        match kb_path {
            Some(path) if path.exists() => {
                let stats = self.rebuild(Some(path)).await?;
                self.save().await?;
                Ok(Bootstrap::Rebuilt(stats))
            }
            Some(path) => {
                log::warn!("Knowledge base {} not found; starting empty", path.display());
                Ok(Bootstrap::Empty)
            }
            None => Ok(Bootstrap::Empty),
        }
    }

    /// Swap in the persisted index; `None` when there is nothing usable.
    /// Waits for any running ingestion so its batch is not merged into the
    /// swapped-in index.
    pub async fn load(&self) -> Result<Option<usize>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let _guard = self.ingest_lock.lock().await;
        match store.load(self.model_id()).await? {
            Some(loaded) => {
                let chunks = loaded.len();
                *self.index.write().await = loaded;
                Ok(Some(chunks))
            }
            None => Ok(None),
        }
    }

    /// Write the current index to the snapshot store, if any
    pub async fn save(&self) -> Result<()> {
        let Some(store) = &self.store else {
            log::debug!("No snapshot store configured; skipping save");
            return Ok(());
        };
        let index = self.index.read().await;
        store.save(&index).await?;
        Ok(())
    }

    pub async fn stats(&self) -> IndexStats {
        self.index.read().await.stats()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
