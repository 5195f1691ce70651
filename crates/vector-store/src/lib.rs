//! # Advisor Vector Store
//!
//! Embedding providers, the in-memory embedding index and its on-disk
//! snapshot.
//!
//! ## Architecture
//!
//! ```text
//! Chunk[]
//!     │
//!     ├──> EmbeddingProvider (OpenAI / stub)
//!     │      └─> Vec<f32>[dimension], under a CallPolicy
//!     │
//!     ├──> EmbeddingIndex
//!     │      └─> exact cosine top-k, deterministic ties
//!     │
//!     └──> SnapshotStore
//!            └─> "RAGX" binary file, model id checked on load
//! ```
//!
//! ## Example
//!
//! ```
//! use advisor_text_chunker::Chunk;
//! use advisor_vector_store::{CallPolicy, EmbeddingIndex, EmbeddingProvider, StubEmbedder};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> advisor_vector_store::Result<()> {
//! let embedder = StubEmbedder::new("v1", 64);
//! let mut index = EmbeddingIndex::for_provider(&embedder);
//!
//! let chunks = vec![Chunk::new("kb", 0, 0, "Citi Rewards earns 4 mpd on dining".into())];
//! index.add(chunks, &embedder, &CallPolicy::default(), 16).await?;
//!
//! let query = embedder.embed("best card for dining").await?;
//! let results = index.search(&query, 5)?;
//! assert_eq!(results[0].chunk.id, "kb#0");
//! # Ok(())
//! # }
//! ```

pub mod embeddings;
pub mod error;
pub mod index;
mod lock;
pub mod provider;
pub mod snapshot;
pub mod types;

pub use advisor_text_chunker::Chunk;
pub use embeddings::{
    build_embedder, cosine_similarity, EmbeddingConfig, EmbeddingMode, EmbeddingProvider,
    OpenAiEmbedder, StubEmbedder,
};
pub use error::{Result, VectorStoreError};
pub use index::{EmbeddedBatch, EmbeddingIndex};
pub use provider::{CallPolicy, ProviderError, ProviderErrorKind};
pub use snapshot::{SnapshotStore, SNAPSHOT_SCHEMA_VERSION};
pub use types::{EmbeddingRecord, IndexStats, RetrievalResult};
