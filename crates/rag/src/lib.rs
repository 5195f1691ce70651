//! # Advisor RAG
//!
//! Retrieval-augmented question answering over an [`EmbeddingIndex`].
//!
//! ```text
//! question
//!     │
//!     ├──> Retriever: embed query ──> cosine top-k
//!     │
//!     └──> AnswerGenerator: grounded prompt ──> GenerationProvider
//!            └─> Answer { text, citations, used_chunks }
//! ```
//!
//! [`RagEngine`] ties retrieval and generation to an index it owns, plus
//! ingestion and snapshot persistence.
//!
//! [`EmbeddingIndex`]: advisor_vector_store::EmbeddingIndex

mod answer;
mod config;
mod engine;
mod error;
mod generation;
mod retriever;

pub use answer::{Answer, AnswerGenerator, INSUFFICIENT_INFORMATION};
pub use config::EngineConfig;
pub use engine::{Bootstrap, RagEngine};
pub use error::{RagError, Result};
pub use generation::{
    build_generator, GenerationConfig, GenerationMode, GenerationOptions, GenerationProvider,
    OpenAiChatProvider, Prompt, StubGenerator, DEFAULT_SYSTEM_PROMPT,
};
pub use retriever::{RetrievalConfig, Retriever};
