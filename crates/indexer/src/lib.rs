//! # Advisor Indexer
//!
//! Document Store and ingestion pipeline.
//!
//! ## Pipeline
//!
//! ```text
//! knowledge base (JSON Lines)     text and PDF documents (files / directories)
//!     │                               │
//!     └──> Document {Fact | TextPassage}
//!             │
//!             ├──> normalized text
//!             │
//!             ├──> Chunker (sequence numbers continue per source)
//!             │
//!             └──> EmbeddedBatch ──> EmbeddingIndex::merge
//! ```

mod document;
mod error;
mod indexer;
mod knowledge_base;
mod pdf;
mod scanner;
mod stats;

pub use document::{Document, DocumentBody, FactRecord};
pub use error::{IndexerError, Result};
pub use indexer::{DocumentIndexer, PreparedChunks};
pub use knowledge_base::{kb_source_name, KnowledgeBase};
pub use scanner::{load_document, DocumentScanner};
pub use stats::IngestStats;
