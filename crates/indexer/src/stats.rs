use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics about one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Number of documents processed
    pub documents: usize,

    /// Number of chunks added to the index
    pub chunks: usize,

    /// Chunks added per source
    pub sources: BTreeMap<String, usize>,

    /// Knowledge-base lines skipped as malformed
    pub skipped_lines: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl IngestStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_documents(&mut self, count: usize) {
        self.documents += count;
    }

    pub fn add_chunk(&mut self, source: &str) {
        self.chunks += 1;
        *self.sources.entry(source.to_string()).or_insert(0) += 1;
    }

    pub fn add_skipped(&mut self, count: usize) {
        self.skipped_lines += count;
    }

    /// Fold another run into this one
    pub fn merge(&mut self, other: Self) {
        self.documents += other.documents;
        self.chunks += other.chunks;
        self.skipped_lines += other.skipped_lines;
        self.time_ms += other.time_ms;
        for (source, count) in other.sources {
            *self.sources.entry(source).or_insert(0) += count;
        }
    }
}
