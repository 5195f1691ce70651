use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for text chunking behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum chunk size in chars (hard limit)
    pub chunk_size: usize,

    /// Chars shared between consecutive chunks of one document
    pub overlap: usize,

    /// How far back from the window end to look for a natural break
    pub boundary_lookback: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
            boundary_lookback: 200,
        }
    }
}

impl ChunkerConfig {
    /// Hard-cut configuration: no boundary search, windows advance by
    /// exactly `chunk_size - overlap`.
    #[must_use]
    pub fn fixed(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            boundary_lookback: 0,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be > 0"));
        }

        if self.overlap >= self.chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }

        Ok(())
    }

    /// Distance between window starts for a hard cut
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}
