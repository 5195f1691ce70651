//! # Advisor Text Chunker
//!
//! Splits normalized document text into overlapping, size-bounded passages
//! suitable for embedding.
//!
//! ## Algorithm
//!
//! ```text
//! Document text
//!     │
//!     ├──> Window of `chunk_size` chars starting at `start`
//!     │
//!     ├──> Boundary search (lookback from the window end)
//!     │    ├─> paragraph break
//!     │    ├─> sentence boundary (Unicode segmentation)
//!     │    ├─> line break
//!     │    ├─> whitespace
//!     │    └─> hard cut at `chunk_size`
//!     │
//!     └──> Next window starts `overlap` chars before the previous end
//! ```
//!
//! Every chunk records its char offset, so trimming the overlap and
//! concatenating the chunks gives back the original document exactly.
//!
//! ## Example
//!
//! ```rust
//! use advisor_text_chunker::{reassemble, Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig {
//!     chunk_size: 40,
//!     overlap: 10,
//!     ..ChunkerConfig::default()
//! })
//! .unwrap();
//!
//! let text = "Citi Rewards earns 4 mpd on dining. DBS Woman's World earns 4 mpd online.";
//! let chunks = chunker.split(text, "cards.txt");
//! assert!(chunks.iter().all(|c| c.char_len() <= 40));
//! assert_eq!(reassemble(&chunks), text);
//! ```

mod chunker;
mod config;
mod error;
mod types;

pub use chunker::{reassemble, Chunker};
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use types::Chunk;
