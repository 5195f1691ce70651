use crate::config::ChunkerConfig;
use crate::error::Result;
use crate::types::Chunk;
use unicode_segmentation::UnicodeSegmentation;

/// Main chunker interface for splitting documents
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker, rejecting invalid configurations
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// One-shot split with explicit size and overlap (hard cuts only when no
    /// natural break is found inside the default lookback window)
    pub fn split_with(
        text: &str,
        source: &str,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<Vec<Chunk>> {
        let chunker = Self::new(ChunkerConfig {
            chunk_size,
            overlap,
            ..ChunkerConfig::default()
        })?;
        Ok(chunker.split(text, source))
    }

    /// Split a document into chunks numbered from zero.
    ///
    /// Empty input yields no chunks.
    #[must_use]
    pub fn split(&self, text: &str, source: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let layout = TextLayout::new(text);
        let total = layout.len();
        let overlap = self.config.overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let hard_end = (start + self.config.chunk_size).min(total);
            let end = if hard_end == total {
                total
            } else {
                self.find_boundary(&layout, start, hard_end)
            };

            chunks.push(Chunk::new(
                source,
                chunks.len(),
                start,
                layout.slice(text, start, end).to_string(),
            ));

            if end == total {
                break;
            }
            // end > start + overlap, so every step makes progress
            start = end - overlap;
        }

        log::debug!("Split '{source}' ({total} chars) into {} chunks", chunks.len());
        chunks
    }

    /// Pick the window end: the latest natural break inside the lookback
    /// window, best tier first, or a hard cut.
    fn find_boundary(&self, layout: &TextLayout, start: usize, hard_end: usize) -> usize {
        if self.config.boundary_lookback == 0 {
            return hard_end;
        }

        let floor = (start + self.config.overlap + 1)
            .max(hard_end.saturating_sub(self.config.boundary_lookback));
        if floor > hard_end {
            return hard_end;
        }

        let tiers: [fn(&TextLayout, usize) -> bool; 4] = [
            TextLayout::is_paragraph_break,
            TextLayout::is_sentence_start,
            TextLayout::is_line_break,
            TextLayout::is_whitespace_break,
        ];

        for tier in tiers {
            if let Some(pos) = (floor..=hard_end).rev().find(|&pos| tier(layout, pos)) {
                return pos;
            }
        }

        hard_end
    }
}

/// Rebuild the original document from the chunks of one `split` call by
/// trimming each chunk to its non-overlapping core.
#[must_use]
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|chunk| chunk.sequence_index);

    let mut out = String::new();
    for (idx, chunk) in ordered.iter().enumerate() {
        match ordered.get(idx + 1) {
            Some(next) => {
                let core = next.start.saturating_sub(chunk.start);
                out.extend(chunk.text.chars().take(core));
            }
            None => out.push_str(&chunk.text),
        }
    }
    out
}

/// Char-indexed view of a document with precomputed sentence starts
struct TextLayout {
    chars: Vec<char>,
    /// Byte offset of every char, plus the total byte length
    offsets: Vec<usize>,
    sentence_starts: Vec<bool>,
}

impl TextLayout {
    fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(text.len()))
            .collect();

        let mut sentence_starts = vec![false; offsets.len()];
        for (byte_idx, _) in text.split_sentence_bound_indices() {
            if let Ok(pos) = offsets.binary_search(&byte_idx) {
                sentence_starts[pos] = true;
            }
        }

        Self {
            chars,
            offsets,
            sentence_starts,
        }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn slice<'a>(&self, text: &'a str, start: usize, end: usize) -> &'a str {
        &text[self.offsets[start]..self.offsets[end]]
    }

    fn is_paragraph_break(&self, pos: usize) -> bool {
        pos >= 2 && self.chars[pos - 1] == '\n' && self.chars[pos - 2] == '\n'
    }

    fn is_sentence_start(&self, pos: usize) -> bool {
        pos > 0 && self.sentence_starts[pos]
    }

    fn is_line_break(&self, pos: usize) -> bool {
        pos > 0 && self.chars[pos - 1] == '\n'
    }

    fn is_whitespace_break(&self, pos: usize) -> bool {
        pos > 0 && self.chars[pos - 1].is_whitespace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn chunker(chunk_size: usize, overlap: usize, boundary_lookback: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            chunk_size,
            overlap,
            boundary_lookback,
        })
        .unwrap()
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunks = chunker(10, 2, 4).split("", "empty.txt");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunker(100, 20, 30).split("Citi Rewards earns 4 mpd.", "kb");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Citi Rewards earns 4 mpd.");
        assert_eq!(chunks[0].id, "kb#0");
        assert_eq!(chunks[0].start, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Chunker::new(ChunkerConfig::fixed(10, 10)).is_err());
        assert!(Chunker::split_with("text", "src", 5, 7).is_err());
    }

    #[test]
    fn test_hard_cut_advances_by_stride() {
        let text: String = ('a'..='z').collect();
        let chunks = Chunker::new(ChunkerConfig::fixed(10, 3))
            .unwrap()
            .split(&text, "alphabet");

        let starts: Vec<usize> = chunks.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0, 7, 14, 21]);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "hijklmnopq");
        assert_eq!(chunks[3].text, "vwxyz");
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = chunker(40, 5, 20).split(&text, "doc");

        assert_eq!(chunks[0].text, format!("{}\n\n", "a".repeat(30)));
        assert_eq!(chunks[1].start, 27);
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        let text = "First sentence here. Second sentence is longer than the window.";
        let chunks = chunker(30, 0, 20).split(text, "doc");

        assert_eq!(chunks[0].text, "First sentence here. ");
        assert!(chunks[1].text.starts_with("Second"));
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_falls_back_to_whitespace() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunker(12, 2, 6).split(text, "doc");

        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.text.ends_with(' '),
                "expected word boundary, got {:?}",
                chunk.text
            );
        }
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_multibyte_text_is_split_on_char_boundaries() {
        let text = "café ☕ crème brûlée — ünïcödé ".repeat(5);
        let chunks = chunker(16, 4, 6).split(&text, "menu");

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.char_len() <= 16));
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_consecutive_chunks_share_overlap() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let chunks = chunker(100, 25, 40).split(&text, "fox");

        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end() - pair[1].start, 25);
            let tail: String = pair[0].text.chars().skip(pair[0].char_len() - 25).collect();
            let head: String = pair[1].text.chars().take(25).collect();
            assert_eq!(tail, head);
        }
    }

    proptest! {
        #[test]
        fn proptest_reassemble_reconstructs_text(
            text in "[a-z .\n]{0,400}",
            chunk_size in 2usize..80,
            overlap_seed in 0usize..80,
            lookback in 0usize..40,
        ) {
            let overlap = overlap_seed % chunk_size;
            let chunks = chunker(chunk_size, overlap, lookback).split(&text, "p");
            prop_assert_eq!(reassemble(&chunks), text);
        }

        #[test]
        fn proptest_chunks_respect_size_and_order(
            text in "\\PC{1,300}",
            chunk_size in 2usize..60,
            overlap_seed in 0usize..60,
        ) {
            let overlap = overlap_seed % chunk_size;
            let chunks = chunker(chunk_size, overlap, 10).split(&text, "p");
            prop_assert!(!chunks.is_empty());
            for (idx, chunk) in chunks.iter().enumerate() {
                prop_assert!(chunk.char_len() <= chunk_size);
                prop_assert_eq!(chunk.sequence_index, idx);
            }
            for pair in chunks.windows(2) {
                prop_assert!(pair[1].start > pair[0].start);
                prop_assert_eq!(pair[0].end() - pair[1].start, overlap);
            }
        }
    }
}
