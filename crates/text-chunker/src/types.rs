use serde::{Deserialize, Serialize};

/// A bounded slice of source text, the unit of retrieval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Stable identifier, `"{source}#{sequence_index}"`
    pub id: String,

    /// The passage text
    pub text: String,

    /// Identifier of the originating document
    pub source: String,

    /// Position within the source (monotonically increasing)
    pub sequence_index: usize,

    /// Char offset of the chunk inside its document
    pub start: usize,

    /// Page of the originating document, when it has pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Chunk {
    /// Create a new chunk with an id derived from source and sequence index
    #[must_use]
    pub fn new(source: impl Into<String>, sequence_index: usize, start: usize, text: String) -> Self {
        let source = source.into();
        Self {
            id: Self::make_id(&source, sequence_index),
            text,
            source,
            sequence_index,
            start,
            page: None,
        }
    }

    /// Builder: set page number
    #[must_use]
    pub fn with_page(mut self, page: Option<u32>) -> Self {
        self.page = page;
        self
    }

    /// Move the chunk to another sequence position, keeping the id in sync
    pub fn renumber(&mut self, sequence_index: usize) {
        self.sequence_index = sequence_index;
        self.id = Self::make_id(&self.source, sequence_index);
    }

    /// Length of the text in chars
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Char offset one past the end of the chunk
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.char_len()
    }

    fn make_id(source: &str, sequence_index: usize) -> String {
        format!("{source}#{sequence_index}")
    }
}
