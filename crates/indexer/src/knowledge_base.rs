use crate::document::{Document, FactRecord};
use crate::error::{IndexerError, Result};
use std::path::Path;

const DEFAULT_KB_SOURCE: &str = "knowledge-base";

/// Facts parsed from one JSON Lines knowledge base
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
    pub source: String,
    pub documents: Vec<Document>,
    /// Lines that were malformed or not a recognizable fact
    pub skipped: usize,
}

impl KnowledgeBase {
    /// Parse JSON Lines text. One fact per line; blank lines are ignored,
    /// malformed lines are skipped with a warning.
    #[must_use]
    pub fn parse(contents: &str, source: &str) -> Self {
        let mut kb = Self {
            source: source.to_string(),
            ..Self::default()
        };

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: serde_json::Value = match serde_json::from_str(line) {
                Ok(value) => value,
                Err(err) => {
                    log::warn!("Skipping malformed line {} in {source}: {err}", line_no + 1);
                    kb.skipped += 1;
                    continue;
                }
            };

            match FactRecord::from_json(&value) {
                Some(fact) => kb.documents.push(Document::fact(source, fact)),
                None => {
                    log::warn!(
                        "Skipping line {} in {source}: neither entity nor relationship",
                        line_no + 1
                    );
                    kb.skipped += 1;
                }
            }
        }

        log::info!(
            "Loaded {} facts from {source} ({} lines skipped)",
            kb.documents.len(),
            kb.skipped
        );
        kb
    }

    /// Read and parse a knowledge base file; its stem becomes the source name.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| IndexerError::io(path, err))?;
        Ok(Self::parse(&contents, &kb_source_name(path)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Source id used for every fact of a knowledge base file
#[must_use]
pub fn kb_source_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(DEFAULT_KB_SOURCE)
        .to_string()
}
