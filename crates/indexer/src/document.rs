//! Document Store records and their normalization into retrievable text.

use regex::Regex;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::sync::OnceLock;

/// One unit of raw knowledge, tagged with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: String,
    /// 1-based page number for paginated text documents
    pub page: Option<u32>,
    pub body: DocumentBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBody {
    Fact(FactRecord),
    TextPassage(String),
}

/// Structured knowledge-base line
#[derive(Debug, Clone, PartialEq)]
pub enum FactRecord {
    Entity {
        entity_type: String,
        id: String,
        properties: Vec<(String, Value)>,
    },
    Relationship {
        source: String,
        target: String,
        relation: String,
        properties: Vec<(String, Value)>,
    },
}

impl Document {
    pub fn fact(source: impl Into<String>, fact: FactRecord) -> Self {
        Self {
            source: source.into(),
            page: None,
            body: DocumentBody::Fact(fact),
        }
    }

    pub fn passage(source: impl Into<String>, page: Option<u32>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page,
            body: DocumentBody::TextPassage(text.into()),
        }
    }

    /// Text handed to the chunker
    #[must_use]
    pub fn normalized_text(&self) -> String {
        match &self.body {
            DocumentBody::Fact(fact) => fact.normalize(),
            DocumentBody::TextPassage(text) => clean_passage(text),
        }
    }
}

impl FactRecord {
    /// Classify a parsed JSON line. Objects with `type` are entities, objects
    /// with `source` are relationships; anything else is not a fact.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if let Some(entity_type) = object.get("type") {
            return Some(Self::Entity {
                entity_type: render_value(entity_type),
                id: string_field(object, "id"),
                properties: properties(object),
            });
        }
        if object.contains_key("source") {
            return Some(Self::Relationship {
                source: string_field(object, "source"),
                target: string_field(object, "target"),
                relation: string_field(object, "relation"),
                properties: properties(object),
            });
        }
        None
    }

    /// Render as the readable text block that gets embedded
    #[must_use]
    pub fn normalize(&self) -> String {
        let (mut text, props) = match self {
            Self::Entity {
                entity_type,
                id,
                properties,
            } => (format!("{entity_type}: {id}\n"), properties),
            Self::Relationship {
                source,
                target,
                relation,
                properties,
            } => (
                format!("Relationship: {source} --[{relation}]--> {target}\n"),
                properties,
            ),
        };
        for (key, value) in props {
            let _ = writeln!(text, "  {key}: {}", render_value(value));
        }
        text
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    object.get(key).map(render_value).unwrap_or_default()
}

fn properties(object: &Map<String, Value>) -> Vec<(String, Value)> {
    match object.get("properties") {
        Some(Value::Object(props)) => props
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Normalize line endings, strip trailing spaces and squeeze runs of blank
/// lines down to one paragraph break.
fn clean_passage(text: &str) -> String {
    static TRAILING_SPACE: OnceLock<Option<Regex>> = OnceLock::new();
    static BLANK_RUN: OnceLock<Option<Regex>> = OnceLock::new();

    let mut out = text.replace("\r\n", "\n").replace('\r', "\n");
    if let Some(re) = TRAILING_SPACE.get_or_init(|| Regex::new(r"[ \t]+\n").ok()) {
        out = re.replace_all(&out, "\n").into_owned();
    }
    if let Some(re) = BLANK_RUN.get_or_init(|| Regex::new(r"\n{3,}").ok()) {
        out = re.replace_all(&out, "\n\n").into_owned();
    }
    out.trim().to_string()
}
