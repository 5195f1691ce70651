use advisor_rag::{EngineConfig, GenerationConfig, GenerationMode, RetrievalConfig};
use advisor_text_chunker::ChunkerConfig;
use advisor_vector_store::{EmbeddingConfig, EmbeddingMode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "advisor.toml";

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_EMBEDDING_MODE: &str = "ADVISOR_EMBEDDING_MODE";
pub const ENV_GENERATION_MODE: &str = "ADVISOR_GENERATION_MODE";
pub const ENV_INDEX_PATH: &str = "ADVISOR_INDEX_PATH";
pub const ENV_KB_PATH: &str = "ADVISOR_KB_PATH";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub index_path: PathBuf,
    pub kb_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("data/advisor.ragx"),
            kb_path: PathBuf::from("data/credit-card-kb.json"),
        }
    }
}

/// Everything the `advisor` binary reads from `advisor.toml` and the
/// environment
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub chunking: ChunkerConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
    /// Only ever taken from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl AdvisorConfig {
    /// Load `explicit`, else `advisor.toml` in the working directory when
    /// present, else defaults; then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from `lookup` (the process environment in production)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(mode) = lookup(ENV_EMBEDDING_MODE) {
            self.embedding.mode = EmbeddingMode::parse(&mode)
                .with_context(|| format!("Invalid {ENV_EMBEDDING_MODE}"))?;
        }
        if let Some(mode) = lookup(ENV_GENERATION_MODE) {
            self.generation.mode = GenerationMode::parse(&mode)
                .with_context(|| format!("Invalid {ENV_GENERATION_MODE}"))?;
        }
        if let Some(path) = lookup(ENV_INDEX_PATH) {
            self.storage.index_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_KB_PATH) {
            self.storage.kb_path = PathBuf::from(path);
        }
        Ok(())
    }

    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            chunking: self.chunking,
            retrieval: self.retrieval.clone(),
            embedding: self.embedding.clone(),
            generation: self.generation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_engine_defaults() {
        let config = AdvisorConfig::default();
        assert_eq!(config.engine_config(), EngineConfig::default());
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = AdvisorConfig::from_toml_str(
            r#"
[chunking]
chunk_size = 500
overlap = 50

[embedding]
mode = "stub"
dimension = 64

[storage]
index_path = "/tmp/advisor/index.ragx"
"#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.boundary_lookback, 200);
        assert_eq!(config.embedding.mode, EmbeddingMode::Stub);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.generation.model, "gpt-4o-mini");
        assert_eq!(
            config.storage.index_path,
            PathBuf::from("/tmp/advisor/index.ragx")
        );
        assert_eq!(
            config.storage.kb_path,
            PathBuf::from("data/credit-card-kb.json")
        );
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_KEY, "sk-test"),
            (ENV_EMBEDDING_MODE, "stub"),
            (ENV_GENERATION_MODE, "STUB"),
            (ENV_INDEX_PATH, "idx.ragx"),
            (ENV_KB_PATH, ""),
        ]);
        let mut config = AdvisorConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.embedding.mode, EmbeddingMode::Stub);
        assert_eq!(config.generation.mode, GenerationMode::Stub);
        assert_eq!(config.storage.index_path, PathBuf::from("idx.ragx"));
        assert_eq!(config.storage.kb_path, StorageConfig::default().kb_path);
    }

    #[test]
    fn bad_mode_is_rejected() {
        let mut config = AdvisorConfig::default();
        let err = config
            .apply_env(|key| (key == ENV_EMBEDDING_MODE).then(|| "faiss".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_EMBEDDING_MODE));
    }

    #[test]
    fn unknown_file_is_an_error() {
        assert!(AdvisorConfig::load(Some(Path::new("/nonexistent/advisor.toml"))).is_err());
    }
}
