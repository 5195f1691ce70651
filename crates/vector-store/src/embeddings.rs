use crate::error::{Result, VectorStoreError};
use crate::provider::{ProviderError, ProviderErrorKind};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// External capability turning text into fixed-length vectors.
///
/// `model_id` names the model *and* version; vectors from different ids
/// live in different spaces and must never be compared.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError>;

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ProviderError::malformed("Empty embedding result"))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    #[default]
    OpenAi,
    Stub,
}

impl EmbeddingMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::Config(format!(
                "Unsupported embedding mode '{other}' (expected 'openai' or 'stub')"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Stub => "stub",
        }
    }
}

/// Embedding settings; `model` doubles as the stub's version tag
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub model: String,
    pub base_url: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub retry_backoff_ms: u64,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::OpenAi,
            model: "text-embedding-ada-002".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimension: 1536,
            timeout_secs: 30,
            max_retries: 1,
            retry_backoff_ms: 500,
            batch_size: 64,
        }
    }
}

impl EmbeddingConfig {
    #[must_use]
    pub fn call_policy(&self) -> crate::CallPolicy {
        crate::CallPolicy {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

/// Build the provider selected by `config.mode`.
pub fn build_embedder(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.mode {
        EmbeddingMode::Stub => Ok(Arc::new(StubEmbedder::new(&config.model, config.dimension))),
        EmbeddingMode::OpenAi => {
            let key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                VectorStoreError::Config(
                    "OPENAI_API_KEY must be set for the OpenAI embedding provider".to_string(),
                )
            })?;
            Ok(Arc::new(OpenAiEmbedder::new(
                key,
                &config.base_url,
                &config.model,
                config.dimension,
            )?))
        }
    }
}

/// Cosine similarity; zero for mismatched lengths or zero vectors
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Deterministic offline embedder.
///
/// Each text becomes the normalized sum of hashed unit vectors of its
/// lowercase word tokens, so texts sharing words land close together.
pub struct StubEmbedder {
    model_id: String,
    dimension: usize,
    #[cfg(test)]
    batch_calls: Arc<AtomicUsize>,
}

impl StubEmbedder {
    #[must_use]
    pub fn new(version: &str, dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            model_id: format!("stub/{version}/{dimension}"),
            dimension,
            #[cfg(test)]
            batch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[cfg(test)]
    pub(crate) fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        #[cfg(test)]
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        Ok(texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect())
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dimension];
    let tokens = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase);

    let mut any = false;
    for token in tokens {
        any = true;
        for (slot, value) in vec.iter_mut().zip(hashed_unit(&token, dimension)) {
            *slot += value;
        }
    }
    if !any {
        vec = hashed_unit(text, dimension);
    }

    normalize(&mut vec);
    vec
}

fn hashed_unit(token: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(token.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Embeddings client for OpenAI-compatible `/embeddings` endpoints.
///
/// Timeouts and retries are applied by the caller's `CallPolicy`.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    model_id: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: &str, base_url: &str, model: &str, dimension: usize) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| {
                ProviderError::new(ProviderErrorKind::Transport, "invalid OpenAI API key")
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ProviderError::from)?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            model_id: format!("openai/{model}"),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let resp = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ProviderError::from_status(status, body));
        }

        let mut parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|err| ProviderError::malformed(format!("embedding response: {err}")))?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != texts.len() {
            return Err(ProviderError::malformed(format!(
                "OpenAI returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
