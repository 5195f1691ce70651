use crate::answer::{QUESTION_PREFIX, SOURCE_PREFIX};
use crate::error::{RagError, Result};
use advisor_vector_store::{CallPolicy, ProviderError, ProviderErrorKind};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant specialized in Singapore credit cards, rewards programs, and digital wallets.
Use only the provided context to answer questions accurately. If the context does not contain the answer, say so.
Be specific about miles per dollar (mpd), spending caps, and card-wallet combinations when relevant.";

/// A rendered prompt, split the way chat models expect it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

/// External capability turning a grounded prompt into answer text
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        prompt: &Prompt,
        options: &GenerationOptions,
    ) -> std::result::Result<String, ProviderError>;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    OpenAi,
    Stub,
}

impl GenerationMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "stub" => Ok(Self::Stub),
            other => Err(RagError::Config(format!(
                "unknown generation mode '{other}' (expected 'openai' or 'stub')"
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

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub mode: GenerationMode,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub retry_backoff_ms: u64,
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::default(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.3,
            max_tokens: 1000,
            timeout_secs: 60,
            max_retries: 1,
            retry_backoff_ms: 500,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl GenerationConfig {
    #[must_use]
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    #[must_use]
    pub const fn options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Build the provider selected by `config.mode`.
pub fn build_generator(
    config: &GenerationConfig,
    api_key: Option<&str>,
) -> Result<Arc<dyn GenerationProvider>> {
    match config.mode {
        GenerationMode::Stub => Ok(Arc::new(StubGenerator)),
        GenerationMode::OpenAi => {
            let key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                RagError::Config(
                    "OPENAI_API_KEY must be set for the OpenAI generation provider".to_string(),
                )
            })?;
            Ok(Arc::new(OpenAiChatProvider::new(
                key,
                &config.base_url,
                &config.model,
            )?))
        }
    }
}

/// Chat client for OpenAI-compatible `/chat/completions` endpoints
pub struct OpenAiChatProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiChatProvider {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| RagError::Config("invalid OpenAI API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ProviderError::from)?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiChatProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        options: &GenerationOptions,
    ) -> std::result::Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
        };
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ProviderError::from_status(status, text));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|err| ProviderError::malformed(format!("chat response: {err}")))?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::malformed("chat response has no message content"))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Offline generator that quotes the top-ranked context passage
pub struct StubGenerator;

const STUB_QUOTE_CHARS: usize = 400;

#[async_trait]
impl GenerationProvider for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        _options: &GenerationOptions,
    ) -> std::result::Result<String, ProviderError> {
        let (source, passage) = first_context_passage(&prompt.user).ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::Malformed, "prompt carries no context")
        })?;
        let quote: String = passage.chars().take(STUB_QUOTE_CHARS).collect();
        Ok(format!("According to {source}:\n{}", quote.trim()))
    }
}

/// Source label and text of the first context passage in a prompt built by
/// `AnswerGenerator`
fn first_context_passage(user_prompt: &str) -> Option<(&str, &str)> {
    let start = if user_prompt.starts_with(SOURCE_PREFIX) {
        0
    } else {
        user_prompt.find(&format!("\n{SOURCE_PREFIX}"))? + 1
    };
    let rest = &user_prompt[start + SOURCE_PREFIX.len()..];
    let (source, body) = rest.split_once('\n').unwrap_or((rest, ""));
    let end = [
        format!("\n\n{SOURCE_PREFIX}"),
        format!("\n\n{QUESTION_PREFIX}"),
    ]
    .iter()
    .filter_map(|marker| body.find(marker.as_str()))
    .min()
    .unwrap_or(body.len());
    Some((source.trim(), &body[..end]))
}
