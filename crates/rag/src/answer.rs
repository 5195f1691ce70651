use crate::error::Result;
use crate::generation::{GenerationOptions, GenerationProvider, Prompt};
use advisor_text_chunker::Chunk;
use advisor_vector_store::{CallPolicy, ProviderError, RetrievalResult};
use serde::Serialize;
use std::sync::Arc;

pub(crate) const SOURCE_PREFIX: &str = "Source: ";
pub(crate) const QUESTION_PREFIX: &str = "Question: ";

pub const INSUFFICIENT_INFORMATION: &str =
    "I don't have enough information in the knowledge base to answer that question.";

const ANSWER_GUIDANCE: &str = "Please provide a detailed and accurate answer based on the context above. Include specific details like:
- Miles per dollar (mpd) rates
- Spending caps and minimum spends
- Card names and banks
- Compatible wallet-card combinations
- Any relevant terms and conditions";

/// Grounded answer with the passages it was built from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    /// Distinct sources of `used_chunks`, in first-appearance order
    pub citations: Vec<String>,
    /// Retrieved chunks in rank order
    pub used_chunks: Vec<Chunk>,
}

impl Answer {
    /// The fixed reply used when nothing relevant was retrieved
    #[must_use]
    pub fn insufficient_information() -> Self {
        Self {
            text: INSUFFICIENT_INFORMATION.to_string(),
            citations: Vec::new(),
            used_chunks: Vec::new(),
        }
    }
}

/// Turns retrieved chunks into a prompt and the provider's reply into an
/// [`Answer`]
pub struct AnswerGenerator {
    provider: Arc<dyn GenerationProvider>,
    policy: CallPolicy,
    options: GenerationOptions,
    system_prompt: String,
}

impl AnswerGenerator {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        policy: CallPolicy,
        options: GenerationOptions,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            policy,
            options,
            system_prompt: system_prompt.into(),
        }
    }

    pub async fn answer(&self, query: &str, retrieved: Vec<RetrievalResult>) -> Result<Answer> {
        if retrieved.is_empty() {
            log::debug!("No context retrieved; answering with the insufficient-information reply");
            return Ok(Answer::insufficient_information());
        }

        let used_chunks: Vec<Chunk> = retrieved.into_iter().map(|result| result.chunk).collect();
        let prompt = self.build_prompt(query, &used_chunks);

        let text = self
            .policy
            .run("chat completion", || {
                self.provider.complete(&prompt, &self.options)
            })
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::malformed(format!(
                "{} returned an empty completion",
                self.provider.name()
            ))
            .into());
        }

        log::debug!(
            "Generated {} chars from {} chunks",
            text.len(),
            used_chunks.len()
        );
        Ok(Answer {
            text: text.to_string(),
            citations: citations(&used_chunks),
            used_chunks,
        })
    }

    #[must_use]
    pub fn build_prompt(&self, query: &str, chunks: &[Chunk]) -> Prompt {
        let context = chunks
            .iter()
            .map(|chunk| format!("{SOURCE_PREFIX}{}\n{}", source_label(chunk), chunk.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        Prompt {
            system: self.system_prompt.clone(),
            user: format!(
                "Context:\n{context}\n\n{QUESTION_PREFIX}{}\n\n{ANSWER_GUIDANCE}",
                query.trim()
            ),
        }
    }
}

fn source_label(chunk: &Chunk) -> String {
    match chunk.page {
        Some(page) => format!("{} (page {page})", chunk.source),
        None => chunk.source.clone(),
    }
}

fn citations(chunks: &[Chunk]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for chunk in chunks {
        if !out.contains(&chunk.source) {
            out.push(chunk.source.clone());
        }
    }
    out
}
