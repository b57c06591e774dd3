use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::debug;

use crate::models::{A2AMessage, ChatMessage};
use crate::services::conversation::format_transcript;
use crate::services::llm_service::LlmProvider;

/// Condenses older history into a short summary.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, messages: &[A2AMessage]) -> Result<String>;
}

/// Summarizer backed by the chat model. No retries here: the provider owns
/// them and the caller owns the fallback.
pub struct LlmSummarizer {
    llm: Arc<dyn LlmProvider>,
    instruction: String,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn LlmProvider>, instruction: String) -> Self {
        Self { llm, instruction }
    }
}

#[async_trait::async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, messages: &[A2AMessage]) -> Result<String> {
        let transcript = format_transcript(messages);
        debug!("Summarizing {} messages ({} chars)", messages.len(), transcript.len());

        let prompt = vec![
            ChatMessage::system(self.instruction.clone()),
            ChatMessage::user(transcript),
        ];

        let summary = self.llm.generate(&prompt).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            bail!("Model returned an empty summary");
        }
        Ok(summary.to_string())
    }
}
