use anyhow::Result;

use crate::models::chat::ChatMessage;

/// Model seam used by the summarizer and the orchestrator.
///
/// Implementations own retries; callers treat every error as final.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}
