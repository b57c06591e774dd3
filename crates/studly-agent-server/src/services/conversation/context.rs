use std::sync::Arc;
use tracing::{debug, info, warn};

use super::history::cap_history;
use super::store::ConversationStore;
use crate::config::HistoryConfig;
use crate::models::A2AMessage;
use crate::services::summarizer::Summarizer;

pub const NO_HISTORY_LABEL: &str = "No previous conversation.";
pub const RECENT_LABEL: &str = "Recent conversation:";
pub const SUMMARY_LABEL: &str = "Summary of previous conversation:";

/// Where the prepared context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Empty,
    Transcript,
    CachedTranscript,
    Summary,
    CachedSummary,
    /// Summarization failed; the transcript was used instead.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct PreparedContext {
    pub source: ContextSource,
    pub text: String,
}

/// `role: text`, one message per line.
pub fn format_transcript(messages: &[A2AMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.text()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Chooses between raw history and a summary for the model prompt, and
/// keeps the per-conversation caches current.
pub struct ContextPreparer {
    config: HistoryConfig,
    store: ConversationStore,
    summarizer: Arc<dyn Summarizer>,
}

impl ContextPreparer {
    pub fn new(config: HistoryConfig, store: ConversationStore, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            config,
            store,
            summarizer,
        }
    }

    /// Prepare the context block for `messages` (history followed by the
    /// current query). Never fails: a summarizer error degrades to the
    /// transcript and nothing is cached for it.
    pub async fn prepare(&self, context_id: &str, messages: &[A2AMessage]) -> PreparedContext {
        let history = match messages.split_last() {
            Some((_, earlier)) => cap_history(earlier, self.config.cap_messages()),
            None => &[],
        };

        let prepared = if history.is_empty() {
            PreparedContext {
                source: ContextSource::Empty,
                text: NO_HISTORY_LABEL.to_string(),
            }
        } else if !self.config.enable_summarization || history.len() < self.config.summary_threshold {
            self.transcript_context(context_id, history)
        } else {
            self.summary_context(context_id, history).await
        };

        if self.config.enable_history_cache {
            let transcript = matches!(
                prepared.source,
                ContextSource::Transcript | ContextSource::CachedTranscript | ContextSource::Fallback
            )
            .then(|| prepared.text.clone());
            self.store.remember_last_messages(context_id, history, transcript);
        }

        debug!(
            context_id,
            source = ?prepared.source,
            history_len = history.len(),
            "Context prepared"
        );
        prepared
    }

    fn transcript_context(&self, context_id: &str, history: &[A2AMessage]) -> PreparedContext {
        if self.config.enable_history_cache {
            if let Some(text) = self.store.cached_transcript(context_id, history) {
                return PreparedContext {
                    source: ContextSource::CachedTranscript,
                    text,
                };
            }
        }

        PreparedContext {
            source: ContextSource::Transcript,
            text: render_transcript(history),
        }
    }

    async fn summary_context(&self, context_id: &str, history: &[A2AMessage]) -> PreparedContext {
        let slot = self.store.summary_slot(context_id);
        if let Some(summary) = slot.get() {
            return PreparedContext {
                source: ContextSource::CachedSummary,
                text: render_summary(summary),
            };
        }

        let result = slot
            .get_or_try_init(|| async {
                info!(
                    "Summarizing {} messages for context {}",
                    history.len(),
                    context_id
                );
                self.summarizer.summarize(history).await
            })
            .await;

        match result {
            Ok(summary) => PreparedContext {
                source: ContextSource::Summary,
                text: render_summary(summary),
            },
            Err(e) => {
                warn!(
                    "Summarization failed for context {}, using recent history: {:#}",
                    context_id, e
                );
                PreparedContext {
                    source: ContextSource::Fallback,
                    text: render_transcript(history),
                }
            }
        }
    }
}

fn render_transcript(history: &[A2AMessage]) -> String {
    format!("{}\n{}", RECENT_LABEL, format_transcript(history))
}

fn render_summary(summary: &str) -> String {
    format!("{}\n{}", SUMMARY_LABEL, summary)
}
