use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::history::cap_history_in_place;
use crate::models::A2AMessage;

/// Everything remembered about one conversation.
#[derive(Debug)]
pub struct ConversationRecord {
    /// Stored history, capped on every write.
    pub history: Vec<A2AMessage>,

    /// Summary slot. Set at most once; a failed generation leaves it empty.
    summary: Arc<OnceCell<String>>,

    /// Capped history seen by the most recent context preparation.
    pub last_messages: Option<Vec<A2AMessage>>,

    /// Transcript rendered from `last_messages`.
    pub last_transcript: Option<String>,
}

impl ConversationRecord {
    fn new() -> Self {
        Self {
            history: Vec::new(),
            summary: Arc::new(OnceCell::new()),
            last_messages: None,
            last_transcript: None,
        }
    }

    pub fn cached_summary(&self) -> Option<&str> {
        self.summary.get().map(String::as_str)
    }
}

/// In-memory conversation store keyed by context id.
///
/// Every method is one short critical section on the shard that owns the
/// key; none of them is held across an `.await`. Records live for the
/// lifetime of the store: there is no eviction.
#[derive(Clone, Default)]
pub struct ConversationStore {
    records: Arc<DashMap<String, ConversationRecord>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        info!("Initializing conversation store");
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, context_id: &str) -> bool {
        self.records.contains_key(context_id)
    }

    /// Stored history for a conversation; empty when unknown.
    pub fn history(&self, context_id: &str) -> Vec<A2AMessage> {
        self.records
            .get(context_id)
            .map(|r| r.history.clone())
            .unwrap_or_default()
    }

    /// Replace the stored history, capped to `cap` messages. Returns what was
    /// stored. Concurrent writers on one context: last write wins.
    pub fn store_history(
        &self,
        context_id: &str,
        mut history: Vec<A2AMessage>,
        cap: usize,
    ) -> Vec<A2AMessage> {
        cap_history_in_place(&mut history, cap);

        let mut record = self
            .records
            .entry(context_id.to_string())
            .or_insert_with(ConversationRecord::new);
        record.history = history.clone();

        debug!("Stored {} messages for context {}", history.len(), context_id);
        history
    }

    pub fn cached_summary(&self, context_id: &str) -> Option<String> {
        self.records
            .get(context_id)
            .and_then(|r| r.cached_summary().map(str::to_string))
    }

    /// Summary slot for a conversation, creating the record on first use.
    ///
    /// Callers initialise the slot outside the store lock; concurrent callers
    /// for the same conversation wait on one in-flight generation.
    pub fn summary_slot(&self, context_id: &str) -> Arc<OnceCell<String>> {
        self.records
            .entry(context_id.to_string())
            .or_insert_with(ConversationRecord::new)
            .summary
            .clone()
    }

    pub fn last_messages(&self, context_id: &str) -> Option<Vec<A2AMessage>> {
        self.records
            .get(context_id)
            .and_then(|r| r.last_messages.clone())
    }

    /// Transcript cached for exactly these turns, if any.
    pub fn cached_transcript(&self, context_id: &str, history: &[A2AMessage]) -> Option<String> {
        let record = self.records.get(context_id)?;
        let last = record.last_messages.as_ref()?;

        let same = last.len() == history.len()
            && last.iter().zip(history).all(|(a, b)| a.same_turn(b));
        if same {
            record.last_transcript.clone()
        } else {
            None
        }
    }

    /// Replace the last-messages memo. `transcript` is `None` when the context
    /// came from a summary rather than a rendered transcript.
    pub fn remember_last_messages(
        &self,
        context_id: &str,
        history: &[A2AMessage],
        transcript: Option<String>,
    ) {
        let mut record = self
            .records
            .entry(context_id.to_string())
            .or_insert_with(ConversationRecord::new);
        record.last_messages = Some(history.to_vec());
        record.last_transcript = transcript;
    }

    pub fn stats(&self) -> StoreStats {
        let summarized = self
            .records
            .iter()
            .filter(|r| r.cached_summary().is_some())
            .count();

        StoreStats {
            conversations: self.records.len(),
            summarized,
        }
    }
}

/// Store statistics for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub conversations: usize,
    pub summarized: usize,
}
