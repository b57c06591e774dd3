//! Conversation handling
//!
//! Turns loosely shaped A2A/Telex payloads into a capped message list and
//! prepares the context block for the model:
//! - HTML-ish text normalization
//! - History capping by turns
//! - Per-conversation store (DashMap) with summary and transcript memos

mod context;
mod history;
mod normalizer;
mod store;
mod translator;

pub use context::{
    format_transcript, ContextPreparer, ContextSource, PreparedContext, NO_HISTORY_LABEL,
    RECENT_LABEL, SUMMARY_LABEL,
};
pub use history::{cap_history, cap_history_in_place};
pub use normalizer::normalize_text;
pub use store::{ConversationRecord, ConversationStore, StoreStats};
pub use translator::{
    split_message, split_messages, translate_message, translate_messages, Translated,
};
