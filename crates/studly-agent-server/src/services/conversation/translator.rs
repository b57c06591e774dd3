//! Telex / A2A payloads → internal message list.
//!
//! Incoming payloads are loosely shaped: fields may be absent or of the wrong
//! type. Nothing here fails; missing pieces are treated as empty content.

use serde_json::Value;
use tracing::debug;

use super::history::{cap_history, cap_history_in_place};
use super::normalizer::normalize_text;
use crate::models::{A2AMessage, Role};

/// A translated request: capped history plus the normalized query, which may
/// be empty.
#[derive(Debug, Clone, Default)]
pub struct Translated {
    pub history: Vec<A2AMessage>,
    pub query: String,
}

impl Translated {
    /// History followed by the query as a `user` message, when there is one.
    pub fn into_messages(self) -> Vec<A2AMessage> {
        let mut out = self.history;
        if !self.query.is_empty() {
            out.push(A2AMessage::user(self.query));
        }
        out
    }
}

/// Translate a `message/send` message object.
///
/// The first `text` part is the current query; the first `data` part holding
/// an array carries prior turns, oldest first. Raw turns beyond `cap_messages`
/// are dropped before any of them is normalized. A payload without `parts`
/// yields nothing.
pub fn translate_message(raw: &Value, cap_messages: usize) -> Vec<A2AMessage> {
    split_message(raw, cap_messages)
        .map(Translated::into_messages)
        .unwrap_or_default()
}

/// Translate an `execute` message array. The last message is the query;
/// earlier messages keep their declared roles.
pub fn translate_messages(messages: &[A2AMessage], cap_messages: usize) -> Vec<A2AMessage> {
    split_messages(messages, cap_messages)
        .map(Translated::into_messages)
        .unwrap_or_default()
}

/// Like [`translate_message`], keeping the query apart from the history.
/// `None` when the payload has no `parts`.
pub fn split_message(raw: &Value, cap_messages: usize) -> Option<Translated> {
    let parts = raw.get("parts").and_then(Value::as_array)?;

    let query = parts
        .iter()
        .find(|p| part_kind(p) == Some("text"))
        .and_then(|p| p.get("text"))
        .and_then(Value::as_str)
        .map(normalize_text)
        .unwrap_or_default();

    let raw_history: &[Value] = parts
        .iter()
        .find(|p| part_kind(p) == Some("data") && p.get("data").is_some_and(Value::is_array))
        .and_then(|p| p.get("data"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let retained = cap_history(raw_history, cap_messages);
    debug!(
        raw = raw_history.len(),
        retained = retained.len(),
        "translating telex history"
    );

    let history: Vec<A2AMessage> = retained
        .iter()
        .map(entry_text)
        .filter(|text| !text.is_empty())
        .enumerate()
        .map(|(i, text)| {
            let role = if i % 2 == 0 { Role::User } else { Role::Agent };
            A2AMessage::new(role, text)
        })
        .collect();

    Some(bound(history, query, cap_messages))
}

/// Like [`translate_messages`], keeping the query apart from the history.
/// `None` for an empty array.
pub fn split_messages(messages: &[A2AMessage], cap_messages: usize) -> Option<Translated> {
    let (last, earlier) = messages.split_last()?;

    let query = normalize_text(last.text());

    let history: Vec<A2AMessage> = cap_history(earlier, cap_messages)
        .iter()
        .filter_map(|msg| {
            let text = normalize_text(msg.text());
            (!text.is_empty()).then(|| A2AMessage::new(msg.role, text))
        })
        .collect();

    Some(bound(history, query, cap_messages))
}

fn bound(mut history: Vec<A2AMessage>, query: String, cap_messages: usize) -> Translated {
    cap_history_in_place(&mut history, cap_messages);
    Translated { history, query }
}

fn part_kind(part: &Value) -> Option<&str> {
    part.get("kind").and_then(Value::as_str)
}

/// Text of one raw history entry: either `{text}` directly or the text parts
/// of a nested `{parts: [...]}` turn joined by a space.
fn entry_text(entry: &Value) -> String {
    if let Some(text) = entry.get("text").and_then(Value::as_str) {
        return normalize_text(text);
    }

    let joined = entry
        .get("parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter(|p| part_kind(p).unwrap_or("text") == "text")
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    normalize_text(&joined)
}
