use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ===== MESSAGE MODELS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    Text,
    Data,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    pub kind: PartKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: PartKind::Text,
            text: Some(text.into()),
            data: None,
            file_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::System => "system",
        }
    }
}

fn message_kind() -> String {
    "message".to_string()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A2AMessage {
    #[serde(default = "message_kind")]
    pub kind: String,
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
    #[serde(default = "new_id")]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl A2AMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            kind: message_kind(),
            role,
            parts: vec![MessagePart::text(text)],
            message_id: new_id(),
            task_id: None,
            metadata: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Text of the first text part, or "" when there is none.
    pub fn text(&self) -> &str {
        self.parts
            .iter()
            .find(|p| p.kind == PartKind::Text)
            .and_then(|p| p.text.as_deref())
            .unwrap_or("")
    }

    /// Same speaker and same text. Message ids are ignored because the
    /// translator mints fresh ones on every request.
    pub fn same_turn(&self, other: &A2AMessage) -> bool {
        self.role == other.role && self.text() == other.text()
    }
}

// ===== REQUEST MODELS =====

/// `message/send` params. The message stays raw JSON so the translator can
/// read the Telex history shape without a strict schema. `configuration`
/// (blocking, push notifications) is accepted and ignored: replies are
/// always synchronous.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageParams {
    pub message: Value,
    #[serde(default)]
    pub context_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// `execute` params.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteParams {
    #[serde(default)]
    pub context_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    pub messages: Vec<A2AMessage>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Working,
    Completed,
    InputRequired,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<A2AMessage>,
}

impl TaskStatus {
    pub fn completed(message: A2AMessage) -> Self {
        Self {
            state: TaskState::Completed,
            timestamp: Utc::now().to_rfc3339(),
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    pub name: String,
    pub parts: Vec<MessagePart>,
}

impl Artifact {
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            artifact_id: new_id(),
            name: name.into(),
            parts: vec![MessagePart::text(text)],
        }
    }
}

fn task_kind() -> String {
    "task".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub history: Vec<A2AMessage>,
    #[serde(default = "task_kind")]
    pub kind: String,
}

impl TaskResult {
    pub fn completed(
        task_id: String,
        context_id: String,
        reply: A2AMessage,
        artifact_name: &str,
        history: Vec<A2AMessage>,
    ) -> Self {
        let artifact = Artifact::text(artifact_name, reply.text());
        Self {
            id: task_id,
            context_id,
            status: TaskStatus::completed(reply),
            artifacts: vec![artifact],
            history,
            kind: task_kind(),
        }
    }

    /// Text of the agent reply carried in the status message.
    pub fn reply_text(&self) -> &str {
        self.status
            .message
            .as_ref()
            .map(|m| m.text())
            .unwrap_or("")
    }
}
