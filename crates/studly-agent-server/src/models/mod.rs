pub mod a2a;
pub mod agent_card;
pub mod chat;
pub mod rpc;

pub use a2a::{A2AMessage, Artifact, MessagePart, PartKind, Role, TaskResult, TaskState, TaskStatus};
pub use agent_card::AgentCard;
pub use chat::ChatMessage;
pub use rpc::{JsonRpcError, JsonRpcResponse, RpcEnvelope, RpcMethod};
