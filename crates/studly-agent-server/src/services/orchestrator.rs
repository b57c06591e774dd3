use std::sync::Arc;
use std::time::Duration;

use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{HistoryConfig, Settings};
use crate::models::a2a::{ExecuteParams, MessageParams};
use crate::models::rpc::JSONRPC_VERSION;
use crate::models::{A2AMessage, ChatMessage, JsonRpcResponse, RpcEnvelope, RpcMethod, TaskResult};
use crate::services::conversation::{
    cap_history_in_place, split_message, split_messages, ContextPreparer, ConversationStore,
};
use crate::services::llm_service::LlmProvider;
use crate::services::prompts::{render_study_plan, CLARIFICATION_REPLY};
use crate::services::summarizer::Summarizer;
use crate::utils::AgentError;

pub const STUDY_PLAN_ARTIFACT: &str = "study_plan";
pub const CLARIFICATION_ARTIFACT: &str = "clarification";

/// A rejected request together with the id to echo back.
#[derive(Debug)]
pub struct RpcFailure {
    pub id: Value,
    pub error: AgentError,
}

impl RpcFailure {
    fn new(id: Value, error: AgentError) -> Self {
        Self { id, error }
    }
}

impl IntoResponse for RpcFailure {
    fn into_response(self) -> Response {
        self.error.into_response_with_id(self.id)
    }
}

pub type RpcResult = Result<JsonRpcResponse, RpcFailure>;

/// Renders an orchestrator outcome as an HTTP response.
pub fn into_http(result: RpcResult) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

/// Incoming conversation content, before translation.
#[derive(Debug)]
enum Payload {
    Telex(Value),
    Messages(Vec<A2AMessage>),
}

/// A validated task request.
#[derive(Debug)]
struct TaskRequest {
    method: RpcMethod,
    context_id: String,
    task_id: String,
    payload: Payload,
}

/// Drives one JSON-RPC request from raw body to response envelope.
pub struct RequestOrchestrator {
    store: ConversationStore,
    preparer: ContextPreparer,
    llm: Arc<dyn LlmProvider>,
    history: HistoryConfig,
    timeout: Duration,
    prompt_template: String,
}

impl RequestOrchestrator {
    pub fn new(
        settings: &Settings,
        store: ConversationStore,
        llm: Arc<dyn LlmProvider>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let history = settings.history.clone();
        let preparer = ContextPreparer::new(history.clone(), store.clone(), summarizer);

        Self {
            store,
            preparer,
            llm,
            history,
            timeout: settings.request.timeout(),
            prompt_template: settings.prompts.study_plan_prompt.clone(),
        }
    }

    /// Overall per-request deadline; mainly for tests.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Handle a raw request body.
    pub async fn handle(&self, body: &[u8]) -> RpcResult {
        let envelope = parse_envelope(body)?;
        let id = envelope.id.clone().unwrap_or(Value::Null);

        let request = validate(envelope).map_err(|e| RpcFailure::new(id.clone(), e))?;
        info!(
            request_id = %id,
            method = request.method.as_str(),
            context_id = %request.context_id,
            "Handling task request"
        );

        match tokio::time::timeout(self.timeout, self.run(request)).await {
            Ok(Ok(result)) => Ok(JsonRpcResponse::success(id, result)),
            Ok(Err(e)) => Err(RpcFailure::new(id, e)),
            Err(_) => Err(RpcFailure::new(id, AgentError::Timeout(self.timeout))),
        }
    }

    #[instrument(skip_all, fields(context_id = %request.context_id, task_id = %request.task_id))]
    async fn run(&self, request: TaskRequest) -> Result<TaskResult, AgentError> {
        let TaskRequest {
            context_id,
            task_id,
            payload,
            ..
        } = request;
        let cap = self.history.cap_messages();

        let translated = match &payload {
            Payload::Telex(raw) => split_message(raw, cap),
            Payload::Messages(list) => split_messages(list, cap),
        }
        .unwrap_or_default();
        let mut messages = translated.history;
        let query = A2AMessage::user(translated.query).with_task_id(&task_id);

        if messages.is_empty() {
            messages = self.store.history(&context_id);
            cap_history_in_place(&mut messages, cap);
            if !messages.is_empty() {
                debug!("Resumed {} stored messages", messages.len());
            }
        }
        debug!(history = messages.len(), "Translated");

        if query.text().is_empty() {
            info!("Empty query, asking the user to rephrase");
            let reply = A2AMessage::agent(CLARIFICATION_REPLY).with_task_id(&task_id);
            return Ok(TaskResult::completed(
                task_id,
                context_id,
                reply,
                CLARIFICATION_ARTIFACT,
                messages,
            ));
        }

        messages.push(query);
        let context = self.preparer.prepare(&context_id, &messages).await;
        debug!(source = ?context.source, "Context prepared");

        let query_text = messages.last().map(|m| m.text()).unwrap_or("");
        let prompt = render_study_plan(&self.prompt_template, &context.text, query_text);
        let reply_text = self
            .llm
            .generate(&[ChatMessage::user(prompt)])
            .await
            .map_err(|e| AgentError::Llm(format!("{:#}", e)))?;

        let reply_text = reply_text.trim();
        if reply_text.is_empty() {
            return Err(AgentError::Llm("Model returned an empty reply".to_string()));
        }
        debug!(reply_chars = reply_text.len(), "Model replied");

        let reply = A2AMessage::agent(reply_text).with_task_id(&task_id);
        messages.push(reply.clone());
        let history = self.store.store_history(&context_id, messages, cap);

        Ok(TaskResult::completed(
            task_id,
            context_id,
            reply,
            STUDY_PLAN_ARTIFACT,
            history,
        ))
    }
}

fn parse_envelope(body: &[u8]) -> Result<RpcEnvelope, RpcFailure> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        RpcFailure::new(Value::Null, AgentError::InvalidRequest(format!("Parse error: {}", e)))
    })?;
    if !value.is_object() {
        return Err(RpcFailure::new(
            Value::Null,
            AgentError::InvalidRequest("Request body must be a JSON object".to_string()),
        ));
    }

    // Taken before typed parsing so a badly typed field still echoes the id.
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        RpcFailure::new(id, AgentError::InvalidRequest(format!("Malformed envelope: {}", e)))
    })
}

fn validate(envelope: RpcEnvelope) -> Result<TaskRequest, AgentError> {
    if envelope.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
        return Err(AgentError::InvalidRequest(
            "jsonrpc must be \"2.0\"".to_string(),
        ));
    }
    if envelope.id.as_ref().map_or(true, Value::is_null) {
        return Err(AgentError::InvalidRequest("id is required".to_string()));
    }

    let method_name = envelope.method.unwrap_or_default();
    let method = RpcMethod::parse(&method_name)
        .ok_or_else(|| AgentError::MethodNotFound(method_name.clone()))?;

    let params = envelope
        .params
        .ok_or_else(|| AgentError::InvalidRequest("params are required".to_string()))?;

    let (context_id, task_id, payload) = match method {
        RpcMethod::MessageSend => {
            let p: MessageParams = parse_params(params)?;
            (p.context_id, p.task_id, Payload::Telex(p.message))
        }
        RpcMethod::Execute => {
            let p: ExecuteParams = parse_params(params)?;
            (p.context_id, p.task_id, Payload::Messages(p.messages))
        }
    };

    Ok(TaskRequest {
        method,
        context_id: context_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        task_id: task_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        payload,
    })
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, AgentError> {
    serde_json::from_value(params)
        .map_err(|e| AgentError::InvalidRequest(format!("Invalid params: {}", e)))
}
