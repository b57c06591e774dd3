use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::rpc::{
    JsonRpcError, JsonRpcResponse, INTERNAL_ERROR, INVALID_REQUEST, METHOD_NOT_FOUND,
    REQUEST_TIMEOUT,
};

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// JSON-RPC error code.
    pub fn code(&self) -> i64 {
        match self {
            AgentError::InvalidRequest(_) => INVALID_REQUEST,
            AgentError::MethodNotFound(_) => METHOD_NOT_FOUND,
            AgentError::Timeout(_) => REQUEST_TIMEOUT,
            AgentError::Llm(_) | AgentError::Internal(_) => INTERNAL_ERROR,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AgentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AgentError::MethodNotFound(_) => StatusCode::NOT_FOUND,
            AgentError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            AgentError::Llm(_) | AgentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render as a JSON-RPC error envelope echoing `id`. Internal failures
    /// carry a generic message; the details only go to the log.
    pub fn to_rpc(&self, id: Value) -> JsonRpcResponse {
        let message = match self {
            AgentError::Llm(_) | AgentError::Internal(_) => "Internal error".to_string(),
            _ => self.to_string(),
        };
        JsonRpcResponse::failure(
            id,
            JsonRpcError {
                code: self.code(),
                message,
                data: None,
            },
        )
    }

    pub fn into_response_with_id(self, id: Value) -> Response {
        match &self {
            AgentError::InvalidRequest(msg) | AgentError::MethodNotFound(msg) => {
                tracing::warn!("Rejected request: {}", msg);
            }
            AgentError::Timeout(limit) => {
                tracing::warn!("Request exceeded {:?} timeout", limit);
            }
            AgentError::Llm(msg) | AgentError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
            }
        }

        (self.status(), Json(self.to_rpc(id))).into_response()
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        self.into_response_with_id(Value::Null)
    }
}
