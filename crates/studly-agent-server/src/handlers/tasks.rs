use axum::{body::Bytes, extract::State, response::Response};
use std::sync::Arc;
use tracing::debug;

use crate::services::orchestrator::into_http;
use crate::state::AppState;

/// Main A2A endpoint. The body is taken raw so that malformed JSON becomes a
/// JSON-RPC error envelope instead of an extractor rejection.
pub async fn send_task(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    debug!("Task request received ({} bytes)", body.len());
    into_http(state.orchestrator.handle(&body).await)
}
