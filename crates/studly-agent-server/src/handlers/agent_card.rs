use axum::{extract::State, http::HeaderMap, Json};
use std::sync::Arc;

use crate::models::AgentCard;
use crate::state::AppState;

pub async fn agent_card(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<AgentCard> {
    Json(AgentCard::new(&state.settings.agent, base_url(&headers, &state)))
}

/// Public base URL as seen by the caller, without a trailing slash.
fn base_url(headers: &HeaderMap, state: &AppState) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let scheme = header("x-forwarded-proto").unwrap_or("http");
    match header("x-forwarded-host").or_else(|| header("host")) {
        Some(host) => format!("{}://{}", scheme, host.trim_end_matches('/')),
        None => format!(
            "{}://{}:{}",
            scheme, state.settings.server.host, state.settings.server.port
        ),
    }
}
