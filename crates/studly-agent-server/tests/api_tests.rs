use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use studly_agent_server::{
    build_router,
    config::Settings,
    models::{A2AMessage, ChatMessage},
    services::{conversation::ConversationStore, LlmProvider, RequestOrchestrator, Summarizer},
    state::AppState,
};

/// Answers every prompt with a fixed plan and counts calls.
#[derive(Default)]
struct CountingProvider {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

#[async_trait::async_trait]
impl LlmProvider for CountingProvider {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(format!("# Duration: 2 weeks\n({} prompt chars)", prompt.len()))
    }
}

#[derive(Default)]
struct CountingSummarizer {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Summarizer for CountingSummarizer {
    async fn summarize(&self, messages: &[A2AMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(format!("User discussed {} messages of study goals.", messages.len()))
    }
}

struct Harness {
    router: Router,
    store: ConversationStore,
    llm: Arc<CountingProvider>,
    summarizer: Arc<CountingSummarizer>,
}

fn settings() -> Settings {
    let mut settings = Settings::from_defaults().unwrap();
    settings.gemini.api_key = "test-key".into();
    settings
}

fn harness_with(settings: Settings, llm: CountingProvider) -> Harness {
    let store = ConversationStore::new();
    let llm = Arc::new(llm);
    let summarizer = Arc::new(CountingSummarizer::default());
    let orchestrator =
        RequestOrchestrator::new(&settings, store.clone(), llm.clone(), summarizer.clone());

    Harness {
        router: build_router(AppState::new(settings, orchestrator)),
        store,
        llm,
        summarizer,
    }
}

fn harness() -> Harness {
    harness_with(settings(), CountingProvider::default())
}

fn telex_body(context_id: &str, query: &str, history: Vec<&str>) -> Value {
    let history: Vec<Value> = history
        .into_iter()
        .map(|text| json!({"kind": "text", "text": text}))
        .collect();

    json!({
        "jsonrpc": "2.0",
        "id": "req-001",
        "method": "message/send",
        "params": {
            "contextId": context_id,
            "message": {
                "kind": "message",
                "role": "user",
                "parts": [
                    {"kind": "text", "text": query},
                    {"kind": "data", "data": history}
                ],
                "messageId": "msg-1"
            },
            "configuration": {"blocking": true}
        }
    })
}

async fn send_raw(router: &Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/tasks/send")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn send(router: &Router, body: &Value) -> (StatusCode, Value) {
    send_raw(router, body.to_string()).await
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .uri(uri)
        .header("host", "studly.example.com")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_message_send_success() {
    let h = harness();

    let (status, body) = send(&h.router, &telex_body("ctx-1", "Help me learn Rust in 2 weeks", vec![])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], "req-001");
    let result = &body["result"];
    assert_eq!(result["contextId"], "ctx-1");
    assert_eq!(result["kind"], "task");
    assert_eq!(result["status"]["state"], "completed");
    assert!(result["status"]["timestamp"].is_string());
    assert_eq!(result["status"]["message"]["role"], "agent");
    assert_eq!(result["artifacts"][0]["name"], "study_plan");
    assert!(result["artifacts"][0]["artifactId"].is_string());
    assert_eq!(result["history"].as_array().unwrap().len(), 2);
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_long_history_is_capped() {
    let h = harness();
    let turns: Vec<String> = (0..20).map(|i| format!("<p>Message {i}</p>")).collect();

    let (status, body) = send(
        &h.router,
        &telex_body("ctx-long", "next step?", turns.iter().map(String::as_str).collect()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let history = body["result"]["history"].as_array().unwrap();
    assert!(history.len() <= 8);
    assert!(h.store.history("ctx-long").len() <= 8);
    assert!(history.iter().all(|m| !m["parts"][0]["text"].as_str().unwrap().contains('<')));
}

#[tokio::test]
async fn test_invalid_json_is_rejected() {
    let h = harness();

    let (status, body) = send_raw(&h.router, "{\"jsonrpc\": \"2.0\", ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn test_missing_jsonrpc_version() {
    let h = harness();
    let mut request = telex_body("ctx", "plan", vec![]);
    request.as_object_mut().unwrap().remove("jsonrpc");

    let (status, body) = send(&h.router, &request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], "req-001");
}

#[tokio::test]
async fn test_unknown_method() {
    let h = harness();
    let mut request = telex_body("ctx", "plan", vec![]);
    request["method"] = json!("bogus");

    let (status, body) = send(&h.router, &request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_request_timeout() {
    let mut settings = settings();
    settings.request.timeout_seconds = 1;
    let h = harness_with(
        settings,
        CountingProvider {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        },
    );

    let (status, body) = send(&h.router, &telex_body("slow", "plan", vec![])).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(body["id"], "req-001");
}

#[tokio::test]
async fn test_timeout_keeps_prepared_context() {
    let mut settings = settings();
    settings.request.timeout_seconds = 1;
    let h = harness_with(
        settings,
        CountingProvider {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        },
    );
    let history: Vec<&str> = (0..8).map(|_| "exam in May").collect();

    let (status, body) = send(&h.router, &telex_body("ctx", "plan", history)).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"]["code"], -32000);
    // Summary and memo were written before the model call and stay.
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 1);
    assert!(h.store.cached_summary("ctx").is_some());
    assert_eq!(h.store.last_messages("ctx").map(|m| m.len()), Some(8));
    // The reply never arrived, so no history was committed.
    assert!(h.store.history("ctx").is_empty());
}

#[tokio::test]
async fn test_empty_query_gets_clarification() {
    let h = harness();

    let (status, body) = send(&h.router, &telex_body("ctx", "<br/>", vec![])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["artifacts"][0]["name"], "clarification");
    assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_execute_method() {
    let h = harness();
    let request = json!({
        "jsonrpc": "2.0",
        "id": 42,
        "method": "execute",
        "params": {
            "contextId": "exec-ctx",
            "taskId": "task-1",
            "messages": [
                {"kind": "message", "role": "user", "parts": [{"kind": "text", "text": "Learn calculus"}]},
                {"kind": "message", "role": "agent", "parts": [{"kind": "text", "text": "Week 1: limits"}]},
                {"kind": "message", "role": "user", "parts": [{"kind": "text", "text": "Make it 3 weeks"}]}
            ]
        }
    });

    let (status, body) = send(&h.router, &request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 42);
    assert_eq!(body["result"]["id"], "task-1");
    let roles: Vec<&str> = body["result"]["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["user", "agent", "user", "agent"]);
}

#[tokio::test]
async fn test_concurrent_requests_same_context() {
    let h = harness();
    let history: Vec<&str> = (0..8).map(|_| "I need to prepare for finals").collect();

    let requests = (0..5).map(|i| {
        let router = h.router.clone();
        let body = telex_body("shared", &format!("question {i}"), history.clone());
        async move { send(&router, &body).await }
    });
    let results = futures::future::join_all(requests).await;

    for (status, body) in &results {
        assert_eq!(*status, StatusCode::OK, "{body}");
        assert!(body["result"]["history"].as_array().unwrap().len() <= 8);
    }
    assert_eq!(h.store.len(), 1);
    assert!(h.store.history("shared").len() <= 8);
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 1);
    assert!(h.store.cached_summary("shared").is_some());
}

#[tokio::test]
async fn test_ten_contexts_get_ten_records() {
    let h = harness();

    let requests = (0..10).map(|i| {
        let router = h.router.clone();
        let body = telex_body(&format!("ctx-{i}"), "plan my week", vec![]);
        async move { send(&router, &body).await }
    });
    let results = futures::future::join_all(requests).await;

    assert!(results.iter().all(|(status, _)| *status == StatusCode::OK));
    assert_eq!(h.store.len(), 10);
    for i in 0..10 {
        assert_eq!(h.store.history(&format!("ctx-{i}")).len(), 2);
    }
}

#[tokio::test]
async fn test_summary_reused_across_requests() {
    let h = harness();
    let history: Vec<&str> = (0..8).map(|_| "exam in May").collect();

    for i in 0..3 {
        let (status, _) = send(&h.router, &telex_body("sum", &format!("q{i}"), history.clone())).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_agent_card_uses_request_host() {
    let h = harness();

    let (status, bytes) = get(&h.router, "/.well-known/agent.json").await;
    let card: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["name"], "Studly");
    assert_eq!(card["url"], "http://studly.example.com");
    assert_eq!(card["capabilities"]["streaming"], false);
}

#[tokio::test]
async fn test_health_and_home() {
    let h = harness();

    let (status, bytes) = get(&h.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"Server is live");

    send(&h.router, &telex_body("ctx", "plan", vec![])).await;

    let (status, bytes) = get(&h.router, "/health").await;
    let health: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["conversations"], 1);
}
