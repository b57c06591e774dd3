use crate::config::GeminiConfig;
use crate::models::chat::ChatMessage;
use crate::services::llm_service::LlmProvider;
use anyhow::{anyhow, bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Gemini chat client over the OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    config: GeminiConfig,
    retry_backoff: Duration,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Outcome of a single attempt.
enum Attempt {
    Done(String),
    Retry(anyhow::Error),
    Fail(anyhow::Error),
}

impl GeminiService {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            retry_backoff: Duration::from_secs(1),
        })
    }

    /// Base delay between attempts; attempt `n` waits `n * backoff`.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Generate a completion without streaming.
    pub async fn generate_chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let attempts = self.config.max_retries + 1;

        for attempt in 1..=attempts {
            match self.attempt(messages).await {
                Attempt::Done(text) => return Ok(text),
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(e) if attempt < attempts => {
                    warn!("Gemini attempt {}/{} failed: {:#}", attempt, attempts, e);
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Attempt::Retry(e) => {
                    error!("Gemini call failed after {} attempts: {:#}", attempts, e);
                    return Err(e);
                }
            }
        }

        bail!("Gemini call made no attempts")
    }

    async fn attempt(&self, messages: &[ChatMessage]) -> Attempt {
        debug!("Calling Gemini with {} messages", messages.len());

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            stream: false,
        };

        let response = match self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Attempt::Retry(anyhow!("Gemini network error: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = anyhow!("Gemini API error ({}): {}", status, body);
            return if is_retryable(status) {
                Attempt::Retry(err)
            } else {
                Attempt::Fail(err)
            };
        }

        let body: ChatCompletionResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => return Attempt::Fail(anyhow!("Failed to parse Gemini response: {}", e)),
        };

        match body.choices.into_iter().next().and_then(|c| c.message.content) {
            Some(text) => Attempt::Done(text),
            None => Attempt::Fail(anyhow!("Gemini returned no choices")),
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait::async_trait]
impl LlmProvider for GeminiService {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.generate_chat(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String, max_retries: u32) -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".into(),
            base_url,
            model: "gemini-2.5-flash".into(),
            temperature: 0.3,
            timeout_seconds: 5,
            max_retries,
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
        })
    }

    fn service(server: &MockServer, max_retries: u32) -> GeminiService {
        GeminiService::new(config(server.uri(), max_retries))
            .unwrap()
            .with_retry_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_generate_parses_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "gemini-2.5-flash", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("# Plan")))
            .expect(1)
            .mount(&server)
            .await;

        let text = service(&server, 0)
            .generate(&[ChatMessage::user("plan")])
            .await
            .unwrap();
        assert_eq!(text, "# Plan");
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .mount(&server)
            .await;

        let text = service(&server, 3)
            .generate(&[ChatMessage::user("x")])
            .await
            .unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_client_errors_fail_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = service(&server, 3)
            .generate(&[ChatMessage::user("x")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("400"));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let result = service(&server, 2).generate(&[ChatMessage::user("x")]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let result = service(&server, 0).generate(&[ChatMessage::user("x")]).await;
        assert!(result.is_err());
    }
}
