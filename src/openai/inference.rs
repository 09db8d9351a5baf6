//! Reply generation via an OpenAI-compatible chat-completions API.

use crate::error::{ReplyError, Result};
use crate::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Anything that can turn a rendered prompt into reply text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;
}

/// Inference client for the chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl InferenceClient {
    /// Create a new inference client.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReplyError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    /// Run one chat completion and return the trimmed text of the first choice.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f64,
    ) -> Result<Generation> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let request = ChatRequest {
            model,
            messages,
            max_tokens,
            temperature,
        };

        debug!("Inference request to model: {}", model);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReplyError::Generation(format!("inference request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReplyError::Generation(format!(
                "inference failed ({}): {}",
                status,
                error_detail(&body)
            )));
        }

        let body: ChatResponse = resp.json().await.map_err(|e| {
            ReplyError::Generation(format!("failed to parse inference response: {e}"))
        })?;

        let generation = into_generation(body)?;
        info!(
            "Generated {} chars ({} tokens)",
            generation.content.len(),
            generation.usage.completion_tokens
        );
        Ok(generation)
    }
}

#[async_trait]
impl TextGenerator for InferenceClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let messages = [ChatMessage {
            role: ChatRole::System,
            content: request.prompt.clone(),
        }];
        self.chat(
            &request.model,
            &messages,
            request.max_tokens,
            request.temperature,
        )
        .await
    }
}

/// Pull the human-readable message out of an API error body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn into_generation(body: ChatResponse) -> Result<Generation> {
    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(ReplyError::Generation(
            "model returned empty content".to_string(),
        ));
    }

    let usage = body
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(Generation { content, usage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "gpt-4".into(),
            prompt: "Reply to: hello".into(),
            max_tokens: 280,
            temperature: 0.7,
        }
    }

    #[test]
    fn request_carries_single_system_message_and_limits() {
        let messages = [ChatMessage {
            role: ChatRole::System,
            content: "prompt".into(),
        }];
        let req = ChatRequest {
            model: "gpt-4",
            messages: &messages,
            max_tokens: 280,
            temperature: 0.7,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({
                "model": "gpt-4",
                "messages": [{"role": "system", "content": "prompt"}],
                "max_tokens": 280,
                "temperature": 0.7
            })
        );
    }

    #[test]
    fn first_choice_is_trimmed() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": "  Generated response \n"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }))
        .unwrap();
        let generation = into_generation(body).unwrap();
        assert_eq!(generation.content, "Generated response");
        assert_eq!(generation.usage.total_tokens, 13);
    }

    #[test]
    fn empty_or_missing_content_is_a_generation_error() {
        for value in [
            serde_json::json!({"choices": []}),
            serde_json::json!({"choices": [{"message": {"content": null}}]}),
            serde_json::json!({"choices": [{"message": {"content": "   "}}]}),
        ] {
            let body: ChatResponse = serde_json::from_value(value).unwrap();
            assert_eq!(into_generation(body).unwrap_err().kind(), ErrorKind::Generation);
        }
    }

    #[test]
    fn error_detail_prefers_api_message() {
        assert_eq!(
            error_detail(r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#),
            "Incorrect API key provided"
        );
        assert_eq!(error_detail(" upstream timeout "), "upstream timeout");
    }

    #[tokio::test]
    async fn generate_sends_bearer_auth_and_decodes_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "model": "gpt-4",
                "messages": [{"role": "system", "content": "Reply to: hello"}],
                "max_tokens": 280,
                "temperature": 0.7
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": " Hi there! \n"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = InferenceClient::new(&server.uri(), "sk-test", Duration::from_secs(5)).unwrap();
        let generation = client.generate(&request()).await.unwrap();
        assert_eq!(generation.content, "Hi there!");
        assert_eq!(generation.usage.completion_tokens, 3);
    }

    #[tokio::test]
    async fn rate_limit_is_a_generation_error_with_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {
                    "message": "Rate limit reached for gpt-4",
                    "type": "requests",
                    "code": "rate_limit_exceeded"
                }
            })))
            .mount(&server)
            .await;

        let client = InferenceClient::new(&server.uri(), "sk-test", Duration::from_secs(5)).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generation);
        let message = err.to_string();
        assert!(message.contains("429"), "{message}");
        assert!(message.contains("Rate limit reached for gpt-4"), "{message}");
    }

    #[tokio::test]
    async fn undecodable_success_body_is_a_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let client = InferenceClient::new(&server.uri(), "sk-test", Duration::from_secs(5)).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generation);
    }
}
