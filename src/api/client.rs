//! Non-streaming chat-completions client.
//!
//! The inference call is awaited in full; the dispatcher renders nothing
//! until the endpoint returns or errors. Only attachment fetches carry a
//! timeout, so none is configured on the client here.

use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use tracing::debug;

use crate::api::{ApiMessage, ChatRequest, ChatResponse};

/// Failures surfaced by the inference collaborator. All of them are
/// recovered locally; the session stays usable afterwards.
#[derive(Debug)]
pub enum InferenceError {
    /// Transport-level failure (connect, TLS, body read).
    Http(reqwest::Error),
    /// Non-2xx status from the endpoint, with a summary pulled from the body.
    Api { status: u16, detail: String },
    /// A 2xx response that carried no usable choice.
    EmptyResponse,
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::Http(err) => write!(f, "request failed: {err}"),
            InferenceError::Api { status, detail } => {
                write!(f, "API error (HTTP {status}): {detail}")
            }
            InferenceError::EmptyResponse => write!(f, "API returned an empty response"),
        }
    }
}

impl Error for InferenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InferenceError::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        InferenceError::Http(err)
    }
}

/// Seam between the turn dispatcher and the remote service, so turn logic
/// can be exercised against a stub.
#[async_trait]
pub trait ChatBackend {
    async fn complete(&self, messages: Vec<ApiMessage>) -> Result<String, InferenceError>;
}

pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: Option<String>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

impl ChatClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: None,
            temperature: crate::api::DEFAULT_TEMPERATURE,
            top_p: crate::api::DEFAULT_TOP_P,
            max_tokens: crate::api::DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|m| !m.is_empty());
        self
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(&self, messages: Vec<ApiMessage>) -> ChatRequest {
        let mut request = ChatRequest::new(messages);
        request.model = self.model.clone();
        request.temperature = self.temperature;
        request.top_p = self.top_p;
        request.max_tokens = self.max_tokens;
        request
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn complete(&self, messages: Vec<ApiMessage>) -> Result<String, InferenceError> {
        let url = construct_api_url(&self.base_url, "chat/completions");
        let request = self.build_request(messages);
        debug!(url = %url, messages = request.messages.len(), "sending chat completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                detail: summarize_api_error(&body),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);

        match content {
            Some(text) => Ok(text),
            None => Err(InferenceError::EmptyResponse),
        }
    }
}

/// Pull a human-readable summary out of an error body. Providers disagree on
/// shape: `{"error": {"message": ...}}`, `{"error": "..."}` and
/// `{"message": ...}` all occur in the wild.
fn summarize_api_error(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<no body>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let summary = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .or_else(|| {
                value.get("error").and_then(|v| match v {
                    serde_json::Value::String(s) => Some(s.clone()),
                    _ => None,
                })
            })
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str().map(str::to_owned))
            });
        if let Some(summary) = summary {
            let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
            if !collapsed.is_empty() {
                return collapsed;
            }
        }
    }

    // Unstructured body: keep it short enough for a transcript line.
    const MAX_DETAIL: usize = 200;
    if trimmed.len() > MAX_DETAIL {
        let mut end = MAX_DETAIL;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &trimmed[..end])
    } else {
        trimmed.to_string()
    }
}

/// Normalize a base URL by trimming trailing slashes so endpoint joins never
/// produce doubled separators.
pub fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        normalize_base_url(base_url),
        endpoint.trim_start_matches('/')
    )
}
