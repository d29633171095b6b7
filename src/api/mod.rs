//! Wire types for the chat-completions endpoint.
//!
//! User content is an ordered list of typed parts; image and audio parts
//! carry self-contained data URIs rather than fetchable references, so the
//! remote service never has to reach back for an attachment.

use serde::{Deserialize, Serialize};

pub mod client;

/// Sampling defaults sent with every request unless overridden in config.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_MAX_TOKENS: u32 = 800;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ApiMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ApiMessage {
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn parts(role: impl Into<String>, parts: Vec<ContentPart>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Parts(parts),
        }
    }
}

/// Assistant and system entries are plain strings; user entries carry the
/// typed part list.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: MediaUrl },
    AudioUrl { audio_url: MediaUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: MediaUrl { url: url.into() },
        }
    }

    pub fn audio_url(url: impl Into<String>) -> Self {
        ContentPart::AudioUrl {
            audio_url: MediaUrl { url: url.into() },
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentPart::ImageUrl { .. })
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, ContentPart::AudioUrl { .. })
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MediaUrl {
    pub url: String,
}

#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(messages: Vec<ApiMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponseChoice {
    pub message: ChatResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_parts_serialize_with_type_tags() {
        let msg = ApiMessage::parts(
            "user",
            vec![
                ContentPart::text("Describe this"),
                ContentPart::image_url("data:image/jpeg;base64,AAAA"),
                ContentPart::audio_url("data:audio/mpeg;base64,BBBB"),
            ],
        );

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "Describe this"},
                    {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AAAA"}},
                    {"type": "audio_url", "audio_url": {"url": "data:audio/mpeg;base64,BBBB"}},
                ]
            })
        );
    }

    #[test]
    fn assistant_content_serializes_as_plain_string() {
        let msg = ApiMessage::text("assistant", "hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "assistant", "content": "hello"}));
    }

    #[test]
    fn request_omits_model_when_endpoint_pinned() {
        let request = ChatRequest::new(vec![ApiMessage::text("user", "hi")]);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("model").is_none());
        assert_eq!(value["temperature"], json!(DEFAULT_TEMPERATURE));
        assert_eq!(value["max_tokens"], json!(DEFAULT_MAX_TOKENS));
    }

    #[test]
    fn response_parses_full_message_content() {
        let raw = json!({
            "choices": [
                {"message": {"content": "It is a cat."}, "finish_reason": "stop"}
            ]
        });
        let response: ChatResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("It is a cat.")
        );
    }
}
