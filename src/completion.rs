//! Chat-completion client that turns a public image URL into ALT text.
//!
//! The request is a fixed two-message conversation against a fixed model. The
//! reply's `choices[0].message.content` is cleaned up by [`clean_alt_text`]
//! before being handed back; nothing is persisted here.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::constants::{
    COMPLETION_MAX_TOKENS, COMPLETION_MODEL, COMPLETION_TEMPERATURE, COMPLETION_TIMEOUT_SECONDS,
    SYSTEM_INSTRUCTION, USER_INSTRUCTION,
};
use crate::settings::has_api_key;

/// Why a generation attempt produced no ALT text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GenerationError {
    /// The caller didn't name an attachment.
    MissingAttachmentId,
    /// The attachment doesn't exist or has no public URL.
    UnresolvableUrl,
    /// No API key has been configured.
    MissingApiKey,
    /// Network failure, timeout or non-2xx status.
    TransportError(String),
    /// The API answered with an `error.message`.
    ApiError(String),
    /// The API answered with neither content nor an error.
    UnexpectedResponse,
    /// Reading the attachment or settings failed.
    Storage(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAttachmentId => write!(f, "Could not find attachment ID."),
            Self::UnresolvableUrl => write!(f, "Image URL not found."),
            Self::MissingApiKey => write!(
                f,
                "API key not set. Please add it in Settings → AI ALT Generator."
            ),
            Self::TransportError(detail) => write!(f, "Request error: {detail}"),
            Self::ApiError(detail) => write!(f, "API error: {detail}"),
            Self::UnexpectedResponse => write!(f, "Failed to generate ALT text."),
            Self::Storage(detail) => write!(f, "Storage error: {detail}"),
        }
    }
}

impl std::error::Error for GenerationError {}

/// One role-tagged message of the conversation.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// `system` or `user`
    pub role: &'static str,
    /// message text
    pub content: String,
}

/// Request body for POST /chat/completions
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// model identifier
    pub model: &'static str,
    /// system message followed by the user message
    pub messages: Vec<ChatMessage>,
    /// output length cap
    pub max_tokens: u32,
    /// sampling temperature
    pub temperature: f32,
}

/// Builds the request body asking for ALT text for `image_url`.
pub fn build_request(image_url: &str) -> ChatRequest {
    ChatRequest {
        model: COMPLETION_MODEL,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_INSTRUCTION.to_string(),
            },
            ChatMessage {
                role: "user",
                content: format!("{USER_INSTRUCTION}{image_url}"),
            },
        ],
        max_tokens: COMPLETION_MAX_TOKENS,
        temperature: COMPLETION_TEMPERATURE,
    }
}

const ALT_TEXT_LABEL: &str = "alt text:";

/// Strips a leading `ALT text:` label (any casing) and the whitespace after it,
/// then one leading and one trailing quote character, then surrounding whitespace.
pub fn clean_alt_text(raw: &str) -> String {
    let text = raw.trim();
    let text = match text.get(..ALT_TEXT_LABEL.len()) {
        Some(label) if label.eq_ignore_ascii_case(ALT_TEXT_LABEL) => {
            text[ALT_TEXT_LABEL.len()..].trim_start()
        }
        _ => text,
    };
    let text = text.strip_prefix(['"', '\'']).unwrap_or(text);
    let text = text.strip_suffix(['"', '\'']).unwrap_or(text);
    text.trim().to_string()
}

fn api_error_message(body: &Value) -> Option<&str> {
    body.pointer("/error/message").and_then(Value::as_str)
}

/// Extracts and cleans the generated text from a completion response body.
pub fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|_| GenerationError::UnexpectedResponse)?;

    if let Some(content) = parsed
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        return Ok(clean_alt_text(content));
    }
    if let Some(message) = api_error_message(&parsed) {
        return Err(GenerationError::ApiError(message.to_string()));
    }
    Err(GenerationError::UnexpectedResponse)
}

/// Anything that can describe an image by URL.
#[async_trait]
pub trait AltTextGenerator: Send + Sync {
    /// Returns cleaned ALT text for the image at `image_url`.
    async fn generate_alt_text(
        &self,
        image_url: &str,
        api_key: &str,
    ) -> Result<String, GenerationError>;
}

/// [`AltTextGenerator`] backed by a remote chat-completions endpoint.
#[derive(Clone, Debug)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl CompletionClient {
    /// Creates a client posting to `endpoint` with the fixed request timeout.
    pub fn new(endpoint: Url) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(COMPLETION_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl AltTextGenerator for CompletionClient {
    #[instrument(skip_all, fields(image_url = %image_url))]
    async fn generate_alt_text(
        &self,
        image_url: &str,
        api_key: &str,
    ) -> Result<String, GenerationError> {
        if !has_api_key(api_key) {
            return Err(GenerationError::MissingApiKey);
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&build_request(image_url))
            .send()
            .await
            .map_err(|err| GenerationError::TransportError(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GenerationError::TransportError(err.to_string()))?;
        debug!("completion response {status}, {} bytes", body.len());

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|parsed| api_error_message(&parsed).map(str::to_string));
            return Err(GenerationError::TransportError(match detail {
                Some(message) => format!("HTTP {status}: {message}"),
                None => format!("HTTP {status}"),
            }));
        }

        parse_completion(&body)
    }
}
