//! Shared types used across the reply pipeline.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Tone used when the inbound message does not name one.
pub const DEFAULT_TONE: &str = "professional";

/// Minimum reply length used when the inbound message does not name one.
pub const DEFAULT_MIN_CHAR_COUNT: &str = "100";

// ---------------------------------------------------------------------------
// Handler state machine
// ---------------------------------------------------------------------------

/// States a single invocation transitions through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Event accepted, nothing done yet.
    Received,
    /// Reply generated and posted.
    Processed,
    /// A step failed; the failure envelope was returned.
    Failed,
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Processed => write!(f, "processed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound queue event
// ---------------------------------------------------------------------------

/// Queue delivery envelope (SQS shape). Only the first record is processed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueRecord {
    #[serde(rename = "messageId", default)]
    pub message_id: Option<String>,
    /// JSON-encoded [`InboundMessage`].
    pub body: String,
}

/// The post to reply to plus generation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Untrusted post text. Sanitized in place before any further use.
    pub post: String,
    #[serde(deserialize_with = "text_or_number")]
    pub post_id: String,
    #[serde(default)]
    pub tone: Option<String>,
    /// Kept as text; numeric JSON values are rendered in decimal.
    #[serde(default, deserialize_with = "optional_text_or_number")]
    pub min_char_count: Option<String>,
}

impl InboundMessage {
    pub fn new(post: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            post: post.into(),
            post_id: post_id.into(),
            tone: None,
            min_char_count: None,
        }
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    pub fn with_min_char_count(mut self, min_char_count: impl Into<String>) -> Self {
        self.min_char_count = Some(min_char_count.into());
        self
    }

    /// Requested tone, or [`DEFAULT_TONE`].
    pub fn tone(&self) -> &str {
        self.tone.as_deref().unwrap_or(DEFAULT_TONE)
    }

    /// Requested minimum reply length, or [`DEFAULT_MIN_CHAR_COUNT`].
    pub fn min_char_count(&self) -> &str {
        self.min_char_count
            .as_deref()
            .unwrap_or(DEFAULT_MIN_CHAR_COUNT)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl From<TextOrNumber> for String {
    fn from(value: TextOrNumber) -> Self {
        match value {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    TextOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(String::from))
}

// ---------------------------------------------------------------------------
// Inference types
// ---------------------------------------------------------------------------

/// A chat message sent to the generation API.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The reply instruction is always sent as a single system message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
}

/// One generation call: a single system-role instruction plus sampling limits.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Token usage from an inference call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Text returned by the generation API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub content: String,
    pub usage: TokenUsage,
}

// ---------------------------------------------------------------------------
// Platform types
// ---------------------------------------------------------------------------

/// Access level granted to the platform credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Read,
    ReadWrite,
    ReadWriteDirectmessages,
}

impl AccessLevel {
    /// Parse the `x-access-level` response header value.
    pub fn from_header(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "read" => Some(Self::Read),
            "read-write" => Some(Self::ReadWrite),
            "read-write-directmessages" => Some(Self::ReadWriteDirectmessages),
            _ => None,
        }
    }

    pub fn can_write(self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// The account the platform credentials belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    /// `None` when the platform did not report it.
    pub access_level: Option<AccessLevel>,
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Handler output. `body` is itself a JSON document, encoded as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessBody {
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub timestamp: String,
}

impl Envelope {
    pub fn success(message: &str) -> Self {
        Self::with_body(
            200,
            &SuccessBody {
                message: message.to_string(),
                timestamp: timestamp(),
            },
        )
    }

    pub fn failure(error: &str) -> Self {
        Self::with_body(
            500,
            &ErrorBody {
                error: error.to_string(),
                timestamp: timestamp(),
            },
        )
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    fn with_body<T: Serialize>(status_code: u16, body: &T) -> Self {
        // Both body types are plain string structs; serialization cannot fail.
        let body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
        Self { status_code, body }
    }
}

/// Current UTC time, RFC 3339 with microseconds.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
