use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// Who produced a chat turn. Closed set.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Durable per-device identifier for the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Represents a single chat turn in the persisted message log.
// Field names match the JSON the browser widget wrote (`ts` for the timestamp).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LogEntry {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    // Short annotation, e.g. "Intent: order_status"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
    #[serde(rename = "ts", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(role: Role, text: impl Into<String>, meta: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            meta,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text, None)
    }

    pub fn bot(text: impl Into<String>, meta: Option<String>) -> Self {
        Self::new(Role::Bot, text, meta)
    }
}

/// One item of the conversation context window sent to the responder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ContextItem {
    pub role: Role,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&LogEntry> for ContextItem {
    fn from(entry: &LogEntry) -> Self {
        Self {
            role: entry.role,
            message: entry.text.clone(),
            timestamp: entry.timestamp,
        }
    }
}

// Request body posted to the webhook
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub message: String,
    pub session_id: String,
    pub timestamp: String,
    // Always present; empty when context memory is disabled
    pub context: Vec<ContextItem>,
    pub context_enabled: bool,
}

impl WebhookRequest {
    pub fn new(
        message: impl Into<String>,
        session_id: &SessionId,
        context: Vec<ContextItem>,
        context_enabled: bool,
    ) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.as_str().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            context,
            context_enabled,
        }
    }
}

// Response body from the webhook. Every field is optional on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookReply {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_used: Option<bool>,
}
