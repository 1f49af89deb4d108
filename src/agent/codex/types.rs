//! Line schema for Codex JSONL session files.
//!
//! Every line is a tagged record; tags this version doesn't know about land
//! in [`CodexLine::Unknown`] instead of failing the file.

use serde::Deserialize;

/// A single line in a Codex JSONL session file.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum CodexLine {
    #[serde(rename = "session_meta")]
    SessionMeta {
        payload: Option<CodexSessionMeta>,
        timestamp: Option<String>,
    },
    #[serde(rename = "turn_context")]
    TurnContext {
        payload: Option<CodexTurnContext>,
        timestamp: Option<String>,
    },
    #[serde(rename = "response_item")]
    ResponseItem {
        payload: Option<CodexResponseItem>,
        timestamp: Option<String>,
    },
    #[serde(rename = "event_msg")]
    EventMsg {
        payload: Option<CodexEvent>,
        timestamp: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Payload of a `session_meta` line.
#[derive(Debug, Deserialize)]
pub struct CodexSessionMeta {
    pub id: Option<String>,
    pub cwd: Option<String>,
}

/// Payload of a `turn_context` line.
#[derive(Debug, Deserialize)]
pub struct CodexTurnContext {
    pub cwd: Option<String>,
}

/// Payload of a `response_item` line.
#[derive(Debug, Deserialize)]
pub struct CodexResponseItem {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub role: Option<String>,
    pub content: Option<Vec<CodexContentItem>>,
}

/// Content block within a `response_item` message.
#[derive(Debug, Deserialize)]
pub struct CodexContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

/// Payload of an `event_msg` line.
#[derive(Debug, Deserialize)]
pub struct CodexEvent {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Set for `user_message` events.
    pub message: Option<String>,
}
