//! Claude transcript parsing - converts a session JSONL file into a Session.

use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::SystemTime;

use log::debug;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;

use crate::agent::AgentProcess;
use crate::session::util::{project_name_from_path, rfc3339_age, system_time_to_rfc3339, truncate_chars};
use crate::session::{
    classify, AgentKind, Role, Session, StatusEvidence, StatusThresholds, STREAMING_WINDOW,
};

/// Only the tail of a transcript matters for liveness; a ring buffer keeps
/// memory flat for multi-megabyte files.
const TAIL_LINE_WINDOW: usize = 100;

/// Character budget for the surfaced message preview. High enough for full
/// messages in tooltips, bounded against runaway payloads.
const MESSAGE_PREVIEW_MAX_CHARS: usize = 5000;

/// Slash commands handled entirely by the CLI; they never reach the agent
/// and must not be surfaced as the session's last message.
static LOCAL_SLASH_COMMANDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "/clear",
        "/compact",
        "/config",
        "/cost",
        "/doctor",
        "/help",
        "/init",
        "/login",
        "/logout",
        "/memory",
        "/model",
        "/permissions",
        "/pr-comments",
        "/review",
        "/status",
        "/terminal-setup",
        "/vim",
    ]
    .into_iter()
    .collect()
});

/// Injected boilerplate the CLI writes into user slots: environment context,
/// command wrappers, permission banners. Never user prose.
const NON_USER_TEXT_PREFIXES: &[&str] = &[
    "Caveat:",
    "<command-name>",
    "<local-command-stdout>",
    "<system-reminder>",
];

const INTERRUPT_MARKER: &str = "[Request interrupted by user";

/// One line of a Claude transcript.
#[derive(Debug, Deserialize)]
pub(crate) struct ClaudeLogRecord {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    #[serde(rename = "gitBranch")]
    pub git_branch: Option<String>,
    pub timestamp: Option<String>,
    pub message: Option<ClaudeMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClaudeMessage {
    pub role: Option<String>,
    pub content: Option<Value>,
}

/// Everything the tail fold recovers from one transcript.
#[derive(Debug, Default)]
struct ClaudeLogSummary {
    session_id: Option<String>,
    git_branch: Option<String>,
    last_timestamp: Option<String>,
    last_message: Option<String>,
    last_role: Option<String>,
    last_has_tool_use: bool,
    last_has_tool_result: bool,
    last_is_local_command: bool,
    last_is_interrupted: bool,
}

/// Parse a Claude session file and build a Session for the given process.
pub fn parse_claude_log(
    log_path: &Path,
    project_path: &str,
    process: &AgentProcess,
) -> Option<Session> {
    debug!("Parsing Claude transcript: {:?}", log_path);

    let file_age = log_path
        .metadata()
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok());
    let file_mtime = log_path.metadata().and_then(|m| m.modified()).ok();

    let summary = summarize_tail(log_path)?;
    let session_id = summary.session_id?;

    let streaming = file_age
        .map(|age| age < STREAMING_WINDOW)
        .unwrap_or(false);
    let message_age = summary.last_timestamp.as_deref().and_then(rfc3339_age);

    // Local commands leave the agent with nothing to do; dropping the role
    // keeps them from reading as a prompt awaiting an answer.
    let last_role = if summary.last_is_local_command {
        None
    } else {
        summary.last_role.as_deref().and_then(Role::from_str)
    };

    // The transcript has no explicit turn-terminal event: a plain assistant
    // text message is the turn's output. An unanswered user prompt or an
    // in-flight tool round therefore means a task is still pending.
    let turn_in_flight = match last_role {
        Some(Role::User) => !summary.last_is_interrupted,
        Some(Role::Assistant) => summary.last_has_tool_use || summary.last_has_tool_result,
        None => false,
    };
    let pending_task_age = if turn_in_flight { message_age } else { None };

    let evidence = StatusEvidence {
        cpu_usage: process.cpu_usage,
        last_role,
        message_age,
        activity_age: message_age.or(file_age),
        pending_task_age,
        interrupt_acknowledged: summary.last_is_interrupted,
        streaming,
    };
    let status = classify(&evidence, &StatusThresholds::claude());

    debug!(
        "Claude status: role={:?}, local_cmd={}, interrupted={}, streaming={}, cpu={:.1}% -> {:?}",
        summary.last_role,
        summary.last_is_local_command,
        summary.last_is_interrupted,
        streaming,
        process.cpu_usage,
        status
    );

    let last_activity_at = summary
        .last_timestamp
        .clone()
        .or_else(|| file_mtime.map(system_time_to_rfc3339))
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

    Some(Session {
        id: session_id,
        agent_kind: AgentKind::Claude,
        project_name: project_name_from_path(project_path),
        project_path: project_path.to_string(),
        git_branch: summary.git_branch,
        github_url: None,
        status,
        last_message: summary.last_message,
        last_message_role: summary.last_role,
        last_activity_at,
        pid: process.pid,
        cpu_usage: process.cpu_usage,
        memory_bytes: process.memory_bytes,
        active_subagent_count: 0, // filled in by the session builder
        is_background: false,
        source_path: Some(log_path.to_string_lossy().to_string()),
    })
}

/// Fold over the last [`TAIL_LINE_WINDOW`] lines, newest first. Identity
/// fields take the first value seen; the message preview takes the newest
/// displayable text.
fn summarize_tail(log_path: &Path) -> Option<ClaudeLogSummary> {
    let file = File::open(log_path).ok()?;
    let reader = BufReader::new(file);

    let mut tail: VecDeque<String> = VecDeque::with_capacity(TAIL_LINE_WINDOW);
    for line in reader.lines().map_while(Result::ok) {
        if tail.len() >= TAIL_LINE_WINDOW {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    let mut summary = ClaudeLogSummary::default();
    let mut found_status_info = false;

    for line in tail.iter().rev() {
        let Ok(record) = serde_json::from_str::<ClaudeLogRecord>(line) else {
            continue; // malformed lines are skipped, not fatal
        };

        if summary.session_id.is_none() {
            summary.session_id = record.session_id;
        }
        if summary.git_branch.is_none() {
            summary.git_branch = record.git_branch;
        }
        if summary.last_timestamp.is_none() {
            summary.last_timestamp = record.timestamp;
        }

        // Liveness comes from the newest record that actually has content.
        if !found_status_info {
            if let Some(message) = &record.message {
                if let Some(content) = &message.content {
                    if content_is_nonempty(content) {
                        summary.last_role = message.role.clone();
                        summary.last_has_tool_use = has_tool_use(content);
                        summary.last_has_tool_result = has_tool_result(content);
                        summary.last_is_local_command = is_local_slash_command(content);
                        summary.last_is_interrupted = is_interrupted_request(content);
                        found_status_info = true;
                    }
                }
            }
        }

        if summary.session_id.is_some() && found_status_info && summary.last_message.is_some() {
            break;
        }

        // Preview comes from the newest displayable text, which may sit a
        // few records behind the status evidence.
        if summary.last_message.is_none() {
            if let Some(message) = &record.message {
                if let Some(text) = message.content.as_ref().and_then(displayable_text) {
                    summary.last_message =
                        Some(truncate_chars(&text, MESSAGE_PREVIEW_MAX_CHARS));
                }
            }
        }
    }

    Some(summary)
}

fn content_is_nonempty(content: &Value) -> bool {
    match content {
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        _ => false,
    }
}

/// The newest piece of genuine conversational text in a record, if any.
fn displayable_text(content: &Value) -> Option<String> {
    let text = match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(arr) => arr.iter().find_map(|block| {
            block
                .get("text")
                .and_then(|t| t.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from)
        }),
        _ => None,
    }?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if NON_USER_TEXT_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
    {
        return None;
    }
    if trimmed.contains(INTERRUPT_MARKER) {
        return None;
    }
    if is_local_command_text(trimmed) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Whether content carries a `tool_use` block (the agent invoking a tool).
pub fn has_tool_use(content: &Value) -> bool {
    content
        .as_array()
        .map(|arr| {
            arr.iter()
                .any(|block| block.get("type").and_then(|t| t.as_str()) == Some("tool_use"))
        })
        .unwrap_or(false)
}

/// Whether content carries a `tool_result` block (a tool reporting back).
pub fn has_tool_result(content: &Value) -> bool {
    content
        .as_array()
        .map(|arr| {
            arr.iter()
                .any(|block| block.get("type").and_then(|t| t.as_str()) == Some("tool_result"))
        })
        .unwrap_or(false)
}

/// Whether content is one of the CLI-local slash commands.
pub fn is_local_slash_command(content: &Value) -> bool {
    match content {
        Value::String(s) => is_local_command_text(s),
        Value::Array(arr) => arr.iter().any(|block| {
            block.get("type").and_then(|t| t.as_str()) == Some("text")
                && block
                    .get("text")
                    .and_then(|t| t.as_str())
                    .map(is_local_command_text)
                    .unwrap_or(false)
        }),
        _ => false,
    }
}

fn is_local_command_text(text: &str) -> bool {
    let first_token = text.trim().split_whitespace().next().unwrap_or("");
    LOCAL_SLASH_COMMANDS.contains(first_token)
}

/// Whether content carries the user-interrupt marker.
pub fn is_interrupted_request(content: &Value) -> bool {
    match content {
        Value::String(s) => s.contains(INTERRUPT_MARKER),
        Value::Array(arr) => arr.iter().any(|block| {
            block
                .get("text")
                .and_then(|t| t.as_str())
                .map(|text| text.contains(INTERRUPT_MARKER))
                .unwrap_or(false)
        }),
        _ => false,
    }
}
