//! Codex session-file parsing.
//!
//! A pure fold over the file's lines into a [`CodexSessionRecord`]. Identity
//! fields keep the first value seen, activity fields keep the newest, and
//! the pending-task signal is the ordering of prompt/task-start timestamps
//! against terminal-event timestamps.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use log::warn;

use crate::session::util::truncate_chars;

use super::types::{CodexLine, CodexResponseItem};

/// Character budget for the surfaced message preview.
const MESSAGE_PREVIEW_MAX_CHARS: usize = 200;

/// Injected prompt scaffolding; never user prose.
const NON_USER_TEXT_PREFIXES: &[&str] = &[
    "<environment_context>",
    "<permissions instructions>",
    "<user_instructions>",
    "# AGENTS.md instructions",
];

/// Everything recovered from one Codex session file.
#[derive(Debug, Clone)]
pub struct CodexSessionRecord {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub cwd: Option<String>,
    pub session_id: Option<String>,
    pub last_message: Option<String>,
    pub last_role: Option<String>,
    pub last_activity_at: Option<String>,
    /// Newest "user sent a prompt" / "agent started working" timestamp.
    pub pending_signal_at: Option<DateTime<Utc>>,
    /// Newest "turn completed or aborted" timestamp.
    pub terminal_event_at: Option<DateTime<Utc>>,
    /// Newest user-interrupt timestamp.
    pub interrupt_at: Option<DateTime<Utc>>,
}

impl CodexSessionRecord {
    /// A task is pending iff the newest start signal has no terminal event
    /// after it. No terminal event at all counts as pending.
    pub fn has_pending_task(&self) -> bool {
        match (self.pending_signal_at, self.terminal_event_at) {
            (Some(pending), Some(terminal)) => pending > terminal,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// An interrupt was observed and nothing new was started after it.
    pub fn interrupt_acknowledged(&self) -> bool {
        match self.interrupt_at {
            Some(interrupt) => self
                .pending_signal_at
                .map(|pending| pending <= interrupt)
                .unwrap_or(true),
            None => false,
        }
    }

    pub fn pending_signal_age(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        let signal = self.pending_signal_at?;
        let secs = now.signed_duration_since(signal).num_seconds();
        Some(std::time::Duration::from_secs(secs.max(0) as u64))
    }
}

/// Parse one session file. Malformed lines are skipped; a file yielding no
/// usable line at all still produces a record (the correlator can match it
/// by recency, and the classifier degrades to file-age evidence).
pub fn parse_codex_session_file(path: &Path, modified: SystemTime) -> Option<CodexSessionRecord> {
    let file = File::open(path).ok()?;
    let reader = BufReader::new(file);

    let mut session_id: Option<String> = None;
    let mut cwd_meta: Option<String> = None;
    let mut cwd_turn: Option<String> = None;
    let mut cwd_env: Option<String> = None;
    let mut last_message: Option<String> = None;
    let mut last_role: Option<String> = None;
    let mut last_activity_at: Option<String> = None;
    let mut pending_signal_at: Option<DateTime<Utc>> = None;
    let mut terminal_event_at: Option<DateTime<Utc>> = None;
    let mut interrupt_at: Option<DateTime<Utc>> = None;

    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Ok(parsed) = serde_json::from_str::<CodexLine>(line) else {
            continue;
        };

        match parsed {
            CodexLine::SessionMeta { payload, .. } => {
                if let Some(payload) = payload {
                    if session_id.is_none() {
                        session_id = payload.id;
                    }
                    if cwd_meta.is_none() {
                        cwd_meta = payload.cwd;
                    }
                }
            }
            CodexLine::TurnContext { payload, .. } => {
                if let Some(cwd) = payload.and_then(|p| p.cwd) {
                    if !cwd.is_empty() {
                        cwd_turn = Some(cwd);
                    }
                }
            }
            CodexLine::ResponseItem { payload, timestamp } => {
                let Some(payload) = payload else { continue };
                if payload.kind.as_deref() != Some("message") {
                    continue;
                }
                let role = payload.role.clone();
                if let Some(text) = extract_text(&payload) {
                    if let Some(cwd) = extract_cwd_from_environment_context(&text) {
                        cwd_env = Some(cwd);
                    }
                    if let Some(role) = role.as_deref() {
                        if role == "assistant" || role == "user" {
                            if let Some(cleaned) = normalize_message_text(&text) {
                                last_message = Some(cleaned);
                                last_role = Some(role.to_string());
                                last_activity_at = timestamp.clone();
                                if role == "user" {
                                    // A genuine prompt starts a turn even
                                    // when the surrounding event stream got
                                    // lost.
                                    bump(&mut pending_signal_at, timestamp.as_deref());
                                }
                            }
                        }
                    }
                }
            }
            CodexLine::EventMsg { payload, timestamp } => {
                let Some(payload) = payload else { continue };
                match payload.kind.as_deref() {
                    Some("user_message") => {
                        if let Some(message) = payload.message.as_deref() {
                            if let Some(cwd) = extract_cwd_from_environment_context(message) {
                                cwd_env = Some(cwd);
                            }
                            if let Some(cleaned) = normalize_message_text(message) {
                                last_message = Some(cleaned);
                                last_role = Some("user".to_string());
                                last_activity_at = timestamp.clone();
                                bump(&mut pending_signal_at, timestamp.as_deref());
                            }
                        }
                    }
                    Some("task_started") | Some("agent_reasoning") => {
                        bump(&mut pending_signal_at, timestamp.as_deref());
                    }
                    Some("task_complete") => {
                        bump(&mut terminal_event_at, timestamp.as_deref());
                    }
                    Some("turn_aborted") => {
                        bump(&mut terminal_event_at, timestamp.as_deref());
                        bump(&mut interrupt_at, timestamp.as_deref());
                    }
                    _ => {}
                }
            }
            CodexLine::Unknown => {}
        }
    }

    let cwd = select_best_cwd(cwd_turn.clone(), cwd_env.clone(), cwd_meta.clone());
    if matches!(cwd.as_deref(), None | Some("/")) {
        warn!(
            "Codex session file has no usable cwd: file={:?}, session_id={:?}, cwd_turn={:?}, cwd_env={:?}, cwd_meta={:?}",
            path, session_id, cwd_turn, cwd_env, cwd_meta
        );
    }

    Some(CodexSessionRecord {
        path: path.to_path_buf(),
        modified,
        cwd,
        session_id,
        last_message,
        last_role,
        last_activity_at,
        pending_signal_at,
        terminal_event_at,
        interrupt_at,
    })
}

/// Later events overwrite earlier ones; events without a parsable timestamp
/// are dropped rather than guessed at.
fn bump(slot: &mut Option<DateTime<Utc>>, timestamp: Option<&str>) {
    let Some(parsed) = timestamp
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.with_timezone(&Utc))
    else {
        return;
    };
    match slot {
        Some(current) if *current >= parsed => {}
        _ => *slot = Some(parsed),
    }
}

fn extract_text(payload: &CodexResponseItem) -> Option<String> {
    let content = payload.content.as_ref()?;
    content
        .iter()
        .find(|item| item.kind == "output_text" || item.kind == "input_text")
        .and_then(|item| item.text.clone())
}

fn normalize_message_text(text: &str) -> Option<String> {
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

    Some(truncate_chars(trimmed, MESSAGE_PREVIEW_MAX_CHARS))
}

fn extract_cwd_from_environment_context(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let start = trimmed.find("<cwd>")? + "<cwd>".len();
    let rest = &trimmed[start..];
    let end = rest.find("</cwd>")?;
    let cwd = rest[..end].trim();
    if cwd.is_empty() {
        None
    } else {
        Some(cwd.to_string())
    }
}

/// Rank working-directory candidates: the per-turn context is the agent's
/// actual cwd, the environment tag is what the harness injected, the
/// session metadata is only the starting point. A bare "/" is what broken
/// launchers report, so it loses to anything concrete.
fn select_best_cwd(
    cwd_turn: Option<String>,
    cwd_env: Option<String>,
    cwd_meta: Option<String>,
) -> Option<String> {
    let candidates = [cwd_turn, cwd_env, cwd_meta];

    for candidate in candidates.iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() && trimmed != "/" {
            return Some(trimmed.to_string());
        }
    }

    for candidate in candidates.iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    None
}
