//! Reads over OpenCode's JSON object store.
//!
//! Everything lives as small JSON documents: `project/*.json`,
//! `session/{project_id}/*.json`, `message/{session_id}/*.json` and
//! `part/{message_id}/*.json`. Unreadable or malformed documents are
//! skipped individually.

use std::path::{Path, PathBuf};

use log::debug;

use crate::session::util::truncate_chars;

use super::types::{OpenCodeMessage, OpenCodePart, OpenCodeProject, OpenCodeSession};

/// Character budget for the surfaced message preview.
const MESSAGE_PREVIEW_MAX_CHARS: usize = 200;

/// Load all project definitions from storage/project/*.json
pub fn load_projects(storage_path: &Path) -> Vec<OpenCodeProject> {
    let project_dir = storage_path.join("project");
    let mut projects = Vec::new();

    if let Ok(entries) = std::fs::read_dir(&project_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(project) = read_json::<OpenCodeProject>(&path) {
                projects.push(project);
            }
        }
    }

    projects
}

/// Find the latest session in a directory, optionally filtering by
/// directory match (the session's directory being the cwd or one of its
/// ancestors).
pub fn find_latest_session_in_dir(
    session_dir: &Path,
    filter_directory: Option<&str>,
) -> Option<OpenCodeSession> {
    let mut latest_session: Option<(OpenCodeSession, u64)> = None;

    if let Ok(entries) = std::fs::read_dir(session_dir) {
        for entry in entries.flatten() {
            let Some(session) = read_json::<OpenCodeSession>(&entry.path()) else {
                continue;
            };

            if let Some(dir) = filter_directory {
                if dir != session.directory
                    && !dir.starts_with(&format!("{}/", session.directory))
                {
                    continue;
                }
            }

            let updated = session.time.updated;
            if latest_session
                .as_ref()
                .map(|(_, t)| updated > *t)
                .unwrap_or(true)
            {
                latest_session = Some((session, updated));
            }
        }
    }

    latest_session.map(|(session, _)| session)
}

/// Load one session document directly (used for files resolved through a
/// process's open descriptors).
pub fn load_session_from_file(path: &Path) -> Option<OpenCodeSession> {
    read_json::<OpenCodeSession>(path)
}

/// Get the last message role, text and creation time (ms) for a session.
pub fn get_last_message(
    storage_path: &Path,
    session_id: &str,
) -> (Option<String>, Option<String>, u64) {
    let message_dir = storage_path.join("message").join(session_id);

    if !message_dir.exists() {
        debug!("Message dir does not exist: {:?}", message_dir);
        return (None, None, 0);
    }

    // (role, message_id, created)
    let mut messages: Vec<(String, String, u64)> = Vec::new();

    if let Ok(entries) = std::fs::read_dir(&message_dir) {
        for entry in entries.flatten() {
            if let Some(msg) = read_json::<OpenCodeMessage>(&entry.path()) {
                messages.push((msg.role, msg.id, msg.time.created));
            }
        }
    }

    // Newest first
    messages.sort_by(|a, b| b.2.cmp(&a.2));

    let message_count = messages.len();

    // The newest message with displayable text wins; system prompts and
    // tool-only messages are skipped.
    for (role, message_id, created) in messages {
        if let Some(text) = get_message_text(storage_path, &message_id) {
            debug!(
                "Session {} has {} messages, showing: id={}, role={}, created={}",
                session_id, message_count, message_id, role, created
            );
            return (Some(role), Some(text), created);
        }
    }

    debug!(
        "Session {} has {} messages but no displayable text",
        session_id, message_count
    );
    (None, None, 0)
}

/// Get the text content from a message's parts.
fn get_message_text(storage_path: &Path, message_id: &str) -> Option<String> {
    let part_dir = storage_path.join("part").join(message_id);

    if !part_dir.exists() {
        return None;
    }

    let mut text_content: Option<String> = None;
    let mut reasoning_content: Option<String> = None;

    // "text" parts are preferred, "reasoning" is the fallback.
    if let Ok(entries) = std::fs::read_dir(&part_dir) {
        for entry in entries.flatten() {
            let Some(part) = read_json::<OpenCodePart>(&entry.path()) else {
                continue;
            };
            if part.part_type == "text" {
                if let Some(text) = part.text {
                    text_content = Some(text);
                }
            } else if part.part_type == "reasoning" && reasoning_content.is_none() {
                if let Some(text) = part.text {
                    reasoning_content = Some(text);
                }
            }
        }
    }

    let content = text_content.or(reasoning_content)?;

    // Skip XML-formatted instruction blocks injected as user messages.
    let trimmed = content.trim();
    if trimmed.starts_with('<') && (trimmed.contains("mode>") || trimmed.contains("instructions")) {
        return None;
    }

    Some(truncate_chars(trimmed, MESSAGE_PREVIEW_MAX_CHARS))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.extension().map(|e| e == "json").unwrap_or(false) {
        return None;
    }
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str::<T>(&content).ok()
}

/// Default storage root: ~/.local/share/opencode/storage
pub fn default_storage_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".local")
            .join("share")
            .join("opencode")
            .join("storage")
    })
}
