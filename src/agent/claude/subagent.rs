//! Subagent detection and counting.
//!
//! Subagents write their own `agent-*.jsonl` transcripts next to the main
//! session file, tagged with the parent session's id.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, SystemTime};

use log::trace;

use super::parser::ClaudeLogRecord;

/// A subagent counts as active if its file was written this recently.
const SUBAGENT_ACTIVE_WINDOW: Duration = Duration::from_secs(30);

/// How many leading lines to scan for the parent session id.
const SESSION_ID_SCAN_LINES: usize = 5;

/// Check if a transcript is a subagent file (named agent-*.jsonl)
pub fn is_subagent_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with("agent-") && name.ends_with(".jsonl"))
        .unwrap_or(false)
}

/// Extract the session id from a subagent file's opening lines.
fn subagent_session_id(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let reader = BufReader::new(file);

    for line in reader
        .lines()
        .take(SESSION_ID_SCAN_LINES)
        .map_while(Result::ok)
    {
        if let Ok(record) = serde_json::from_str::<ClaudeLogRecord>(&line) {
            if let Some(session_id) = record.session_id {
                return Some(session_id);
            }
        }
    }
    None
}

/// Count active subagents for a given parent session.
pub fn count_active_subagents(project_dir: &Path, parent_session_id: &str) -> usize {
    let now = SystemTime::now();

    let count = fs::read_dir(project_dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter(|e| is_subagent_file(&e.path()))
        .filter(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .map(|age| age < SUBAGENT_ACTIVE_WINDOW)
                .unwrap_or(false)
        })
        .filter(|e| {
            subagent_session_id(&e.path())
                .map(|id| id == parent_session_id)
                .unwrap_or(false)
        })
        .count();

    trace!(
        "Found {} active subagents for session {}",
        count,
        parent_session_id
    );
    count
}
