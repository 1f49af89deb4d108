//! Bounded discovery of Codex session files.
//!
//! Codex nests session files by date under its roots, and years of history
//! accumulate there. The walk is an explicit worklist with depth and
//! fan-out caps, and the number of files actually parsed scales with how
//! many candidate processes there are — a poll cycle's latency must not
//! grow with the size of the archive.

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use log::trace;

/// Session trees are date-nested a few levels deep; anything deeper is not
/// a session store.
const MAX_WALK_DEPTH: usize = 6;
/// Per-directory fan-out cap against pathological trees.
const MAX_DIR_ENTRIES: usize = 512;
/// Parse-limit scaling: this many candidate files per candidate process.
const PARSE_LIMIT_PER_PROCESS: usize = 4;
const PARSE_LIMIT_MIN: usize = 8;
const PARSE_LIMIT_MAX: usize = 64;

/// How many of the newest session files are worth parsing for the given
/// number of candidate processes.
pub fn parse_limit(process_count: usize) -> usize {
    (process_count * PARSE_LIMIT_PER_PROCESS).clamp(PARSE_LIMIT_MIN, PARSE_LIMIT_MAX)
}

/// Collect up to `limit` session files across all roots, newest first.
pub fn collect_session_logs(roots: &[PathBuf], limit: usize) -> Vec<(PathBuf, SystemTime)> {
    let mut found: Vec<(PathBuf, SystemTime)> = Vec::new();
    let mut worklist: Vec<(PathBuf, usize)> = roots.iter().map(|root| (root.clone(), 0)).collect();

    while let Some((dir, depth)) = worklist.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            trace!("Unreadable directory in session walk: {:?}", dir);
            continue;
        };

        for entry in entries.flatten().take(MAX_DIR_ENTRIES) {
            let path = entry.path();
            if path.is_dir() {
                if depth + 1 <= MAX_WALK_DEPTH {
                    worklist.push((path, depth + 1));
                }
            } else if path.extension().map(|ext| ext == "jsonl").unwrap_or(false) {
                if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                    found.push((path, modified));
                }
            }
        }
    }

    found.sort_by(|a, b| b.1.cmp(&a.1));
    found.truncate(limit);
    found
}
