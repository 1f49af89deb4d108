//! OpenCode agent detection and session parsing
//!
//! OpenCode persists everything as small JSON documents in an object store
//! under `~/.local/share/opencode/storage`: projects, sessions, messages
//! and message parts in separate subdirectories.

mod sessions;
mod store;
mod types;

pub use sessions::opencode_sessions_in_storage;
pub use store::{
    default_storage_path, find_latest_session_in_dir, get_last_message, load_projects,
    load_session_from_file,
};
pub use types::*;

use std::collections::HashSet;
use std::path::PathBuf;

use crate::process::{AgentCommandFilter, OpenFileQuery};
use crate::session::{AgentKind, Session};

use super::{AgentDetector, AgentProcess};

static OPENCODE_COMMAND_FILTER: AgentCommandFilter = AgentCommandFilter {
    binary_names: &["opencode"],
    // The launcher rewrites argv, so the process name is the reliable
    // signal for this family.
    match_process_name: true,
    excluded_subcommands: &[],
    excluded_wrappers: &[],
    open_file: Some(OpenFileQuery {
        path_contains: &["/opencode/storage/session/"],
        suffix: ".json",
        exclude_file_prefix: None,
    }),
    data_home_marker: Some("storage"),
};

/// Detector for OpenCode agent sessions
pub struct OpenCodeDetector;

impl AgentDetector for OpenCodeDetector {
    fn name(&self) -> &'static str {
        "OpenCode"
    }

    fn kind(&self) -> AgentKind {
        AgentKind::OpenCode
    }

    fn command_filter(&self) -> &'static AgentCommandFilter {
        &OPENCODE_COMMAND_FILTER
    }

    fn find_sessions(&self, processes: &[AgentProcess]) -> Vec<Session> {
        if processes.is_empty() {
            return Vec::new();
        }

        let mut roots: Vec<PathBuf> = Vec::new();
        if let Some(default) = default_storage_path() {
            roots.push(default);
        }
        for process in processes {
            if let Some(data_home) = &process.data_home {
                roots.push(data_home.clone());
            }
        }
        let mut seen = HashSet::new();
        let roots: Vec<PathBuf> = roots.into_iter().filter(|p| seen.insert(p.clone())).collect();

        let mut sessions = Vec::new();
        for storage_path in &roots {
            if !storage_path.exists() {
                log::debug!("OpenCode storage does not exist: {:?}", storage_path);
                continue;
            }
            // With several roots a pid can get one record per root; the pid
            // dedupe in aggregation keeps the strongest one.
            sessions.extend(opencode_sessions_in_storage(processes, storage_path));
        }

        if sessions.is_empty() {
            // No readable storage at all still yields fallback sessions.
            sessions = processes
                .iter()
                .map(|process| Session::fallback(AgentKind::OpenCode, process))
                .collect();
        }

        sessions
    }
}
