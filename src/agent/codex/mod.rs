//! Codex agent detection and session management.
//!
//! Codex keeps one JSONL file per session, nested by date under
//! `~/.codex/sessions`. The file records its own working directory, which
//! makes a recency-based correlation fallback safe for this family.

mod parser;
mod sessions;
mod types;
mod walk;

pub use parser::{parse_codex_session_file, CodexSessionRecord};
pub use sessions::{codex_session_roots, codex_sessions_in_roots};
pub use types::{CodexContentItem, CodexEvent, CodexLine, CodexResponseItem, CodexSessionMeta};
pub use walk::{collect_session_logs, parse_limit};

use crate::process::{AgentCommandFilter, OpenFileQuery};
use crate::session::{AgentKind, Session};

use super::{AgentDetector, AgentProcess};

static CODEX_COMMAND_FILTER: AgentCommandFilter = AgentCommandFilter {
    binary_names: &["codex"],
    match_process_name: false,
    // `codex app-server` is an editor-embedded background mode, not a user
    // session.
    excluded_subcommands: &["app-server"],
    excluded_wrappers: &[],
    open_file: Some(OpenFileQuery {
        path_contains: &["/.codex", "/sessions/"],
        suffix: ".jsonl",
        exclude_file_prefix: None,
    }),
    data_home_marker: Some("sessions"),
};

/// Detector for Codex agent sessions.
pub struct CodexDetector;

impl AgentDetector for CodexDetector {
    fn name(&self) -> &'static str {
        "Codex"
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Codex
    }

    fn command_filter(&self) -> &'static AgentCommandFilter {
        &CODEX_COMMAND_FILTER
    }

    fn find_sessions(&self, processes: &[AgentProcess]) -> Vec<Session> {
        if processes.is_empty() {
            return Vec::new();
        }
        let roots = codex_session_roots(processes);
        codex_sessions_in_roots(processes, &roots)
    }
}
