//! Claude Code detection and session parsing.
//!
//! Claude stores one JSONL transcript per session inside a per-project
//! directory whose name is the flattened project path (see
//! [`path_codec`]), under one or more profile roots.

mod parser;
mod path_codec;
mod sessions;
mod storage;
mod subagent;

pub use parser::{
    has_tool_result, has_tool_use, is_interrupted_request, is_local_slash_command,
    parse_claude_log,
};
pub use path_codec::{decode_project_dir_name, encode_project_path};
pub use sessions::{claude_sessions_in_roots, session_log_files};
pub use storage::claude_project_roots;
pub use subagent::{count_active_subagents, is_subagent_file};

use crate::process::{AgentCommandFilter, OpenFileQuery};
use crate::session::{AgentKind, Session};

use super::{AgentDetector, AgentProcess};

static CLAUDE_COMMAND_FILTER: AgentCommandFilter = AgentCommandFilter {
    binary_names: &["claude"],
    match_process_name: false,
    excluded_subcommands: &[],
    // Zed's external agent auto-spawns claude processes that are not
    // user-initiated terminal sessions.
    excluded_wrappers: &["claude-code-acp"],
    open_file: Some(OpenFileQuery {
        path_contains: &["/.claude", "/projects/"],
        suffix: ".jsonl",
        exclude_file_prefix: Some("agent-"),
    }),
    // <root>/projects/<project-dir>/<session>.jsonl -> <root>/projects
    data_home_marker: Some("projects"),
};

pub struct ClaudeDetector;

impl AgentDetector for ClaudeDetector {
    fn name(&self) -> &'static str {
        "Claude Code"
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Claude
    }

    fn command_filter(&self) -> &'static AgentCommandFilter {
        &CLAUDE_COMMAND_FILTER
    }

    fn find_sessions(&self, processes: &[AgentProcess]) -> Vec<Session> {
        if processes.is_empty() {
            return Vec::new();
        }
        let roots = claude_project_roots(processes);
        claude_sessions_in_roots(processes, &roots)
    }
}
