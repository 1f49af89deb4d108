//! Agent process discovery, shared by all three families.
//!
//! Each family describes itself with an [`AgentCommandFilter`]; the walk
//! over the snapshot, the supervisor/child exclusion, the wrapper exclusion
//! and the open-file attachment are the same for everyone.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use log::{debug, trace};

use crate::agent::AgentProcess;
use crate::process::provider::{OpenFileQuery, ProcessInfo, ProcessProvider};

/// Our own binary name; anything carrying it is part of the monitoring
/// tool's process tree, not a user session.
const SELF_PROCESS_NAME: &str = "agent-radar";

/// How many leading command-line tokens are checked for the agent binary.
/// Interpreter launches ("node /usr/local/bin/claude") put the binary in the
/// second or third slot.
const COMMAND_TOKEN_WINDOW: usize = 3;

/// How one agent family shows up in the process table.
#[derive(Debug, Clone, Copy)]
pub struct AgentCommandFilter {
    /// Binary names matched against the leading command tokens, either bare
    /// or as the final path component.
    pub binary_names: &'static [&'static str],
    /// Also accept a process whose name equals a binary name (OpenCode's
    /// launcher rewrites its argv).
    pub match_process_name: bool,
    /// Subcommands that are not interactive sessions (Codex `app-server`).
    pub excluded_subcommands: &'static [&'static str],
    /// Embedding wrappers whose children are editor-spawned, not
    /// user-initiated terminal sessions.
    pub excluded_wrappers: &'static [&'static str],
    /// How to recognize this family's session transcript among the
    /// process's open files, when the family keeps it open.
    pub open_file: Option<OpenFileQuery>,
    /// Name of the ancestor directory of an attached file that marks the
    /// family's storage root (the "data home"), used to discover extra
    /// profile roots.
    pub data_home_marker: Option<&'static str>,
}

/// Filter a snapshot down to one family's candidate processes.
pub fn find_agent_processes(
    snapshot: &[ProcessInfo],
    provider: &dyn ProcessProvider,
    filter: &AgentCommandFilter,
) -> Vec<AgentProcess> {
    let by_pid: HashMap<u32, &ProcessInfo> =
        snapshot.iter().map(|info| (info.pid, info)).collect();

    // First pass: every pid passing the command filter, so the second pass
    // can spot supervisor/child pairs of the same family.
    let family_pids: HashSet<u32> = snapshot
        .iter()
        .filter(|info| command_matches(filter, info))
        .map(|info| info.pid)
        .collect();

    let mut processes = Vec::new();

    for info in snapshot {
        if !family_pids.contains(&info.pid) {
            continue;
        }

        if is_own_tool(info) {
            trace!("Skipping our own tool: pid={}, name={}", info.pid, info.name);
            continue;
        }

        if has_excluded_subcommand(filter, info) {
            debug!(
                "Skipping non-interactive subcommand: pid={}, cmd={:?}",
                info.pid,
                &info.cmd[..info.cmd.len().min(3)]
            );
            continue;
        }

        if let Some(parent_pid) = info.parent_pid {
            if family_pids.contains(&parent_pid) {
                debug!(
                    "Skipping sub-agent process: pid={}, parent_pid={}",
                    info.pid, parent_pid
                );
                continue;
            }

            if let Some(parent) = by_pid.get(&parent_pid) {
                let parent_cmd = parent.cmd.join(" ");
                if filter
                    .excluded_wrappers
                    .iter()
                    .any(|wrapper| parent_cmd.contains(wrapper))
                {
                    debug!(
                        "Skipping editor-embedded agent: pid={}, parent_pid={}",
                        info.pid, parent_pid
                    );
                    continue;
                }
            }
        }

        let cwd = provider.cwd(info.pid);
        let attached_session_file = filter
            .open_file
            .as_ref()
            .and_then(|query| provider.newest_open_file(info.pid, query));
        let data_home = match (&attached_session_file, filter.data_home_marker) {
            (Some(path), Some(marker)) => infer_data_home(path, marker),
            _ => None,
        };

        debug!(
            "Found agent process: pid={}, cwd={:?}, cpu={:.1}%, mem={}MB, attached={:?}",
            info.pid,
            cwd,
            info.cpu_usage,
            info.memory_bytes / 1024 / 1024,
            attached_session_file
        );

        processes.push(AgentProcess {
            pid: info.pid,
            parent_pid: info.parent_pid,
            pgid: info.pgid,
            cpu_usage: info.cpu_usage,
            memory_bytes: info.memory_bytes,
            cwd,
            start_time_secs: info.start_time_secs,
            attached_session_file,
            data_home,
        });
    }

    debug!(
        "Discovery complete: {} of {} snapshot processes matched",
        processes.len(),
        snapshot.len()
    );
    processes
}

fn command_matches(filter: &AgentCommandFilter, info: &ProcessInfo) -> bool {
    for token in info.cmd.iter().take(COMMAND_TOKEN_WINDOW) {
        let token = token.to_lowercase();
        for name in filter.binary_names {
            if token == *name || token.ends_with(&format!("/{name}")) {
                return true;
            }
        }
    }

    if filter.match_process_name {
        let name = info.name.to_lowercase();
        if filter.binary_names.iter().any(|binary| name == *binary) {
            return true;
        }
    }

    false
}

fn is_own_tool(info: &ProcessInfo) -> bool {
    if info.name.contains(SELF_PROCESS_NAME) {
        return true;
    }
    info.cmd
        .iter()
        .any(|token| token.contains(SELF_PROCESS_NAME))
}

fn has_excluded_subcommand(filter: &AgentCommandFilter, info: &ProcessInfo) -> bool {
    if filter.excluded_subcommands.is_empty() {
        return false;
    }
    // The subcommand sits right after the binary token, so checking the
    // leading window plus one is enough.
    info.cmd
        .iter()
        .take(COMMAND_TOKEN_WINDOW + 1)
        .skip(1)
        .any(|token| filter.excluded_subcommands.contains(&token.as_str()))
}

fn infer_data_home(session_file: &std::path::Path, marker: &str) -> Option<PathBuf> {
    session_file
        .ancestors()
        .find(|ancestor| ancestor.file_name().and_then(|name| name.to_str()) == Some(marker))
        .map(PathBuf::from)
}
