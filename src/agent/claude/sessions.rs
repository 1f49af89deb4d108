//! Claude session assembly: locate candidate transcripts, correlate them to
//! processes, and build the final sessions.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{debug, trace, warn};

use crate::agent::AgentProcess;
use crate::session::{
    correlate, status_sort_priority, AgentKind, CandidateFile, CorrelationPolicy, Session,
    PRESTART_SLACK,
};

use super::parser::parse_claude_log;
use super::path_codec::{decode_project_dir_name, encode_project_path};
use super::subagent::{count_active_subagents, is_subagent_file};

/// Sibling transcripts written this recently are checked for a more urgent
/// status (subagent rounds keep writing while the main file goes quiet).
const SIBLING_RECONCILE_WINDOW: Duration = Duration::from_secs(10);

/// Session transcripts of a project directory, newest first. Subagent files
/// are excluded; they are counted separately.
pub fn session_log_files(project_dir: &Path) -> Vec<(PathBuf, SystemTime)> {
    let mut files: Vec<(PathBuf, SystemTime)> = fs::read_dir(project_dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter(|e| {
            let path = e.path();
            path.extension().map(|ext| ext == "jsonl").unwrap_or(false) && !is_subagent_file(&path)
        })
        .filter_map(|e| {
            let modified = e.metadata().and_then(|m| m.modified()).ok()?;
            Some((e.path(), modified))
        })
        .collect();

    files.sort_by(|a, b| b.1.cmp(&a.1));
    files
}

/// Build sessions for all Claude processes against the given project roots.
/// Every process yields exactly one session: parsed when a transcript could
/// be correlated, a fallback otherwise.
pub fn claude_sessions_in_roots(processes: &[AgentProcess], roots: &[PathBuf]) -> Vec<Session> {
    let mut sessions = Vec::new();
    let mut remaining: Vec<&AgentProcess> = Vec::new();

    // Processes holding their transcript open need no directory matching.
    for process in processes {
        if let Some(attached) = &process.attached_session_file {
            if let Some(session) = session_from_attached_file(attached, process) {
                debug!(
                    "Session matched via open file: pid={}, file={:?}",
                    process.pid, attached
                );
                sessions.push(session);
                continue;
            }
            warn!(
                "Attached session file unreadable for pid={}, trying directory match",
                process.pid
            );
        }
        remaining.push(process);
    }

    let files = candidate_files(&remaining, roots);
    debug!(
        "Claude correlation: {} processes, {} candidate files",
        remaining.len(),
        files.len()
    );

    let assignments = correlate(
        &remaining,
        &files,
        CorrelationPolicy {
            // Transcripts are scoped to their project directory; picking an
            // unrelated project's file would be worse than a fallback.
            global_fallback: false,
            prestart_slack: PRESTART_SLACK,
        },
    );

    for assignment in assignments {
        let process = assignment.process;
        let session = assignment.file_index.and_then(|index| {
            let file = &files[index];
            let project_path = process
                .cwd
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
                .or_else(|| file.cwd.clone())
                .unwrap_or_else(|| "/".to_string());
            build_claude_session(&file.path, &project_path, process)
        });

        match session {
            Some(session) => sessions.push(session),
            None => {
                warn!(
                    "No parsable transcript for pid={}, synthesizing fallback",
                    process.pid
                );
                sessions.push(Session::fallback(AgentKind::Claude, process));
            }
        }
    }

    sessions
}

/// Candidate transcripts for the given processes: the project directories
/// named by each distinct working directory, across every root.
fn candidate_files(processes: &[&AgentProcess], roots: &[PathBuf]) -> Vec<CandidateFile> {
    let mut cwds: Vec<String> = Vec::new();
    let mut seen_cwds = HashSet::new();
    for process in processes {
        if let Some(cwd) = &process.cwd {
            let cwd = cwd.to_string_lossy().to_string();
            if seen_cwds.insert(cwd.clone()) {
                cwds.push(cwd);
            }
        } else {
            warn!("Process pid={} has no cwd, cannot locate its project", process.pid);
        }
    }

    let mut files = Vec::new();
    let mut seen_paths = HashSet::new();
    for cwd in &cwds {
        for root in roots {
            for dir_name in candidate_dir_names(cwd) {
                let project_dir = root.join(&dir_name);
                if !project_dir.is_dir() {
                    trace!("No project directory {:?} under {:?}", dir_name, root);
                    continue;
                }
                for (path, modified) in session_log_files(&project_dir) {
                    if seen_paths.insert(path.clone()) {
                        files.push(CandidateFile {
                            path,
                            modified,
                            cwd: Some(cwd.clone()),
                        });
                    }
                }
            }
        }
    }

    files
}

/// Directory names a working directory may be stored under. Legacy project
/// directories flattened "_" to "-" as well.
fn candidate_dir_names(cwd: &str) -> Vec<String> {
    let exact = encode_project_path(cwd);
    let normalized = exact.replace('_', "-");
    if normalized != exact {
        vec![exact, normalized]
    } else {
        vec![exact]
    }
}

fn session_from_attached_file(attached: &Path, process: &AgentProcess) -> Option<Session> {
    let project_path = process
        .cwd
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .or_else(|| {
            attached
                .parent()
                .and_then(|dir| dir.file_name())
                .and_then(|name| name.to_str())
                .map(decode_project_dir_name)
        })?;
    build_claude_session(attached, &project_path, process)
}

fn build_claude_session(
    log_path: &Path,
    project_path: &str,
    process: &AgentProcess,
) -> Option<Session> {
    let mut session = parse_claude_log(log_path, project_path, process)?;
    let project_dir = log_path.parent()?;
    session.active_subagent_count = count_active_subagents(project_dir, &session.id);
    reconcile_with_recent_siblings(&mut session, log_path, project_dir, project_path, process);
    Some(session)
}

/// Adopt a more urgent status from very recently written sibling files that
/// belong to the same logical session.
fn reconcile_with_recent_siblings(
    session: &mut Session,
    primary: &Path,
    project_dir: &Path,
    project_path: &str,
    process: &AgentProcess,
) {
    let now = SystemTime::now();

    for (path, modified) in session_log_files(project_dir) {
        if path == primary {
            continue;
        }
        let is_recent = now
            .duration_since(modified)
            .map(|age| age < SIBLING_RECONCILE_WINDOW)
            .unwrap_or(false);
        if !is_recent {
            continue;
        }

        if let Some(other) = parse_claude_log(&path, project_path, process) {
            // Only files from the same session may contribute; without this
            // check one session's activity contaminates another.
            if other.id != session.id {
                trace!(
                    "Skipping status from different session: {} vs {}",
                    session.id,
                    other.id
                );
                continue;
            }

            if status_sort_priority(&other.status) < status_sort_priority(&session.status) {
                debug!(
                    "More active status in {:?}: {:?} -> {:?}",
                    path, session.status, other.status
                );
                session.status = other.status;
            }
        }
    }
}
