//! OpenCode session assembly.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{debug, info};

use crate::agent::AgentProcess;
use crate::session::util::{project_name_from_path, rfc3339_age};
use crate::session::{
    classify, AgentKind, Role, Session, StatusEvidence, StatusThresholds,
};

use super::store::{
    find_latest_session_in_dir, get_last_message, load_projects, load_session_from_file,
};
use super::types::{OpenCodeProject, OpenCodeSession};

/// Build sessions for all OpenCode processes against one storage root.
/// Matching prefers, in order: the session document a process holds open,
/// a project whose worktree/sandbox contains the process cwd, and the
/// global session bucket filtered by directory. Anything left over becomes
/// a fallback session.
pub fn opencode_sessions_in_storage(
    processes: &[AgentProcess],
    storage_path: &Path,
) -> Vec<Session> {
    let mut sessions = Vec::new();
    let mut matched_pids: HashSet<u32> = HashSet::new();

    // Exact open session files from process descriptors come first.
    for process in processes {
        let Some(active_file) = &process.attached_session_file else {
            continue;
        };
        let Some(open_session) = load_session_from_file(active_file) else {
            continue;
        };

        let project_path = process
            .cwd
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| open_session.directory.clone());

        debug!(
            "OpenCode session matched via open file: pid={}, file={:?}, project_id={}",
            process.pid, active_file, open_session.project_id
        );

        sessions.push(build_session(
            storage_path,
            open_session,
            process,
            project_path,
        ));
        matched_pids.insert(process.pid);
    }

    // Build cwd -> process map for the rest.
    let mut cwd_to_process: HashMap<String, &AgentProcess> = HashMap::new();
    for process in processes {
        if matched_pids.contains(&process.pid) {
            continue;
        }
        if let Some(cwd) = &process.cwd {
            cwd_to_process.insert(cwd.to_string_lossy().to_string(), process);
        }
    }

    let projects = load_projects(storage_path);
    debug!("Loaded {} OpenCode projects", projects.len());

    // Match projects to running processes (non-global projects first).
    for project in &projects {
        if project.id == "global" {
            continue; // handled separately below
        }

        if let Some(process) = find_matching_process(&cwd_to_process, project) {
            debug!(
                "Project {} matched to process pid={}",
                project.worktree, process.pid
            );
            if let Some(session) = latest_session_for_project(storage_path, project, process) {
                matched_pids.insert(process.pid);
                sessions.push(session);
            }
        }
    }

    // Unmatched processes may belong to sessions in the global bucket.
    for process in processes {
        if matched_pids.contains(&process.pid) {
            continue;
        }
        if let Some(cwd) = &process.cwd {
            let cwd_str = cwd.to_string_lossy().to_string();
            if let Some(session) = global_session_for_directory(storage_path, &cwd_str, process) {
                debug!(
                    "Global session matched for directory {} to process pid={}",
                    cwd_str, process.pid
                );
                matched_pids.insert(process.pid);
                sessions.push(session);
            }
        }
    }

    // Every surviving process still yields a session.
    for process in processes {
        if !matched_pids.contains(&process.pid) {
            sessions.push(Session::fallback(AgentKind::OpenCode, process));
        }
    }

    sessions
}

/// Find a process that matches the given project's worktree or sandboxes
fn find_matching_process<'a>(
    cwd_to_process: &HashMap<String, &'a AgentProcess>,
    project: &OpenCodeProject,
) -> Option<&'a AgentProcess> {
    cwd_to_process
        .iter()
        .find(|(cwd, _)| {
            if cwd.as_str() == project.worktree
                || cwd.starts_with(&format!("{}/", project.worktree))
            {
                return true;
            }
            // Sandboxes are per-branch worktrees of the same project.
            project
                .sandboxes
                .iter()
                .any(|sandbox| cwd.as_str() == sandbox || cwd.starts_with(&format!("{sandbox}/")))
        })
        .map(|(_, process)| *process)
}

fn latest_session_for_project(
    storage_path: &Path,
    project: &OpenCodeProject,
    process: &AgentProcess,
) -> Option<Session> {
    let session_dir = storage_path.join("session").join(&project.id);

    if !session_dir.exists() {
        return None;
    }

    let session = find_latest_session_in_dir(&session_dir, None)?;

    // Display the actual process cwd (it may be a sandbox/worktree path).
    let actual_path = process
        .cwd
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| project.worktree.clone());

    Some(build_session(storage_path, session, process, actual_path))
}

fn global_session_for_directory(
    storage_path: &Path,
    directory: &str,
    process: &AgentProcess,
) -> Option<Session> {
    let session_dir = storage_path.join("session").join("global");

    if !session_dir.exists() {
        return None;
    }

    let session = find_latest_session_in_dir(&session_dir, Some(directory))?;
    let project_path = session.directory.clone();

    Some(build_session(storage_path, session, process, project_path))
}

/// Build a Session from OpenCode session data and process info.
fn build_session(
    storage_path: &Path,
    session: OpenCodeSession,
    process: &AgentProcess,
    project_path: String,
) -> Session {
    let (last_role, last_message_text, message_created_ms) =
        get_last_message(storage_path, &session.id);

    let last_activity_at = timestamp_to_iso(session.time.updated);
    let message_age = (message_created_ms > 0)
        .then(|| timestamp_to_iso(message_created_ms))
        .as_deref()
        .and_then(rfc3339_age);
    let activity_age = rfc3339_age(&last_activity_at);

    let evidence = StatusEvidence {
        cpu_usage: process.cpu_usage,
        last_role: last_role.as_deref().and_then(Role::from_str),
        message_age: message_age.or(activity_age),
        activity_age,
        pending_task_age: None,
        interrupt_acknowledged: false,
        streaming: false,
    };
    let status = classify(&evidence, &StatusThresholds::opencode());

    let project_name = project_name_from_path(&project_path);

    info!(
        "OpenCode session: id={}, project={}, status={:?}, last_role={:?}, cpu={:.1}%",
        session.id, project_name, status, last_role, process.cpu_usage
    );

    // Fall back to the session title when no message text survived.
    let display_message =
        last_message_text.or_else(|| Some(session.title.clone()).filter(|t| !t.is_empty()));

    Session {
        id: session.id,
        agent_kind: AgentKind::OpenCode,
        project_name,
        project_path,
        git_branch: None,
        github_url: None,
        status,
        last_message: display_message,
        last_message_role: last_role,
        last_activity_at,
        pid: process.pid,
        cpu_usage: process.cpu_usage,
        memory_bytes: process.memory_bytes,
        active_subagent_count: 0,
        is_background: false,
        source_path: None,
    }
}

/// Convert a millisecond timestamp to an ISO string.
fn timestamp_to_iso(updated_ms: u64) -> String {
    let updated_secs = updated_ms / 1000;
    chrono::DateTime::from_timestamp(updated_secs as i64, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
