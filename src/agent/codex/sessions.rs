//! Codex session assembly.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};

use crate::agent::AgentProcess;
use crate::session::util::{project_name_from_path, rfc3339_age, system_time_to_rfc3339};
use crate::session::{
    classify, correlate, AgentKind, CandidateFile, CorrelationPolicy, Role, Session,
    StatusEvidence, StatusThresholds, PRESTART_SLACK,
};

use super::parser::{parse_codex_session_file, CodexSessionRecord};
use super::walk::{collect_session_logs, parse_limit};

/// All session roots worth walking: the default location plus data homes
/// observed through open session files.
pub fn codex_session_roots(processes: &[AgentProcess]) -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".codex").join("sessions"));
    }
    for process in processes {
        if let Some(data_home) = &process.data_home {
            roots.push(data_home.clone());
        }
    }

    let mut seen = HashSet::new();
    roots.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

/// Build sessions for all Codex processes against the given session roots.
pub fn codex_sessions_in_roots(processes: &[AgentProcess], roots: &[PathBuf]) -> Vec<Session> {
    let mut sessions = Vec::new();
    let mut remaining: Vec<&AgentProcess> = Vec::new();

    for process in processes {
        let attached = process
            .attached_session_file
            .as_ref()
            .and_then(|path| record_for_attached_file(path));
        match attached {
            Some(record) => {
                debug!(
                    "Codex session matched via open file: pid={}, file={:?}",
                    process.pid, record.path
                );
                sessions.push(build_codex_session(&record, process));
            }
            None => remaining.push(process),
        }
    }

    let limit = parse_limit(remaining.len());
    let records: Vec<CodexSessionRecord> = collect_session_logs(roots, limit)
        .into_iter()
        .filter_map(|(path, modified)| parse_codex_session_file(&path, modified))
        .collect();
    debug!(
        "Codex correlation: {} processes, {} parsed session files (limit {})",
        remaining.len(),
        records.len(),
        limit
    );

    let candidates: Vec<CandidateFile> = records
        .iter()
        .map(|record| CandidateFile {
            path: record.path.clone(),
            modified: record.modified,
            cwd: record.cwd.clone(),
        })
        .collect();

    let assignments = correlate(
        &remaining,
        &candidates,
        CorrelationPolicy {
            // Session files carry their cwd, so a recency fallback is safe
            // as long as the file does not predate the process.
            global_fallback: true,
            prestart_slack: PRESTART_SLACK,
        },
    );

    for assignment in assignments {
        match assignment.file_index {
            Some(index) => sessions.push(build_codex_session(&records[index], assignment.process)),
            None => sessions.push(Session::fallback(AgentKind::Codex, assignment.process)),
        }
    }

    sessions
}

fn record_for_attached_file(path: &Path) -> Option<CodexSessionRecord> {
    let modified = path.metadata().and_then(|m| m.modified()).ok()?;
    parse_codex_session_file(path, modified)
}

fn build_codex_session(record: &CodexSessionRecord, process: &AgentProcess) -> Session {
    let project_path = record
        .cwd
        .clone()
        .or_else(|| process.cwd.as_ref().map(|p| p.to_string_lossy().to_string()))
        .unwrap_or_else(|| "/".to_string());
    let project_name = project_name_from_path(&project_path);

    let now = Utc::now();
    let message_age = record.last_activity_at.as_deref().and_then(rfc3339_age);
    let file_age = std::time::SystemTime::now()
        .duration_since(record.modified)
        .ok();

    let pending_task_age = if record.has_pending_task() {
        record.pending_signal_age(now)
    } else {
        None
    };

    let evidence = StatusEvidence {
        cpu_usage: process.cpu_usage,
        last_role: record.last_role.as_deref().and_then(Role::from_str),
        message_age,
        activity_age: message_age.or(file_age),
        pending_task_age,
        interrupt_acknowledged: record.interrupt_acknowledged(),
        streaming: false,
    };
    let status = classify(&evidence, &StatusThresholds::codex());

    let last_activity_at = record
        .last_activity_at
        .clone()
        .unwrap_or_else(|| system_time_to_rfc3339(record.modified));

    let session_id = record
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .or_else(|| record.session_id.clone())
        .unwrap_or_else(|| format!("codex-{}", process.pid));

    info!(
        "Codex session: id={}, project={}, status={:?}, last_role={:?}",
        session_id, project_name, status, record.last_role
    );

    Session {
        id: session_id,
        agent_kind: AgentKind::Codex,
        project_name,
        project_path,
        git_branch: None,
        github_url: None,
        status,
        last_message: record.last_message.clone(),
        last_message_role: record.last_role.clone(),
        last_activity_at,
        pid: process.pid,
        cpu_usage: process.cpu_usage,
        memory_bytes: process.memory_bytes,
        active_subagent_count: 0,
        is_background: false,
        source_path: Some(record.path.to_string_lossy().to_string()),
    }
}
