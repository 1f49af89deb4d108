//! Merging the per-family session lists into one response.

use std::collections::HashMap;

use log::info;

use crate::session::model::{AgentKind, Session, SessionStatus, SessionsResponse};
use crate::session::status::status_sort_priority;

/// Sessions with CPU below this and no message content are unattended
/// helpers, not something the user is talking to.
const NEAR_ZERO_CPU_PCT: f32 = 0.5;

/// Deduplicate, partition into foreground/background, sort and count.
pub fn aggregate_sessions(sessions: Vec<Session>) -> SessionsResponse {
    let original_count = sessions.len();
    let deduped = dedupe_sessions_by_pid(sessions);
    if deduped.len() != original_count {
        info!(
            "Deduplicated sessions by pid: {} -> {}",
            original_count,
            deduped.len()
        );
    }

    let mut foreground_sessions = Vec::new();
    let mut background_sessions = Vec::new();
    for mut session in deduped {
        session.is_background = is_background_session(&session);
        if session.is_background {
            background_sessions.push(session);
        } else {
            foreground_sessions.push(session);
        }
    }

    // Foreground: most urgent status first, then most recent activity.
    foreground_sessions.sort_by(|a, b| {
        let priority_a = status_sort_priority(&a.status);
        let priority_b = status_sort_priority(&b.status);
        if priority_a != priority_b {
            priority_a.cmp(&priority_b)
        } else {
            b.last_activity_at.cmp(&a.last_activity_at)
        }
    });

    // Background: fixed family order, then most recent activity.
    background_sessions.sort_by(|a, b| {
        let key_a = agent_sort_key(&a.agent_kind);
        let key_b = agent_sort_key(&b.agent_kind);
        if key_a != key_b {
            key_a.cmp(&key_b)
        } else {
            b.last_activity_at.cmp(&a.last_activity_at)
        }
    });

    let waiting_count = foreground_sessions
        .iter()
        .filter(|s| matches!(s.status, SessionStatus::Waiting))
        .count();
    let total_count = foreground_sessions.len();

    SessionsResponse {
        sessions: foreground_sessions,
        background_sessions,
        total_count,
        waiting_count,
    }
}

/// An unattended helper: no discernible message activity, and either the
/// project could not be resolved or the process is doing essentially
/// nothing.
fn is_background_session(session: &Session) -> bool {
    let has_message = session
        .last_message
        .as_ref()
        .map(|msg| !msg.trim().is_empty())
        .unwrap_or(false);
    if has_message {
        return false;
    }
    session.project_path == "/"
        || session.project_name == "Unknown"
        || session.cpu_usage < NEAR_ZERO_CPU_PCT
}

fn agent_sort_key(kind: &AgentKind) -> u8 {
    match kind {
        AgentKind::Claude => 0,
        AgentKind::Codex => 1,
        AgentKind::OpenCode => 2,
    }
}

/// Multiple records can resolve to the same pid when a process matches files
/// in more than one storage root. Keep the best one.
fn dedupe_sessions_by_pid(sessions: Vec<Session>) -> Vec<Session> {
    let mut best_by_pid: HashMap<u32, Session> = HashMap::new();

    for session in sessions {
        match best_by_pid.get_mut(&session.pid) {
            None => {
                best_by_pid.insert(session.pid, session);
            }
            Some(existing) => {
                if is_better_session(&session, existing) {
                    *existing = session;
                }
            }
        }
    }

    best_by_pid.into_values().collect()
}

fn is_better_session(candidate: &Session, current: &Session) -> bool {
    let candidate_priority = status_sort_priority(&candidate.status);
    let current_priority = status_sort_priority(&current.status);
    if candidate_priority != current_priority {
        return candidate_priority < current_priority;
    }

    if candidate.last_activity_at != current.last_activity_at {
        return candidate.last_activity_at > current.last_activity_at;
    }

    match (
        candidate.last_message.is_some(),
        current.last_message.is_some(),
    ) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.id > current.id,
    }
}
