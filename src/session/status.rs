//! Status classification.
//!
//! One decision procedure shared by all three agent families; the families
//! differ only in which evidence their logs can produce and in a handful of
//! thresholds. The thresholds are empirically tuned, so they live here as
//! named constants rather than inline literals.

use std::time::Duration;

use crate::session::model::SessionStatus;

/// CPU usage above this is taken as "actively computing".
pub const CPU_PROCESSING_THRESHOLD_PCT: f32 = 15.0;
/// A log file written within this window means the agent is mid-stream.
pub const STREAMING_WINDOW: Duration = Duration::from_secs(3);
/// Messages older than this no longer justify the CPU override.
pub const MESSAGE_FRESHNESS_WINDOW: Duration = Duration::from_secs(30);
/// A pending-task signal older than this is treated as abandoned.
pub const PENDING_TASK_WINDOW: Duration = Duration::from_secs(3 * 60);
/// A user prompt younger than this means the agent should be responding.
pub const RECENT_USER_WINDOW: Duration = Duration::from_secs(60);
/// Waiting for 5+ minutes -> Idle
pub const IDLE_AFTER: Duration = Duration::from_secs(5 * 60);
/// Waiting for 10+ minutes -> Stale
pub const STALE_AFTER: Duration = Duration::from_secs(10 * 60);
/// Fallback files must not predate the process by more than this.
pub const PRESTART_SLACK: Duration = Duration::from_secs(5);

/// Role of the last observed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn from_str(role: &str) -> Option<Role> {
        match role {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Per-family tuning for the shared classifier.
#[derive(Debug, Clone, Copy)]
pub struct StatusThresholds {
    pub cpu_processing_pct: f32,
    /// When set, high CPU only counts if the last message is at most this
    /// old. Claude needs the gate (long-lived processes accumulate CPU from
    /// background work); Codex and OpenCode take CPU at face value.
    pub cpu_requires_fresh_message: Option<Duration>,
    /// When set, a user-role message at most this old means the agent is
    /// working on a reply. Claude keys off file writes instead, so it leaves
    /// this unset.
    pub recent_user_window: Option<Duration>,
    pub pending_task_window: Duration,
    pub idle_after: Duration,
    pub stale_after: Duration,
}

impl StatusThresholds {
    pub const fn claude() -> Self {
        StatusThresholds {
            cpu_processing_pct: CPU_PROCESSING_THRESHOLD_PCT,
            cpu_requires_fresh_message: Some(MESSAGE_FRESHNESS_WINDOW),
            recent_user_window: None,
            pending_task_window: PENDING_TASK_WINDOW,
            idle_after: IDLE_AFTER,
            stale_after: STALE_AFTER,
        }
    }

    pub const fn codex() -> Self {
        StatusThresholds {
            cpu_processing_pct: CPU_PROCESSING_THRESHOLD_PCT,
            cpu_requires_fresh_message: None,
            recent_user_window: Some(RECENT_USER_WINDOW),
            pending_task_window: PENDING_TASK_WINDOW,
            idle_after: IDLE_AFTER,
            stale_after: STALE_AFTER,
        }
    }

    pub const fn opencode() -> Self {
        // Same shape as Codex: role-driven logs without write-streaming.
        Self::codex()
    }
}

/// Everything a family's parser could establish about a session, normalized
/// for the classifier. Absent evidence stays `None`/`false` and the
/// classifier degrades accordingly.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusEvidence {
    pub cpu_usage: f32,
    pub last_role: Option<Role>,
    /// Age of the last observed message.
    pub message_age: Option<Duration>,
    /// Age of the last observed activity of any kind (message timestamp or
    /// file write). Drives idle/stale escalation.
    pub activity_age: Option<Duration>,
    /// Set iff the log shows a prompt/task-start signal with no later
    /// terminal event; carries the signal's age.
    pub pending_task_age: Option<Duration>,
    /// An interrupt marker was observed with a terminal event after it and
    /// no newer pending-task signal.
    pub interrupt_acknowledged: bool,
    /// The session file was written within [`STREAMING_WINDOW`].
    pub streaming: bool,
}

/// Map evidence to a status.
///
/// Order matters: an acknowledged interrupt beats every CPU heuristic, a
/// fresh pending task beats role guesses, and only a session that lands on
/// `Waiting` is eligible for age escalation.
pub fn classify(evidence: &StatusEvidence, thresholds: &StatusThresholds) -> SessionStatus {
    if evidence.interrupt_acknowledged && evidence.pending_task_age.is_none() {
        return escalate_waiting(evidence.activity_age, thresholds);
    }

    if let Some(age) = evidence.pending_task_age {
        if age <= thresholds.pending_task_window {
            return SessionStatus::Processing;
        }
    }

    if evidence.streaming {
        // Mid-write: an assistant record means output is being produced, a
        // user record (or none) means the turn is still being thought about.
        return match evidence.last_role {
            Some(Role::Assistant) => SessionStatus::Processing,
            _ => SessionStatus::Thinking,
        };
    }

    let message_at_most = |window: Duration| {
        evidence
            .message_age
            .map(|age| age <= window)
            .unwrap_or(false)
    };

    if evidence.cpu_usage > thresholds.cpu_processing_pct {
        let gate_open = thresholds
            .cpu_requires_fresh_message
            .map(|window| message_at_most(window))
            .unwrap_or(true);
        if gate_open {
            return SessionStatus::Processing;
        }
    }

    if evidence.last_role == Some(Role::User) {
        if let Some(window) = thresholds.recent_user_window {
            if message_at_most(window) {
                return SessionStatus::Processing;
            }
        }
    }

    escalate_waiting(evidence.activity_age, thresholds)
}

/// Time-based escalation for sessions that resolved to Waiting.
fn escalate_waiting(activity_age: Option<Duration>, thresholds: &StatusThresholds) -> SessionStatus {
    match activity_age {
        Some(age) if age >= thresholds.stale_after => SessionStatus::Stale,
        Some(age) if age >= thresholds.idle_after => SessionStatus::Idle,
        _ => SessionStatus::Waiting,
    }
}

/// Status for a fallback session, where CPU usage is the only evidence.
pub fn fallback_status(cpu_usage: f32) -> SessionStatus {
    if cpu_usage > CPU_PROCESSING_THRESHOLD_PCT {
        SessionStatus::Processing
    } else {
        SessionStatus::Stale
    }
}

/// Sort priority, most urgent first. Thinking and Processing are
/// deliberately equal: both mean "the agent is doing something right now".
pub fn status_sort_priority(status: &SessionStatus) -> u8 {
    match status {
        SessionStatus::Processing | SessionStatus::Thinking => 0,
        SessionStatus::Waiting => 1,
        SessionStatus::Idle => 2,
        SessionStatus::Stale => 3,
    }
}
