//! Session model, status classification, correlation and aggregation.
//!
//! Everything here is family-agnostic: the per-family detectors under
//! [`crate::agent`] produce evidence and candidate files, and this module
//! turns them into the final [`SessionsResponse`].

mod aggregate;
mod correlate;
mod model;
mod status;
pub(crate) mod util;

pub use aggregate::aggregate_sessions;
pub use correlate::{correlate, Assignment, CandidateFile, CorrelationPolicy};
pub use model::{AgentKind, Session, SessionStatus, SessionsResponse};
pub use status::{
    classify, fallback_status, status_sort_priority, Role, StatusEvidence, StatusThresholds,
    CPU_PROCESSING_THRESHOLD_PCT, IDLE_AFTER, MESSAGE_FRESHNESS_WINDOW, PENDING_TASK_WINDOW,
    PRESTART_SLACK, RECENT_USER_WINDOW, STALE_AFTER, STREAMING_WINDOW,
};
