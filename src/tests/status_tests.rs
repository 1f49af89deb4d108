// Tests for the shared status classifier
use std::time::Duration;

use crate::session::{
    classify, fallback_status, status_sort_priority, Role, SessionStatus, StatusEvidence,
    StatusThresholds,
};

fn base_evidence() -> StatusEvidence {
    StatusEvidence {
        activity_age: Some(Duration::from_secs(10)),
        ..Default::default()
    }
}

#[test]
fn test_interrupt_overrides_cpu() {
    let evidence = StatusEvidence {
        cpu_usage: 60.0,
        interrupt_acknowledged: true,
        ..base_evidence()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::codex()),
        SessionStatus::Waiting
    );
}

#[test]
fn test_interrupted_session_still_ages() {
    let evidence = StatusEvidence {
        interrupt_acknowledged: true,
        activity_age: Some(Duration::from_secs(11 * 60)),
        ..StatusEvidence::default()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::codex()),
        SessionStatus::Stale
    );
}

#[test]
fn test_newer_pending_task_beats_interrupt() {
    // The user interrupted, then sent a new prompt.
    let evidence = StatusEvidence {
        interrupt_acknowledged: true,
        pending_task_age: Some(Duration::from_secs(5)),
        ..base_evidence()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::codex()),
        SessionStatus::Processing
    );
}

#[test]
fn test_fresh_pending_task_is_processing() {
    let evidence = StatusEvidence {
        pending_task_age: Some(Duration::from_secs(30)),
        ..base_evidence()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::claude()),
        SessionStatus::Processing
    );
}

#[test]
fn test_abandoned_pending_task_falls_through() {
    // A pending signal older than the window no longer proves activity.
    let evidence = StatusEvidence {
        pending_task_age: Some(Duration::from_secs(4 * 60)),
        activity_age: Some(Duration::from_secs(4 * 60)),
        ..StatusEvidence::default()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::claude()),
        SessionStatus::Waiting
    );
}

#[test]
fn test_streaming_assistant_is_processing() {
    let evidence = StatusEvidence {
        streaming: true,
        last_role: Some(Role::Assistant),
        ..base_evidence()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::claude()),
        SessionStatus::Processing
    );
}

#[test]
fn test_streaming_without_assistant_is_thinking() {
    let evidence = StatusEvidence {
        streaming: true,
        ..base_evidence()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::claude()),
        SessionStatus::Thinking
    );

    let evidence = StatusEvidence {
        streaming: true,
        last_role: Some(Role::User),
        ..base_evidence()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::claude()),
        SessionStatus::Thinking
    );
}

#[test]
fn test_cpu_override_requires_fresh_message_for_claude() {
    // High CPU with a fresh message -> Processing
    let evidence = StatusEvidence {
        cpu_usage: 20.0,
        message_age: Some(Duration::from_secs(10)),
        ..base_evidence()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::claude()),
        SessionStatus::Processing
    );

    // High CPU but the message is old -> background churn, not a turn
    let evidence = StatusEvidence {
        cpu_usage: 20.0,
        message_age: Some(Duration::from_secs(2 * 60)),
        ..base_evidence()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::claude()),
        SessionStatus::Waiting
    );
}

#[test]
fn test_cpu_override_unconditional_for_codex() {
    let evidence = StatusEvidence {
        cpu_usage: 20.0,
        message_age: Some(Duration::from_secs(10 * 60)),
        activity_age: Some(Duration::from_secs(10 * 60)),
        ..StatusEvidence::default()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::codex()),
        SessionStatus::Processing
    );
}

#[test]
fn test_recent_user_message_is_processing() {
    let evidence = StatusEvidence {
        last_role: Some(Role::User),
        message_age: Some(Duration::from_secs(30)),
        ..base_evidence()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::codex()),
        SessionStatus::Processing
    );

    // An old user message means nobody answered and nothing is running.
    let evidence = StatusEvidence {
        last_role: Some(Role::User),
        message_age: Some(Duration::from_secs(2 * 60)),
        activity_age: Some(Duration::from_secs(2 * 60)),
        ..StatusEvidence::default()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::codex()),
        SessionStatus::Waiting
    );
}

#[test]
fn test_assistant_message_is_waiting() {
    let evidence = StatusEvidence {
        last_role: Some(Role::Assistant),
        message_age: Some(Duration::from_secs(30)),
        ..base_evidence()
    };
    assert_eq!(
        classify(&evidence, &StatusThresholds::opencode()),
        SessionStatus::Waiting
    );
}

#[test]
fn test_waiting_escalates_with_age() {
    let waiting = StatusEvidence {
        last_role: Some(Role::Assistant),
        ..StatusEvidence::default()
    };

    let idle = StatusEvidence {
        activity_age: Some(Duration::from_secs(6 * 60)),
        ..waiting
    };
    assert_eq!(
        classify(&idle, &StatusThresholds::codex()),
        SessionStatus::Idle
    );

    let stale = StatusEvidence {
        activity_age: Some(Duration::from_secs(11 * 60)),
        ..waiting
    };
    assert_eq!(
        classify(&stale, &StatusThresholds::codex()),
        SessionStatus::Stale
    );

    // Unknown activity age never escalates.
    let unknown = StatusEvidence {
        activity_age: None,
        ..waiting
    };
    assert_eq!(
        classify(&unknown, &StatusThresholds::codex()),
        SessionStatus::Waiting
    );
}

#[test]
fn test_fallback_status_from_cpu_alone() {
    assert_eq!(fallback_status(20.0), SessionStatus::Processing);
    assert_eq!(fallback_status(3.0), SessionStatus::Stale);
}

#[test]
fn test_status_sort_priority() {
    // Thinking and Processing have highest priority (0)
    assert_eq!(status_sort_priority(&SessionStatus::Thinking), 0);
    assert_eq!(status_sort_priority(&SessionStatus::Processing), 0);

    // Waiting has second priority (1)
    assert_eq!(status_sort_priority(&SessionStatus::Waiting), 1);

    // Idle has third priority (2)
    assert_eq!(status_sort_priority(&SessionStatus::Idle), 2);

    // Stale has lowest priority (3)
    assert_eq!(status_sort_priority(&SessionStatus::Stale), 3);

    // Verify ordering: Thinking/Processing < Waiting < Idle < Stale
    assert!(
        status_sort_priority(&SessionStatus::Thinking)
            < status_sort_priority(&SessionStatus::Waiting)
    );
    assert!(
        status_sort_priority(&SessionStatus::Waiting) < status_sort_priority(&SessionStatus::Idle)
    );
    assert!(
        status_sort_priority(&SessionStatus::Idle) < status_sort_priority(&SessionStatus::Stale)
    );
}

#[test]
fn test_session_status_serialization() {
    // Verify status serializes to lowercase
    for (status, expected) in [
        (SessionStatus::Waiting, "\"waiting\""),
        (SessionStatus::Thinking, "\"thinking\""),
        (SessionStatus::Processing, "\"processing\""),
        (SessionStatus::Idle, "\"idle\""),
        (SessionStatus::Stale, "\"stale\""),
    ] {
        assert_eq!(serde_json::to_string(&status).unwrap(), expected);
    }
}
