// Tests for Claude transcript parsing and session assembly
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_json::json;

use crate::agent::claude::{
    claude_sessions_in_roots, count_active_subagents, has_tool_result, has_tool_use,
    is_interrupted_request, is_local_slash_command, is_subagent_file, parse_claude_log,
};
use crate::session::SessionStatus;
use crate::tests::test_helpers::{
    create_test_jsonl, create_test_jsonl_old, recent_timestamp, set_mtime_ago, stale_timestamp,
    test_process, timestamp_secs_ago, TEST_PID,
};

fn user_line(session_id: &str, text: &str, timestamp: &str) -> String {
    json!({
        "sessionId": session_id,
        "timestamp": timestamp,
        "type": "user",
        "message": {"role": "user", "content": text}
    })
    .to_string()
}

fn assistant_line(session_id: &str, text: &str, timestamp: &str) -> String {
    json!({
        "sessionId": session_id,
        "timestamp": timestamp,
        "type": "assistant",
        "message": {"role": "assistant", "content": [{"type": "text", "text": text}]}
    })
    .to_string()
}

fn assistant_tool_use_line(session_id: &str, timestamp: &str) -> String {
    json!({
        "sessionId": session_id,
        "timestamp": timestamp,
        "type": "assistant",
        "message": {"role": "assistant", "content": [
            {"type": "text", "text": "Let me check"},
            {"type": "tool_use", "id": "t1", "name": "Bash", "input": {"command": "ls"}}
        ]}
    })
    .to_string()
}

#[test]
fn test_parse_extracts_identity_and_message() {
    let ts = recent_timestamp();
    let lines = [
        user_line("sess-1", "fix the bug", &ts),
        assistant_line("sess-1", "Done, the bug is fixed", &ts),
    ];
    let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
    let file = create_test_jsonl_old(&refs);

    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();

    assert_eq!(session.id, "sess-1");
    assert_eq!(session.project_name, "proj");
    assert_eq!(session.last_message.as_deref(), Some("Done, the bug is fixed"));
    assert_eq!(session.last_message_role.as_deref(), Some("assistant"));
    assert_eq!(session.pid, TEST_PID);
}

#[test]
fn test_parse_requires_session_id() {
    let line = json!({"timestamp": recent_timestamp(), "message": {"role": "user", "content": "hi"}})
        .to_string();
    let file = create_test_jsonl_old(&[&line]);
    assert!(parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).is_none());
}

#[test]
fn test_malformed_lines_are_skipped() {
    let ts = recent_timestamp();
    let good = assistant_line("sess-1", "Done", &ts);
    let file = create_test_jsonl_old(&["{not json", "", &good, "42"]);

    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.id, "sess-1");
    assert_eq!(session.last_message.as_deref(), Some("Done"));
}

#[test]
fn test_local_command_not_surfaced_as_last_message() {
    let ts = recent_timestamp();
    let lines = [
        user_line("sess-1", "fix the bug", &timestamp_secs_ago(120)),
        assistant_line("sess-1", "Done", &timestamp_secs_ago(60)),
        user_line("sess-1", "/clear", &ts),
    ];
    let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
    let file = create_test_jsonl_old(&refs);

    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();

    // The slash command is invisible; the previous genuine message shows.
    assert_eq!(session.last_message.as_deref(), Some("Done"));
    // And a local command never counts as a prompt awaiting an answer.
    assert_eq!(session.status, SessionStatus::Waiting);
}

#[test]
fn test_local_command_only_yields_no_message() {
    let line = user_line("sess-1", "/clear", &recent_timestamp());
    let file = create_test_jsonl_old(&[&line]);

    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.last_message, None);
    assert_eq!(session.status, SessionStatus::Waiting);
}

#[test]
fn test_interrupted_request_is_waiting() {
    let line = user_line("sess-1", "[Request interrupted by user]", &recent_timestamp());
    let file = create_test_jsonl_old(&[&line]);

    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.status, SessionStatus::Waiting);
    assert_eq!(session.last_message, None);
}

#[test]
fn test_unanswered_prompt_is_processing_regardless_of_file_age() {
    let line = user_line("sess-1", "add a new endpoint", &recent_timestamp());
    let file = create_test_jsonl(&[&line]);
    // The file itself can be arbitrarily old; the prompt's own timestamp is
    // what proves a task is pending.
    set_mtime_ago(file.path(), Duration::from_secs(20 * 60));

    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.status, SessionStatus::Processing);
}

#[test]
fn test_tool_use_turn_is_processing_while_fresh() {
    let line = assistant_tool_use_line("sess-1", &recent_timestamp());
    let file = create_test_jsonl_old(&[&line]);

    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.status, SessionStatus::Processing);
}

#[test]
fn test_stalled_tool_turn_escalates() {
    let line = assistant_tool_use_line("sess-1", &timestamp_secs_ago(6 * 60));
    let file = create_test_jsonl_old(&[&line]);

    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.status, SessionStatus::Idle);
}

#[test]
fn test_assistant_reply_is_waiting_then_ages() {
    let line = assistant_line("sess-1", "Done", &recent_timestamp());
    let file = create_test_jsonl_old(&[&line]);
    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.status, SessionStatus::Waiting);

    let line = assistant_line("sess-1", "Done", &timestamp_secs_ago(6 * 60));
    let file = create_test_jsonl_old(&[&line]);
    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.status, SessionStatus::Idle);

    let line = assistant_line("sess-1", "Done", &stale_timestamp());
    let file = create_test_jsonl_old(&[&line]);
    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.status, SessionStatus::Stale);
}

#[test]
fn test_streaming_file_means_active() {
    // Freshly written file, assistant text -> output is being produced.
    let line = assistant_line("sess-1", "Working on it", &recent_timestamp());
    let file = create_test_jsonl(&[&line]);
    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.status, SessionStatus::Processing);
}

#[test]
fn test_message_preview_is_truncated() {
    let long_text = "x".repeat(6000);
    let line = assistant_line("sess-1", &long_text, &recent_timestamp());
    let file = create_test_jsonl_old(&[&line]);

    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    let preview = session.last_message.unwrap();
    assert!(preview.ends_with("..."));
    assert_eq!(preview.chars().count(), 5003);
}

#[test]
fn test_boilerplate_texts_are_skipped() {
    let ts = recent_timestamp();
    let lines = [
        assistant_line("sess-1", "Here is the summary", &timestamp_secs_ago(30)),
        user_line("sess-1", "Caveat: the messages below were generated", &ts),
        user_line("sess-1", "<system-reminder>context compacted</system-reminder>", &ts),
    ];
    let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
    let file = create_test_jsonl_old(&refs);

    let session =
        parse_claude_log(file.path(), "/tmp/proj", &test_process(TEST_PID, 0.0, None)).unwrap();
    assert_eq!(session.last_message.as_deref(), Some("Here is the summary"));
}

#[test]
fn test_has_tool_use() {
    let content_with_tool_use = json!([
        {"type": "text", "text": "Let me run that command"},
        {"type": "tool_use", "id": "123", "name": "Bash", "input": {"command": "ls"}}
    ]);
    assert!(has_tool_use(&content_with_tool_use));

    let content_without_tool_use = json!([{"type": "text", "text": "Here is the result"}]);
    assert!(!has_tool_use(&content_without_tool_use));

    assert!(!has_tool_use(&json!([])));
    assert!(!has_tool_use(&json!("Just a string")));

    let content_with_tool_result =
        json!([{"type": "tool_result", "tool_use_id": "123", "content": "output"}]);
    assert!(!has_tool_use(&content_with_tool_result));
}

#[test]
fn test_has_tool_result() {
    let content_with_tool_result =
        json!([{"type": "tool_result", "tool_use_id": "123", "content": "command output"}]);
    assert!(has_tool_result(&content_with_tool_result));

    let content_without_tool_result = json!([{"type": "text", "text": "Just text"}]);
    assert!(!has_tool_result(&content_without_tool_result));

    assert!(!has_tool_result(&json!([])));
    assert!(!has_tool_result(&json!("Just a string")));

    let content_with_tool_use = json!([{"type": "tool_use", "id": "123", "name": "Read"}]);
    assert!(!has_tool_result(&content_with_tool_use));
}

#[test]
fn test_is_local_slash_command() {
    // Recognized local commands
    for command in [
        "/clear",
        "/compact",
        "/config",
        "/cost",
        "/doctor",
        "/help",
        "/init",
        "/login",
        "/logout",
        "/memory",
        "/model",
        "/permissions",
        "/pr-comments",
        "/review",
        "/status",
        "/terminal-setup",
        "/vim",
    ] {
        assert!(is_local_slash_command(&json!(command)), "{command}");
    }

    // Commands with arguments and whitespace
    assert!(is_local_slash_command(&json!("/model sonnet")));
    assert!(is_local_slash_command(&json!("/memory add something")));
    assert!(is_local_slash_command(&json!("  /clear  ")));

    // Non-local commands (these trigger the agent)
    assert!(!is_local_slash_command(&json!("Hello Claude")));
    assert!(!is_local_slash_command(&json!("/custom-command")));
    assert!(!is_local_slash_command(&json!("/fix the bug")));

    // Array content with text block
    assert!(is_local_slash_command(&json!([{"type": "text", "text": "/clear"}])));
    assert!(!is_local_slash_command(&json!([{"type": "text", "text": "fix the bug"}])));

    // Edge cases
    assert!(!is_local_slash_command(&json!("")));
    assert!(!is_local_slash_command(&json!(null)));
    assert!(!is_local_slash_command(&json!(123)));
}

#[test]
fn test_is_interrupted_request() {
    assert!(is_interrupted_request(&json!("[Request interrupted by user]")));
    assert!(is_interrupted_request(&json!(
        "Some text [Request interrupted by user] more text"
    )));
    assert!(is_interrupted_request(&json!([
        {"type": "text", "text": "[Request interrupted by user]"}
    ])));

    assert!(!is_interrupted_request(&json!("Hello Claude")));
    assert!(!is_interrupted_request(&json!("Fix the bug")));
    assert!(!is_interrupted_request(&json!("")));
}

fn write_jsonl(dir: &Path, name: &str, lines: &[String]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

#[test]
fn test_subagent_files() {
    assert!(is_subagent_file(Path::new("/p/agent-123.jsonl")));
    assert!(!is_subagent_file(Path::new("/p/session-123.jsonl")));
    assert!(!is_subagent_file(Path::new("/p/agent-123.json")));

    let dir = tempfile::tempdir().unwrap();
    let line = user_line("parent-1", "spawn work", &recent_timestamp());
    write_jsonl(dir.path(), "agent-aaa.jsonl", &[line.clone()]);
    let other = user_line("parent-2", "other work", &recent_timestamp());
    write_jsonl(dir.path(), "agent-bbb.jsonl", &[other]);
    let old = write_jsonl(dir.path(), "agent-ccc.jsonl", &[line]);
    set_mtime_ago(&old, Duration::from_secs(120));

    // One fresh file tagged parent-1; the other is a different parent and
    // the third is too old.
    assert_eq!(count_active_subagents(dir.path(), "parent-1"), 1);
    assert_eq!(count_active_subagents(dir.path(), "parent-2"), 1);
    assert_eq!(count_active_subagents(dir.path(), "parent-3"), 0);
}

#[test]
fn test_two_processes_same_directory_get_distinct_files() {
    let root = tempfile::tempdir().unwrap();
    let project_dir = root.path().join("-work-alpha");
    fs::create_dir(&project_dir).unwrap();

    let newer = write_jsonl(
        &project_dir,
        "s-newer.jsonl",
        &[assistant_line("sess-new", "newer reply", &recent_timestamp())],
    );
    set_mtime_ago(&newer, Duration::from_secs(5));
    let older = write_jsonl(
        &project_dir,
        "s-older.jsonl",
        &[assistant_line("sess-old", "older reply", &recent_timestamp())],
    );
    set_mtime_ago(&older, Duration::from_secs(60));

    let processes = vec![
        test_process(1, 0.0, Some("/work/alpha")),
        test_process(2, 0.0, Some("/work/alpha")),
        test_process(3, 0.0, Some("/work/beta")),
    ];

    let sessions = claude_sessions_in_roots(&processes, &[root.path().to_path_buf()]);

    assert_eq!(sessions.len(), 3);
    let by_pid = |pid: u32| sessions.iter().find(|s| s.pid == pid).unwrap();

    // Newest file goes to the first process in snapshot order, the second
    // file to the second process; the unrelated process gets a fallback.
    assert_eq!(by_pid(1).id, "sess-new");
    assert_eq!(by_pid(2).id, "sess-old");
    assert_eq!(by_pid(3).id, "claude-3");
    assert_eq!(by_pid(3).last_message, None);
}
