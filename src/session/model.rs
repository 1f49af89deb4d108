use serde::{Deserialize, Serialize};

use crate::agent::AgentProcess;
use crate::session::status::fallback_status;

/// Kind of AI coding agent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
    Codex,
    OpenCode,
}

impl AgentKind {
    /// Short identifier used in synthesized session ids and log lines.
    pub fn slug(&self) -> &'static str {
        match self {
            AgentKind::Claude => "claude",
            AgentKind::Codex => "codex",
            AgentKind::OpenCode => "opencode",
        }
    }
}

/// Status of an agent session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Processing,
    Thinking,
    Idle,  // Waiting for 5+ minutes
    Stale, // Waiting for 10+ minutes
}

/// One reconstructed agent session. Rebuilt from scratch on every poll,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub agent_kind: AgentKind,
    pub project_name: String,
    pub project_path: String,
    pub git_branch: Option<String>,
    /// Filled by the git-enrichment collaborator, never by this engine.
    pub github_url: Option<String>,
    pub status: SessionStatus,
    pub last_message: Option<String>,
    pub last_message_role: Option<String>,
    pub last_activity_at: String,
    pub pid: u32,
    pub cpu_usage: f32,
    pub memory_bytes: u64,
    pub active_subagent_count: usize,
    pub is_background: bool,
    /// Session/transcript file this session was reconstructed from, when one
    /// could be correlated.
    pub source_path: Option<String>,
}

impl Session {
    /// Synthesize a session from process metadata alone, for processes with
    /// no correlatable session file. Operators still see the running agent;
    /// the status comes from CPU usage only.
    pub fn fallback(kind: AgentKind, process: &AgentProcess) -> Session {
        let (project_name, project_path) = match &process.cwd {
            Some(cwd) => (
                cwd.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "Unknown".to_string()),
                cwd.to_string_lossy().to_string(),
            ),
            None => ("Unknown".to_string(), "/".to_string()),
        };

        Session {
            id: format!("{}-{}", kind.slug(), process.pid),
            agent_kind: kind,
            project_name,
            project_path,
            git_branch: None,
            github_url: None,
            status: fallback_status(process.cpu_usage),
            last_message: None,
            last_message_role: None,
            last_activity_at: chrono::Utc::now().to_rfc3339(),
            pid: process.pid,
            cpu_usage: process.cpu_usage,
            memory_bytes: process.memory_bytes,
            active_subagent_count: 0,
            is_background: false,
            source_path: None,
        }
    }
}

/// Response containing all sessions and counts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionsResponse {
    pub sessions: Vec<Session>,
    pub background_sessions: Vec<Session>,
    pub total_count: usize,
    pub waiting_count: usize,
}
