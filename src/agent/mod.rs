//! Per-family agent detectors.

pub mod claude;
pub mod codex;
pub mod opencode;

use std::path::PathBuf;

use crate::process::{find_agent_processes, AgentCommandFilter, ProcessInfo, ProcessProvider};
use crate::session::{AgentKind, Session};

/// Common process info shared across agent types
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProcess {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub pgid: Option<u32>,
    pub cpu_usage: f32,
    pub memory_bytes: u64,
    pub cwd: Option<PathBuf>,
    pub start_time_secs: Option<u64>,
    /// Session file resolved from the process's open descriptors.
    pub attached_session_file: Option<PathBuf>,
    /// Storage root inferred from the attached file.
    pub data_home: Option<PathBuf>,
}

/// Trait for detecting and parsing agent sessions
pub trait AgentDetector: Send + Sync {
    /// Human-readable name of the agent
    fn name(&self) -> &'static str;

    /// The agent kind for tagging sessions
    fn kind(&self) -> AgentKind;

    /// How this family's processes look in a snapshot.
    fn command_filter(&self) -> &'static AgentCommandFilter;

    /// Find running processes for this agent.
    fn find_processes(
        &self,
        snapshot: &[ProcessInfo],
        provider: &dyn ProcessProvider,
    ) -> Vec<AgentProcess> {
        find_agent_processes(snapshot, provider, self.command_filter())
    }

    /// Parse sessions from data files, matched to running processes
    fn find_sessions(&self, processes: &[AgentProcess]) -> Vec<Session>;
}

/// The three supported families, in their fixed display order.
pub fn default_detectors() -> Vec<Box<dyn AgentDetector>> {
    vec![
        Box::new(claude::ClaudeDetector),
        Box::new(codex::CodexDetector),
        Box::new(opencode::OpenCodeDetector),
    ]
}
