//! The poll engine: one call reconstructs every live agent session from the
//! current OS and filesystem state.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;

use log::{error, info, warn};

use crate::agent::{default_detectors, AgentDetector};
use crate::error::EngineError;
use crate::process::ProcessProvider;
use crate::session::{aggregate_sessions, Session, SessionStatus, SessionsResponse};

/// Session detection and status-reconstruction engine.
///
/// Each [`Engine::poll`] recomputes the full result; there is no cross-call
/// state beyond a previous-status map used to log transitions. The three
/// family scans touch disjoint storage roots and run on their own threads.
pub struct Engine<P: ProcessProvider> {
    provider: P,
    detectors: Vec<Box<dyn AgentDetector>>,
    previous_status: Mutex<HashMap<String, SessionStatus>>,
}

impl<P: ProcessProvider> Engine<P> {
    /// Engine over the three built-in agent families.
    pub fn new(provider: P) -> Self {
        Self::with_detectors(provider, default_detectors())
    }

    /// Engine over a custom detector set (used by tests).
    pub fn with_detectors(provider: P, detectors: Vec<Box<dyn AgentDetector>>) -> Self {
        Engine {
            provider,
            detectors,
            previous_status: Mutex::new(HashMap::new()),
        }
    }

    /// Run one poll cycle.
    ///
    /// Only a failed process enumeration is an error; everything else
    /// degrades per session or per field.
    pub fn poll(&self) -> Result<SessionsResponse, EngineError> {
        let snapshot = self.provider.processes()?;

        let mut all_sessions: Vec<Session> = Vec::new();
        thread::scope(|scope| {
            let handles: Vec<_> = self
                .detectors
                .iter()
                .map(|detector| {
                    let snapshot = &snapshot;
                    let provider: &dyn ProcessProvider = &self.provider;
                    scope.spawn(move || {
                        let processes = detector.find_processes(snapshot, provider);
                        let sessions = detector.find_sessions(&processes);
                        info!(
                            "{}: found {} processes, {} sessions",
                            detector.name(),
                            processes.len(),
                            sessions.len()
                        );
                        sessions
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(sessions) => all_sessions.extend(sessions),
                    Err(_) => error!("agent detector thread panicked, skipping its sessions"),
                }
            }
        });

        self.log_status_transitions(&all_sessions);

        Ok(aggregate_sessions(all_sessions))
    }

    /// Status transitions are the most useful debugging signal for the
    /// classifier; everything else about a poll is stateless.
    fn log_status_transitions(&self, sessions: &[Session]) {
        let mut previous = self
            .previous_status
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        for session in sessions {
            if let Some(prev) = previous.get(&session.id) {
                if *prev != session.status {
                    warn!(
                        "STATUS TRANSITION: project={}, {:?} -> {:?}, cpu={:.1}%, last_msg_role={:?}",
                        session.project_name,
                        prev,
                        session.status,
                        session.cpu_usage,
                        session.last_message_role
                    );
                }
            }
            previous.insert(session.id.clone(), session.status);
        }
    }
}
