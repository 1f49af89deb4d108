//! agent-radar: reconstructs the live state of AI coding-agent sessions on
//! this machine by correlating OS processes with each agent's on-disk
//! session files.
//!
//! The entry point is [`Engine`]: wire it to a [`process::SysinfoProvider`]
//! and call [`Engine::poll`] on whatever interval the consumer refreshes
//! at. Every poll is recomputed from scratch and returns a
//! [`SessionsResponse`] with foreground and background sessions, sorted
//! most-urgent first.

pub mod agent;
pub mod engine;
pub mod error;
pub mod process;
pub mod session;

#[cfg(test)]
mod tests;

pub use engine::Engine;
pub use error::EngineError;
pub use process::{ProcessProvider, SysinfoProvider};
pub use session::{AgentKind, Session, SessionStatus, SessionsResponse};
