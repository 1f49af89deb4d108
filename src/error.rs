//! Engine-level errors.
//!
//! Almost nothing in the engine is fatal: unreadable files, malformed log
//! lines and failed OS lookups degrade the affected field and the poll
//! continues. The one exception is failing to enumerate the process list,
//! without which no session can be attributed to anything.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to enumerate system processes: {0}")]
    ProcessSnapshot(String),
}
