//! The injected OS capability the engine reads processes through.
//!
//! Production wiring supplies [`crate::process::SysinfoProvider`]; tests
//! supply a fixture-backed fake, which keeps the whole engine a function of
//! its inputs.

use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// Point-in-time view of one OS process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub pgid: Option<u32>,
    pub cpu_usage: f32,
    pub memory_bytes: u64,
    /// Command-line tokens; the first few identify the agent binary.
    pub cmd: Vec<String>,
    pub name: String,
    /// Seconds since the Unix epoch, when the OS reports it.
    pub start_time_secs: Option<u64>,
}

/// Filter for the newest-open-file lookup: which of a process's open file
/// descriptors counts as its session transcript.
#[derive(Debug, Clone, Copy)]
pub struct OpenFileQuery {
    /// Every one of these must appear somewhere in the path.
    pub path_contains: &'static [&'static str],
    pub suffix: &'static str,
    /// File names starting with this are skipped (sub-agent transcripts).
    pub exclude_file_prefix: Option<&'static str>,
}

/// Whether a path satisfies an [`OpenFileQuery`].
pub fn open_file_matches(path: &Path, query: &OpenFileQuery) -> bool {
    let path_str = path.to_string_lossy();
    if !path_str.ends_with(query.suffix) {
        return false;
    }
    if !query.path_contains.iter().all(|part| path_str.contains(part)) {
        return false;
    }
    if let Some(prefix) = query.exclude_file_prefix {
        let excluded = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(prefix))
            .unwrap_or(false);
        if excluded {
            return false;
        }
    }
    true
}

/// Process information source. Every lookup is best-effort: a failed cwd or
/// open-file query degrades to `None`, only a failed process enumeration is
/// an error.
pub trait ProcessProvider: Send + Sync {
    fn processes(&self) -> Result<Vec<ProcessInfo>, EngineError>;

    /// Current working directory of a live process.
    fn cwd(&self, pid: u32) -> Option<PathBuf>;

    /// The most recently modified open file of `pid` matching `query`.
    fn newest_open_file(&self, pid: u32, query: &OpenFileQuery) -> Option<PathBuf>;
}
