//! Process <-> session-file correlation.
//!
//! Neither side of the match is authoritative: processes don't carry session
//! identity and files don't carry liveness, so several processes of the same
//! agent can plausibly claim the same files (same working directory,
//! near-simultaneous starts). The assignment here is best-effort but stable:
//! same-directory matches first, newest file first, and a file is never
//! handed to two processes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, trace};

use crate::agent::AgentProcess;

/// A session file that could belong to one of the candidate processes.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub modified: SystemTime,
    /// Working directory recovered from the file's content, when the format
    /// records one.
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct CorrelationPolicy {
    /// Whether a process without a same-directory match may take the most
    /// recent unclaimed file regardless of directory.
    pub global_fallback: bool,
    /// Global-fallback files must be modified no earlier than
    /// (process start - this slack); older files predate the process and
    /// cannot be its transcript.
    pub prestart_slack: Duration,
}

/// One process with the file index it was assigned, if any.
#[derive(Debug)]
pub struct Assignment<'a> {
    pub process: &'a AgentProcess,
    pub file_index: Option<usize>,
}

/// Assign at most one file to each process, at most once per file.
///
/// Processes are visited in snapshot order. Each pops the newest unused
/// file from its working directory's queue; failing that (and when the
/// policy allows it) the newest unused file overall that does not predate
/// the process. Unmatched processes come back with `file_index: None` so the
/// caller can synthesize a fallback session.
pub fn correlate<'a>(
    processes: &[&'a AgentProcess],
    files: &[CandidateFile],
    policy: CorrelationPolicy,
) -> Vec<Assignment<'a>> {
    let mut recency_order: Vec<usize> = (0..files.len()).collect();
    recency_order.sort_by(|a, b| files[*b].modified.cmp(&files[*a].modified));

    let mut by_cwd: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for &index in &recency_order {
        if let Some(cwd) = files[index].cwd.as_deref() {
            by_cwd.entry(cwd).or_default().push_back(index);
        }
    }

    let mut used: HashSet<usize> = HashSet::new();
    let mut assignments = Vec::with_capacity(processes.len());

    for &process in processes {
        let mut chosen: Option<usize> = None;

        if let Some(cwd) = &process.cwd {
            let cwd = cwd.to_string_lossy();
            if let Some(queue) = by_cwd.get_mut(cwd.as_ref()) {
                while let Some(index) = queue.pop_front() {
                    if used.insert(index) {
                        chosen = Some(index);
                        break;
                    }
                }
            }
        }

        if chosen.is_none() && policy.global_fallback {
            // Scan rather than pop: a file rejected by this process's
            // pre-start cutoff may still belong to an older process later in
            // the snapshot.
            for &index in &recency_order {
                if used.contains(&index) {
                    continue;
                }
                if file_predates_process(&files[index], process, policy.prestart_slack) {
                    trace!(
                        "Skipping {:?} for pid={}: modified before process start",
                        files[index].path,
                        process.pid
                    );
                    continue;
                }
                used.insert(index);
                chosen = Some(index);
                break;
            }
        }

        match chosen {
            Some(index) => debug!(
                "Correlated pid={} -> {:?}",
                process.pid, files[index].path
            ),
            None => debug!("No session file for pid={}, will fall back", process.pid),
        }

        assignments.push(Assignment {
            process,
            file_index: chosen,
        });
    }

    assignments
}

fn file_predates_process(file: &CandidateFile, process: &AgentProcess, slack: Duration) -> bool {
    let Some(start_secs) = process.start_time_secs else {
        return false;
    };
    let started_at = UNIX_EPOCH + Duration::from_secs(start_secs);
    let cutoff = started_at.checked_sub(slack).unwrap_or(UNIX_EPOCH);
    file.modified < cutoff
}
