//! Production [`ProcessProvider`] backed by `sysinfo` and `lsof`.
//!
//! One `System` instance serves all three agent families; separate instances
//! would triple the memory cost of the process table for no benefit.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System, UpdateKind};

use crate::error::EngineError;
use crate::process::provider::{open_file_matches, OpenFileQuery, ProcessInfo, ProcessProvider};

/// Avoid back-to-back full process refreshes when multiple detectors run in
/// the same polling cycle.
const MIN_PROCESS_REFRESH_INTERVAL: Duration = Duration::from_millis(750);

pub struct SysinfoProvider {
    system: Mutex<System>,
    last_refresh_at: Mutex<Option<Instant>>,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        log::debug!("Initializing shared System instance for process monitoring");
        let system = System::new_with_specifics(
            RefreshKind::new().with_processes(process_refresh_kind()),
        );
        SysinfoProvider {
            system: Mutex::new(system),
            last_refresh_at: Mutex::new(None),
        }
    }

    fn refresh_locked(&self, system: &mut System) {
        let should_refresh = {
            let mut last_refresh = self
                .last_refresh_at
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            match *last_refresh {
                Some(previous) if previous.elapsed() < MIN_PROCESS_REFRESH_INTERVAL => false,
                _ => {
                    *last_refresh = Some(Instant::now());
                    true
                }
            }
        };

        if !should_refresh {
            log::trace!(
                "Skipping process refresh (last refresh < {:?})",
                MIN_PROCESS_REFRESH_INTERVAL
            );
            return;
        }

        system.refresh_processes_specifics(ProcessesToUpdate::All, process_refresh_kind());
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn process_refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::new()
        .with_cmd(UpdateKind::Always)
        .with_cwd(UpdateKind::Always)
        .with_cpu()
        .with_memory()
}

impl ProcessProvider for SysinfoProvider {
    fn processes(&self) -> Result<Vec<ProcessInfo>, EngineError> {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        self.refresh_locked(&mut system);

        let processes = system.processes();
        if processes.is_empty() {
            return Err(EngineError::ProcessSnapshot(
                "process table came back empty".to_string(),
            ));
        }

        log::trace!("Total system processes: {}", processes.len());

        Ok(processes
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                parent_pid: process.parent().map(|p| p.as_u32()),
                pgid: process.session_id().map(|p| p.as_u32()),
                cpu_usage: process.cpu_usage(),
                memory_bytes: process.memory(),
                cmd: process
                    .cmd()
                    .iter()
                    .map(|token| token.to_string_lossy().to_string())
                    .collect(),
                name: process.name().to_string_lossy().to_string(),
                start_time_secs: Some(process.start_time()),
            })
            .collect())
    }

    fn cwd(&self, pid: u32) -> Option<PathBuf> {
        let system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system
            .process(Pid::from_u32(pid))
            .and_then(|process| process.cwd())
            .map(|path| path.to_path_buf())
    }

    fn newest_open_file(&self, pid: u32, query: &OpenFileQuery) -> Option<PathBuf> {
        let output = Command::new("lsof")
            .arg("-Fn")
            .arg("-p")
            .arg(pid.to_string())
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let mut candidates = Vec::new();
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            let Some(path_str) = line.strip_prefix('n') else {
                continue;
            };
            let path = PathBuf::from(path_str);
            if open_file_matches(&path, query) {
                candidates.push(path);
            }
        }

        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by(|a, b| {
            let a_mtime = a
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            let b_mtime = b
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            b_mtime.cmp(&a_mtime)
        });

        candidates.into_iter().next()
    }
}
