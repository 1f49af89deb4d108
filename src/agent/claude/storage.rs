//! Claude storage-root discovery.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use crate::agent::AgentProcess;

/// All project roots worth scanning: the default location, any profile
/// roots that exist on disk, and roots observed through processes' open
/// session files (covers relocated data homes no convention predicts).
pub fn claude_project_roots(processes: &[AgentProcess]) -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Some(home) = dirs::home_dir() {
        // Legacy default location first.
        roots.push(home.join(".claude").join("projects"));

        let profiles_dir = home.join(".claude-profiles");
        if let Ok(entries) = fs::read_dir(&profiles_dir) {
            let mut profile_roots: Vec<PathBuf> = entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            profile_roots.sort();
            for profile_root in profile_roots {
                roots.push(resolve_profile_projects_dir(profile_root));
            }
        }
    }

    for process in processes {
        if let Some(data_home) = &process.data_home {
            roots.push(data_home.clone());
        }
    }

    dedupe_paths(roots)
}

fn resolve_profile_projects_dir(profile_root: PathBuf) -> PathBuf {
    let projects_dir = profile_root.join("projects");
    if projects_dir.exists() {
        projects_dir
    } else {
        profile_root
    }
}

fn dedupe_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}
