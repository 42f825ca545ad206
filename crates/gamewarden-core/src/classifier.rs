//! Process classification

use gamewarden_config::LauncherProfile;
use gamewarden_host_api::{ProcessInfo, ProcessSnapshot};
use std::collections::HashSet;

/// Result of partitioning one process snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Monitored games, ordered by PID
    pub games: Vec<ProcessInfo>,

    /// Helpers first, then launcher processes
    pub launcher_and_helpers: Vec<ProcessInfo>,
}

/// Decides which processes belong to the launcher's tree
#[derive(Debug, Clone)]
pub struct ProcessClassifier {
    launcher: String,
    helpers: HashSet<String>,
}

impl ProcessClassifier {
    pub fn new(profile: &LauncherProfile) -> Self {
        Self {
            launcher: profile.executable.to_lowercase(),
            helpers: profile.helpers.iter().map(|h| h.to_lowercase()).collect(),
        }
    }

    pub fn is_launcher(&self, process: &ProcessInfo) -> bool {
        process.name_lower() == self.launcher
    }

    pub fn is_helper(&self, process: &ProcessInfo) -> bool {
        self.helpers.contains(&process.name_lower())
    }

    /// Whether any ancestor of `process` is the launcher.
    ///
    /// A parent missing from the snapshot (exited, or hidden from us) ends
    /// the walk with `false`.
    pub fn has_launcher_ancestor(&self, process: &ProcessInfo, snapshot: &ProcessSnapshot) -> bool {
        snapshot
            .ancestors(process)
            .any(|ancestor| self.is_launcher(ancestor))
    }

    /// A monitored game descends from the launcher and is neither a helper
    /// nor another launcher process.
    pub fn is_monitored_game(&self, process: &ProcessInfo, snapshot: &ProcessSnapshot) -> bool {
        !self.is_helper(process)
            && !self.is_launcher(process)
            && self.has_launcher_ancestor(process, snapshot)
    }

    /// Partition a snapshot into games and launcher-plus-helpers in one pass
    pub fn classify_all(&self, snapshot: &ProcessSnapshot) -> Classification {
        let mut games = Vec::new();
        let mut helpers = Vec::new();
        let mut launchers = Vec::new();

        for process in snapshot.processes() {
            if self.is_launcher(process) {
                launchers.push(process.clone());
            } else if self.is_helper(process) {
                helpers.push(process.clone());
            } else if self.has_launcher_ancestor(process, snapshot) {
                games.push(process.clone());
            }
        }

        helpers.extend(launchers);
        Classification {
            games,
            launcher_and_helpers: helpers,
        }
    }
}
