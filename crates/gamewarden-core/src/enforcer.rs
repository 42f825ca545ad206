//! Enforcement actions: stopping games and the launcher

use gamewarden_config::LauncherProfile;
use gamewarden_host_api::{HostAdapter, HostError, ProcessInfo, StopMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Classification, ProcessClassifier};

/// How a single termination attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// Exited after the graceful request
    Exited,
    /// Exited after the forced kill
    Killed,
    /// Removed by the platform's tree kill
    TreeKilled,
    /// Was already gone when we got to it
    AlreadyGone,
    /// Still running, or out of reach (permissions, platform)
    Unreachable,
}

impl TerminateOutcome {
    pub fn is_stopped(&self) -> bool {
        !matches!(self, TerminateOutcome::Unreachable)
    }
}

/// What a kill-tree pass did, in the order it did it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillReport {
    pub games: Vec<(ProcessInfo, TerminateOutcome)>,
    pub launcher_and_helpers: Vec<(ProcessInfo, TerminateOutcome)>,

    /// No snapshot could be taken, so nothing was attempted
    pub snapshot_failed: bool,
}

impl KillReport {
    pub fn is_empty(&self) -> bool {
        self.games.is_empty() && self.launcher_and_helpers.is_empty()
    }

    /// Number of targeted processes that are no longer running
    pub fn stopped(&self) -> usize {
        self.games
            .iter()
            .chain(&self.launcher_and_helpers)
            .filter(|(_, outcome)| outcome.is_stopped())
            .count()
    }

    /// Games still running after this pass
    pub fn surviving_games(&self) -> Vec<ProcessInfo> {
        self.games
            .iter()
            .filter(|(_, outcome)| !outcome.is_stopped())
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn unreachable(&self) -> Vec<u32> {
        self.games
            .iter()
            .chain(&self.launcher_and_helpers)
            .filter(|(_, outcome)| !outcome.is_stopped())
            .map(|(p, _)| p.pid)
            .collect()
    }
}

/// Performs stop requests against the host with escalation
pub struct Enforcer {
    host: Arc<dyn HostAdapter>,
    terminate_timeout: Duration,
    kill_timeout: Duration,
}

impl Enforcer {
    pub fn new(host: Arc<dyn HostAdapter>, profile: &LauncherProfile) -> Self {
        Self {
            host,
            terminate_timeout: profile.terminate_timeout,
            kill_timeout: profile.kill_timeout,
        }
    }

    /// Stop one process: graceful, then forced, then the platform tree kill.
    ///
    /// Never fails. A process that is already gone counts as success.
    pub fn terminate(&self, process: &ProcessInfo) -> TerminateOutcome {
        let pid = process.pid;

        match self.host.stop(
            pid,
            StopMode::Graceful {
                timeout: self.terminate_timeout,
            },
        ) {
            Ok(()) => {
                debug!(pid, name = %process.name, "Process exited after graceful stop");
                return TerminateOutcome::Exited;
            }
            Err(HostError::NoSuchProcess(_)) => return TerminateOutcome::AlreadyGone,
            Err(e) => {
                debug!(pid, name = %process.name, error = %e, "Graceful stop failed, forcing")
            }
        }

        match self.host.stop(
            pid,
            StopMode::Force {
                timeout: self.kill_timeout,
            },
        ) {
            Ok(()) => {
                debug!(pid, name = %process.name, "Process killed");
                return TerminateOutcome::Killed;
            }
            Err(HostError::NoSuchProcess(_)) => return TerminateOutcome::AlreadyGone,
            Err(e) => {
                debug!(pid, name = %process.name, error = %e, "Forced stop failed, killing tree")
            }
        }

        match self.host.kill_tree(pid) {
            Ok(()) => TerminateOutcome::TreeKilled,
            Err(HostError::NoSuchProcess(_)) => TerminateOutcome::AlreadyGone,
            Err(e) => {
                warn!(pid, name = %process.name, error = %e, "Could not stop process");
                TerminateOutcome::Unreachable
            }
        }
    }

    /// Stop every monitored game, then the launcher and its helpers.
    ///
    /// Works from a fresh snapshot. `survivors` are games that outlived an
    /// earlier pass; once their launcher is gone they no longer classify as
    /// games, so each one still present under the same pid and name is
    /// targeted again ahead of the launcher set. If the snapshot fails
    /// nothing is stopped this time; the next tick tries again.
    pub fn kill_monitored_tree(
        &self,
        classifier: &ProcessClassifier,
        survivors: &[ProcessInfo],
    ) -> KillReport {
        let snapshot = match self.host.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Could not snapshot processes for enforcement");
                return KillReport {
                    snapshot_failed: true,
                    ..KillReport::default()
                };
            }
        };

        let mut classification = classifier.classify_all(&snapshot);
        for survivor in survivors {
            let Some(live) = snapshot.get(survivor.pid) else {
                continue;
            };
            let listed = classification.games.iter().any(|g| g.pid == live.pid)
                || classification
                    .launcher_and_helpers
                    .iter()
                    .any(|p| p.pid == live.pid);
            // A different name means the pid was reused
            if live.name == survivor.name && !listed {
                classification.games.push(live.clone());
            }
        }

        self.kill_classified(&classification)
    }

    fn kill_classified(&self, classification: &Classification) -> KillReport {
        let mut report = KillReport::default();

        for game in &classification.games {
            let outcome = self.terminate(game);
            report.games.push((game.clone(), outcome));
        }

        for process in &classification.launcher_and_helpers {
            let outcome = self.terminate(process);
            report.launcher_and_helpers.push((process.clone(), outcome));
        }

        if !report.is_empty() {
            info!(
                games = report.games.len(),
                launcher_and_helpers = report.launcher_and_helpers.len(),
                stopped = report.stopped(),
                unreachable = ?report.unreachable(),
                "Closed games and launcher"
            );
        }

        report
    }
}
