//! Monitor events and status

use chrono::{DateTime, Local};
use std::time::Duration;

use crate::KillReport;

/// Things that happened during one monitor step, in order
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// The local calendar day changed; the new day starts at zero
    DayRolledOver { previous: String, today: String },

    /// Snapshot failed; this tick was treated as having no active game
    SnapshotFailed { error: String },

    /// Elapsed time was credited to today
    UsageAccrued { seconds: f64, total_seconds: f64 },

    /// Writing the usage record failed; the in-memory value still counts
    PersistFailed { error: String },

    /// A monitored game was seen for the first time
    GameStarted {
        pid: u32,
        name: String,
        at: DateTime<Local>,
    },

    /// Today's usage is at or above the limit
    LimitExhausted {
        used: Duration,
        limit: Duration,
        notified: bool,
    },

    /// Enforcement ran
    TreeKilled { report: KillReport },
}

/// Point-in-time view of the monitor for status displays
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStatus {
    pub day: String,
    pub used: Duration,
    pub limit: Duration,
    pub remaining: Duration,
    pub active_games: usize,
    pub exhausted: bool,
}
