//! Validated settings structures

use crate::schema::{RawConfig, RawDaemonConfig, RawLauncher, RawLimit, RawNotifications};
use gamewarden_util::parse_duration;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Default daily limit (2 hours)
pub const DEFAULT_DAILY_LIMIT: Duration = Duration::from_secs(2 * 3600);

/// Default interval between monitor ticks (5 minutes)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Default graceful-exit wait per process
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(8);

/// Default wait after a forceful kill
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default notification title
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Game time limit";

#[cfg(windows)]
const DEFAULT_LAUNCHER: &str = "steam.exe";
#[cfg(windows)]
const DEFAULT_HELPERS: &[&str] = &["steamwebhelper.exe", "gameoverlayui.exe"];

#[cfg(not(windows))]
const DEFAULT_LAUNCHER: &str = "steam";
#[cfg(not(windows))]
const DEFAULT_HELPERS: &[&str] = &["steamwebhelper", "gameoverlayui"];

/// Validated settings ready for use by the daemon
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub daemon: DaemonSettings,

    /// Daily playtime budget
    pub daily_limit: Duration,

    pub launcher: LauncherProfile,

    pub notifications: NotificationSettings,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonSettings::from_raw(raw.daemon),
            daily_limit: limit_from_raw(&raw.limit),
            launcher: LauncherProfile::from_raw(raw.launcher),
            notifications: NotificationSettings::from_raw(raw.notifications),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daemon: DaemonSettings::default(),
            daily_limit: DEFAULT_DAILY_LIMIT,
            launcher: LauncherProfile::default(),
            notifications: NotificationSettings::default(),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonSettings {
    pub poll_interval: Duration,

    /// None means "use the default data directory"
    pub data_dir: Option<PathBuf>,

    /// None means "usage.json inside the data directory"
    pub usage_file: Option<PathBuf>,
}

impl DaemonSettings {
    fn from_raw(raw: RawDaemonConfig) -> Self {
        Self {
            poll_interval: raw
                .poll_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            data_dir: raw.data_dir,
            usage_file: raw.usage_file,
        }
    }
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            data_dir: None,
            usage_file: None,
        }
    }
}

/// The launcher whose process tree is monitored.
///
/// Names are stored lowercased; all comparisons are case-insensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct LauncherProfile {
    pub executable: String,
    pub helpers: HashSet<String>,
    pub terminate_timeout: Duration,
    pub kill_timeout: Duration,
}

impl LauncherProfile {
    pub fn new<I, S>(executable: impl AsRef<str>, helpers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            executable: normalize_name(executable.as_ref()),
            helpers: helpers
                .into_iter()
                .map(|h| normalize_name(h.as_ref()))
                .collect(),
            terminate_timeout: DEFAULT_TERMINATE_TIMEOUT,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
        }
    }

    fn from_raw(raw: RawLauncher) -> Self {
        let executable = raw.executable.unwrap_or_else(|| DEFAULT_LAUNCHER.to_string());
        let mut profile = match raw.helpers {
            Some(helpers) => Self::new(executable, helpers),
            None => Self::new(executable, DEFAULT_HELPERS.iter().copied()),
        };

        if let Some(secs) = raw.terminate_timeout_seconds {
            profile.terminate_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = raw.kill_timeout_seconds {
            profile.kill_timeout = Duration::from_secs(secs);
        }

        profile
    }
}

impl Default for LauncherProfile {
    fn default() -> Self {
        Self::new(DEFAULT_LAUNCHER, DEFAULT_HELPERS.iter().copied())
    }
}

/// Notification configuration
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub title: String,
}

impl NotificationSettings {
    fn from_raw(raw: RawNotifications) -> Self {
        Self {
            enabled: raw.enabled.unwrap_or(true),
            title: raw
                .title
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.to_string()),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            title: DEFAULT_NOTIFICATION_TITLE.to_string(),
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn limit_from_raw(raw: &RawLimit) -> Duration {
    if let Some(daily) = &raw.daily
        && let Ok(limit) = parse_duration(daily)
    {
        return limit;
    }

    if raw.hours.is_some() || raw.minutes.is_some() {
        return limit_from_parts(raw.hours, raw.minutes);
    }

    DEFAULT_DAILY_LIMIT
}

/// Combine the hours/minutes form of the limit into one duration.
pub(crate) fn limit_from_parts(hours: Option<u64>, minutes: Option<u64>) -> Duration {
    let secs = hours
        .unwrap_or(0)
        .saturating_mul(3600)
        .saturating_add(minutes.unwrap_or(0).saturating_mul(60));
    Duration::from_secs(secs)
}
