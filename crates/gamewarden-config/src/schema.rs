//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global daemon settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// Daily limit
    #[serde(default)]
    pub limit: RawLimit,

    /// Launcher whose process tree is monitored
    #[serde(default)]
    pub launcher: RawLauncher,

    /// Desktop notifications
    #[serde(default)]
    pub notifications: RawNotifications,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// Seconds between monitor ticks
    pub poll_interval_seconds: Option<u64>,

    /// Data directory for the usage file
    pub data_dir: Option<PathBuf>,

    /// Explicit usage file path (overrides data_dir)
    pub usage_file: Option<PathBuf>,
}

/// Daily limit: either a duration string or hours + minutes
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLimit {
    /// Duration string such as "2h" or "90m"; wins over hours/minutes
    pub daily: Option<String>,

    pub hours: Option<u64>,

    pub minutes: Option<u64>,
}

/// Launcher profile
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLauncher {
    /// Executable name of the launcher process (e.g. "steam.exe")
    pub executable: Option<String>,

    /// Auxiliary helper process names: never counted, always killed
    pub helpers: Option<Vec<String>>,

    /// Seconds to wait for a process to exit after a graceful request
    pub terminate_timeout_seconds: Option<u64>,

    /// Seconds to wait for a process to exit after a forceful kill
    pub kill_timeout_seconds: Option<u64>,
}

/// Notification settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotifications {
    pub enabled: Option<bool>,

    /// Title shown on the notification
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_launcher_section() {
        let toml_str = r#"
            config_version = 1

            [launcher]
            executable = "steam"
            helpers = ["steamwebhelper", "gameoverlayui"]
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.launcher.executable.as_deref(), Some("steam"));
        assert_eq!(config.launcher.helpers.unwrap().len(), 2);
        assert!(config.limit.daily.is_none());
    }

    #[test]
    fn parse_hours_and_minutes() {
        let toml_str = r#"
            config_version = 1

            [limit]
            hours = 1
            minutes = 45
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.limit.hours, Some(1));
        assert_eq!(config.limit.minutes, Some(45));
    }
}
