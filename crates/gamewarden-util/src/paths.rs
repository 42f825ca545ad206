//! Default paths for gamewarden components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/gamewarden/config.toml` or `~/.config/gamewarden/config.toml`
//! - Data: `$GAMEWARDEN_DATA_DIR`, `$XDG_DATA_HOME/gamewarden` or `~/.local/share/gamewarden`
//!
//! On Windows `%APPDATA%` / `%LOCALAPPDATA%` take the place of the XDG variables.

use std::path::PathBuf;

/// Environment variable for overriding the data directory
pub const GAMEWARDEN_DATA_DIR_ENV: &str = "GAMEWARDEN_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "gamewarden";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Usage filename within the data directory
const USAGE_FILENAME: &str = "usage.json";

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(appdata) = std::env::var("APPDATA") {
        return PathBuf::from(appdata).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$GAMEWARDEN_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/gamewarden` (if XDG_DATA_HOME is set)
/// 3. `%LOCALAPPDATA%\gamewarden` (Windows)
/// 4. `~/.local/share/gamewarden` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(GAMEWARDEN_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking GAMEWARDEN_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(local_appdata) = std::env::var("LOCALAPPDATA") {
        return PathBuf::from(local_appdata).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    std::env::temp_dir().join(APP_DIR)
}

/// Usage file path inside a data directory.
pub fn usage_file_in(data_dir: impl Into<PathBuf>) -> PathBuf {
    data_dir.into().join(USAGE_FILENAME)
}
