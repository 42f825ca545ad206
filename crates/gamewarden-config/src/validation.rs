//! Configuration validation

use crate::schema::{RawConfig, RawLauncher, RawLimit};
use crate::settings::limit_from_parts;
use gamewarden_util::parse_duration;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid daily limit: {0}")]
    InvalidLimit(String),

    #[error("Launcher error: {0}")]
    LauncherError(String),

    #[error("Duplicate helper name: {0}")]
    DuplicateHelper(String),

    #[error("'{field}' must be greater than zero")]
    ZeroValue { field: &'static str },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.daemon.poll_interval_seconds == Some(0) {
        errors.push(ValidationError::ZeroValue {
            field: "daemon.poll_interval_seconds",
        });
    }

    errors.extend(validate_limit(&config.limit));
    errors.extend(validate_launcher(&config.launcher));

    errors
}

fn validate_limit(limit: &RawLimit) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(daily) = &limit.daily {
        match parse_duration(daily) {
            Ok(d) if d.is_zero() => {
                errors.push(ValidationError::InvalidLimit(format!(
                    "'{}' is zero",
                    daily
                )));
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidLimit(e.to_string())),
        }
        return errors;
    }

    if let Some(minutes) = limit.minutes
        && minutes >= 60
    {
        errors.push(ValidationError::InvalidLimit(format!(
            "minutes must be below 60, got {}",
            minutes
        )));
    }

    if limit.hours.is_some() || limit.minutes.is_some() {
        let total = limit_from_parts(limit.hours, limit.minutes).as_secs();
        if total == 0 {
            errors.push(ValidationError::InvalidLimit("hours and minutes are both zero".into()));
        }
    }

    errors
}

fn validate_launcher(launcher: &RawLauncher) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let executable = launcher
        .executable
        .as_deref()
        .map(|e| e.trim().to_lowercase());

    if let Some(exe) = &executable
        && exe.is_empty()
    {
        errors.push(ValidationError::LauncherError(
            "executable cannot be empty".into(),
        ));
    }

    if let Some(helpers) = &launcher.helpers {
        let mut seen = HashSet::new();
        for helper in helpers {
            let name = helper.trim().to_lowercase();
            if name.is_empty() {
                errors.push(ValidationError::LauncherError(
                    "helper names cannot be empty".into(),
                ));
                continue;
            }
            if executable.as_deref() == Some(name.as_str()) {
                errors.push(ValidationError::LauncherError(format!(
                    "'{}' is both the launcher and a helper",
                    helper
                )));
            }
            if !seen.insert(name) {
                errors.push(ValidationError::DuplicateHelper(helper.clone()));
            }
        }
    }

    if launcher.terminate_timeout_seconds == Some(0) {
        errors.push(ValidationError::ZeroValue {
            field: "launcher.terminate_timeout_seconds",
        });
    }
    if launcher.kill_timeout_seconds == Some(0) {
        errors.push(ValidationError::ZeroValue {
            field: "launcher.kill_timeout_seconds",
        });
    }

    errors
}
