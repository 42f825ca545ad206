//! Background service registration (systemd user unit)

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    /// Register and enable the service with the current limit
    Install,
    /// Stop, disable and unregister the service
    Remove,
    /// Start the registered service
    Start,
    /// Stop the running service
    Stop,
}

#[cfg(target_os = "linux")]
pub use linux::manage;

#[cfg(not(target_os = "linux"))]
pub fn manage(
    action: ServiceAction,
    _settings: &gamewarden_config::Settings,
    _config: &std::path::Path,
) -> anyhow::Result<()> {
    anyhow::bail!("Service {:?} is not supported on this platform", action)
}

#[cfg(target_os = "linux")]
mod linux {
    use super::ServiceAction;
    use anyhow::{Context, Result, bail};
    use gamewarden_config::Settings;
    use std::path::{Path, PathBuf};
    use std::process::Command;
    use tracing::{info, warn};

    pub const UNIT_NAME: &str = "gamewardend.service";

    pub fn manage(action: ServiceAction, settings: &Settings, config: &Path) -> Result<()> {
        match action {
            ServiceAction::Install => {
                let exe = std::env::current_exe().context("Failed to locate current executable")?;
                // The unit runs from a different working directory
                let config = std::path::absolute(config)
                    .with_context(|| format!("Failed to resolve config path {:?}", config))?;
                let path = unit_path()?;
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {:?}", parent))?;
                }
                std::fs::write(&path, render_unit(&exe, &config, settings))
                    .with_context(|| format!("Failed to write unit file {:?}", path))?;
                systemctl(&["daemon-reload"])?;
                systemctl(&["enable", UNIT_NAME])?;
                info!(unit = %path.display(), "Service installed");
                println!("Service installed: {}", path.display());
            }
            ServiceAction::Remove => {
                if let Err(e) = systemctl(&["disable", "--now", UNIT_NAME]) {
                    warn!(error = %e, "Could not disable service");
                }
                let path = unit_path()?;
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(e)
                            .with_context(|| format!("Failed to remove unit file {:?}", path));
                    }
                }
                systemctl(&["daemon-reload"])?;
                println!("Service removed");
            }
            ServiceAction::Start => {
                systemctl(&["start", UNIT_NAME])?;
                println!("Service started");
            }
            ServiceAction::Stop => {
                systemctl(&["stop", UNIT_NAME])?;
                println!("Service stopped");
            }
        }
        Ok(())
    }

    fn unit_path() -> Result<PathBuf> {
        let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let home = std::env::var_os("HOME").context("HOME is not set")?;
                PathBuf::from(home).join(".config")
            }
        };
        Ok(config_home.join("systemd").join("user").join(UNIT_NAME))
    }

    /// The unit re-invokes this binary with the effective settings baked in
    pub(super) fn render_unit(exe: &Path, config: &Path, settings: &Settings) -> String {
        let mut exec = format!(
            "\"{}\" --config \"{}\" --limit {}s --poll-interval {}",
            exe.display(),
            config.display(),
            settings.daily_limit.as_secs(),
            settings.daemon.poll_interval.as_secs().max(1),
        );
        if let Some(dir) = &settings.daemon.data_dir {
            exec.push_str(&format!(" --data-dir \"{}\"", dir.display()));
        }
        if let Some(file) = &settings.daemon.usage_file {
            exec.push_str(&format!(" --usage-file \"{}\"", file.display()));
        }

        format!(
            "[Unit]\n\
             Description=gamewarden daily game-time limiter\n\
             After=graphical-session.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={exec}\n\
             Restart=on-failure\n\
             RestartSec=10\n\
             \n\
             [Install]\n\
             WantedBy=default.target\n"
        )
    }

    fn systemctl(args: &[&str]) -> Result<()> {
        let status = Command::new("systemctl")
            .arg("--user")
            .args(args)
            .status()
            .context("Failed to run systemctl")?;
        if !status.success() {
            bail!("systemctl --user {} failed: {}", args.join(" "), status);
        }
        Ok(())
    }
}
