//! Desktop notification support
//!
//! Uses platform-appropriate notification tools:
//! - Linux and other Unix: `notify-send`
//! - macOS: `osascript` with display notification
//! - Windows: `msg *`
//!
//! Delivery is fire-and-forget: the tool is spawned and reaped on a
//! background thread. Only a failure to spawn it is reported.

use gamewarden_host_api::{NotificationSink, NotifyError};
use std::process::{Command, Stdio};

/// Notification sink backed by the desktop's notification tool
#[derive(Debug, Clone)]
pub struct DesktopSink {
    app_name: String,
}

impl DesktopSink {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    fn command(&self, title: &str, body: &str) -> Command {
        if cfg!(target_os = "macos") {
            let script = format!(
                r#"display notification "{}" with title "{}""#,
                escape_applescript_string(body),
                escape_applescript_string(title)
            );
            let mut cmd = Command::new("osascript");
            cmd.arg("-e").arg(script);
            cmd
        } else if cfg!(windows) {
            let mut cmd = Command::new("msg");
            cmd.arg("*").arg("/TIME:5").arg(format!("{}: {}", title, body));
            cmd
        } else {
            let mut cmd = Command::new("notify-send");
            cmd.arg("--urgency=critical")
                .arg(format!("--app-name={}", self.app_name))
                .arg(title)
                .arg(body);
            cmd
        }
    }
}

impl NotificationSink for DesktopSink {
    fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let mut child = self
            .command(title, body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| NotifyError::Unavailable(e.to_string()))?;

        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

fn escape_applescript_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
