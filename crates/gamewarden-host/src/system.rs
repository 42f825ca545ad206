//! Process table adapter backed by `sysinfo`

use gamewarden_host_api::{
    HostAdapter, HostError, HostResult, ProcessInfo, ProcessSnapshot, StopMode,
};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tracing::debug;

/// How often to re-check a process while waiting for it to exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Host adapter for the machine the daemon runs on
pub struct SystemHost {
    system: Mutex<System>,
}

impl SystemHost {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn system(&self) -> HostResult<MutexGuard<'_, System>> {
        self.system
            .lock()
            .map_err(|_| HostError::Internal("process table lock poisoned".into()))
    }

    /// Whether `pid` is still present and not a zombie
    pub fn is_alive(&self, pid: u32) -> HostResult<bool> {
        let mut system = self.system()?;
        let spid = Pid::from_u32(pid);
        system.refresh_processes(ProcessesToUpdate::Some(&[spid]), true);

        Ok(system
            .process(spid)
            .is_some_and(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead)))
    }

    fn wait_for_exit(&self, pid: u32, timeout: Duration) -> HostResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_alive(pid)? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HostError::Timeout { pid, timeout });
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }
    }

    fn check_target(pid: u32) -> HostResult<()> {
        // pid 0 addresses our own process group on Unix
        if pid == 0 || pid == std::process::id() {
            return Err(HostError::PermissionDenied(pid));
        }
        Ok(())
    }

    #[cfg(unix)]
    fn send_signal(&self, pid: u32, force: bool) -> HostResult<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{self, Signal};

        let raw = i32::try_from(pid).map_err(|_| HostError::NoSuchProcess(pid))?;
        let sig = if force { Signal::SIGKILL } else { Signal::SIGTERM };

        match signal::kill(nix::unistd::Pid::from_raw(raw), sig) {
            Ok(()) => {
                debug!(pid, signal = %sig, "Signal sent");
                Ok(())
            }
            Err(Errno::ESRCH) => Err(HostError::NoSuchProcess(pid)),
            Err(Errno::EPERM) => Err(HostError::PermissionDenied(pid)),
            Err(e) => Err(HostError::Internal(format!("Failed to send {}: {}", sig, e))),
        }
    }

    #[cfg(not(unix))]
    fn send_signal(&self, pid: u32, force: bool) -> HostResult<()> {
        let mut system = self.system()?;
        let spid = Pid::from_u32(pid);
        system.refresh_processes(ProcessesToUpdate::Some(&[spid]), true);
        let process = system.process(spid).ok_or(HostError::NoSuchProcess(pid))?;

        // Platforms without SIGTERM fall back to a hard kill
        let sent = if force {
            process.kill()
        } else {
            process
                .kill_with(sysinfo::Signal::Term)
                .unwrap_or_else(|| process.kill())
        };

        if sent {
            debug!(pid, force, "Termination requested");
            Ok(())
        } else {
            Err(HostError::PermissionDenied(pid))
        }
    }

    #[cfg(windows)]
    fn force_tree_kill(&self, pid: u32) -> HostResult<()> {
        use std::process::{Command, Stdio};

        let status = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F", "/T"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(HostError::Internal(format!("taskkill exited with {}", status)))
        }
    }

    #[cfg(not(windows))]
    fn force_tree_kill(&self, pid: u32) -> HostResult<()> {
        let snapshot = self.snapshot()?;

        // Deepest first so nothing gets re-parented mid-sweep
        for child in snapshot.descendants(pid).into_iter().rev() {
            if Self::check_target(child).is_err() {
                continue;
            }
            match self.send_signal(child, true) {
                Ok(()) | Err(HostError::NoSuchProcess(_)) => {}
                Err(e) => tracing::warn!(pid = child, error = %e, "Failed to kill descendant"),
            }
        }

        self.send_signal(pid, true)
    }
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAdapter for SystemHost {
    fn snapshot(&self) -> HostResult<ProcessSnapshot> {
        let mut system = self.system()?;
        system.refresh_processes(ProcessesToUpdate::All, true);

        let snapshot: ProcessSnapshot = system
            .processes()
            .iter()
            // Linux lists threads as tasks; only whole processes count
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| {
                ProcessInfo::new(
                    pid.as_u32(),
                    process.name().to_string_lossy(),
                    process.parent().map(|parent| parent.as_u32()),
                )
            })
            .collect();

        if snapshot.is_empty() {
            return Err(HostError::Enumeration("process table is empty".into()));
        }

        Ok(snapshot)
    }

    fn stop(&self, pid: u32, mode: StopMode) -> HostResult<()> {
        Self::check_target(pid)?;

        let force = matches!(mode, StopMode::Force { .. });
        self.send_signal(pid, force)?;
        self.wait_for_exit(pid, mode.timeout())
    }

    fn kill_tree(&self, pid: u32) -> HostResult<()> {
        Self::check_target(pid)?;
        self.force_tree_kill(pid)
    }
}
