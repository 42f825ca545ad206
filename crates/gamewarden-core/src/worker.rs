//! Background worker driving the monitor on a fixed interval

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{Monitor, MonitorStatus};

/// Longest uninterrupted sleep between stop-flag checks
const STOP_CHECK_SLICE: Duration = Duration::from_millis(200);

/// Runs [`Monitor::step`] on a dedicated thread.
///
/// Cancellation is cooperative: the stop flag is checked between ticks,
/// never in the middle of one. Status is handed to other threads through
/// a `watch` channel instead of shared mutable state.
pub struct MonitorWorker {
    stop: Arc<AtomicBool>,
    status: watch::Receiver<MonitorStatus>,
    thread: JoinHandle<Monitor>,
}

impl MonitorWorker {
    pub fn spawn(mut monitor: Monitor, interval: Duration) -> std::io::Result<Self> {
        let (tx, rx) = watch::channel(monitor.status());
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        let thread = thread::Builder::new()
            .name("gamewarden-monitor".into())
            .spawn(move || {
                info!(interval_secs = interval.as_secs(), "Monitor worker started");

                while !flag.load(Ordering::SeqCst) {
                    let events = monitor.step();
                    debug!(events = events.len(), "Tick complete");
                    tx.send_replace(monitor.status());
                    sleep_unless_stopped(&flag, interval);
                }

                info!("Monitor worker stopped");
                monitor
            })?;

        Ok(Self {
            stop,
            status: rx,
            thread,
        })
    }

    /// A receiver that sees the status after every tick
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status.clone()
    }

    /// Latest published status
    pub fn status(&self) -> MonitorStatus {
        self.status.borrow().clone()
    }

    /// Ask the worker to stop after the current tick
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Stop the worker and wait for it, returning the monitor.
    ///
    /// Errors only if the worker thread panicked.
    pub fn stop(self) -> thread::Result<Monitor> {
        self.request_stop();
        self.thread.join()
    }
}

fn sleep_unless_stopped(flag: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while !flag.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(STOP_CHECK_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ManualClock, Notifier};
    use chrono::{Local, TimeZone};
    use gamewarden_config::LauncherProfile;
    use gamewarden_host_api::{MockHost, NullSink};
    use gamewarden_store::MemoryUsageStore;

    fn monitor(host: Arc<MockHost>) -> Monitor {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2025, 5, 22, 14, 0, 0).unwrap());
        Monitor::new(
            Duration::from_secs(3600),
            &LauncherProfile::new("steam", Vec::<String>::new()),
            host,
            Box::new(MemoryUsageStore::new()),
            Notifier::new(Box::new(NullSink), "Game time"),
            Box::new(clock),
        )
    }

    #[test]
    fn publishes_status_and_stops() {
        let host = Arc::new(MockHost::new());
        host.add_process(10, "steam", None);
        host.add_process(20, "game", Some(10));

        let worker = MonitorWorker::spawn(monitor(host), Duration::from_millis(10)).unwrap();
        let mut rx = worker.subscribe();

        let deadline = Instant::now() + Duration::from_secs(5);
        while rx.borrow_and_update().active_games == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(worker.status().active_games, 1);

        let monitor = worker.stop().unwrap();
        assert_eq!(monitor.today(), "2025-05-22");
    }

    #[test]
    fn stop_interrupts_long_sleep() {
        let host = Arc::new(MockHost::new());
        let worker = MonitorWorker::spawn(monitor(host), Duration::from_secs(600)).unwrap();

        let started = Instant::now();
        worker.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
