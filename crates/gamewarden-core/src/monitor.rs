//! The accounting and enforcement state machine

use chrono::{DateTime, Local};
use gamewarden_config::LauncherProfile;
use gamewarden_host_api::{HostAdapter, ProcessInfo};
use gamewarden_store::{UsageRecord, UsageStore};
use gamewarden_util::{day_key, format_clock_time, format_hms};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    Clock, Enforcer, MonitorEvent, MonitorStatus, Notifier, ProcessClassifier, EXHAUSTED_MESSAGE,
};

/// Daily game-time monitor.
///
/// Driven one tick at a time through [`Monitor::step`]. A tick never
/// fails: host and persistence errors are logged and the next tick
/// carries on.
pub struct Monitor {
    limit: Duration,
    classifier: ProcessClassifier,
    enforcer: Enforcer,
    host: Arc<dyn HostAdapter>,
    store: Box<dyn UsageStore>,
    notifier: Notifier,
    clock: Box<dyn Clock>,

    usage: UsageRecord,
    today: String,
    prev_active: BTreeSet<u32>,
    last_ts: DateTime<Local>,
    was_active: bool,

    /// Games that outlived the last enforcement pass
    survivors: Vec<ProcessInfo>,
}

impl Monitor {
    /// Load persisted usage and make sure today has an entry
    pub fn new(
        limit: Duration,
        launcher: &LauncherProfile,
        host: Arc<dyn HostAdapter>,
        store: Box<dyn UsageStore>,
        notifier: Notifier,
        clock: Box<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        let today = day_key(&now);

        let mut usage = store.load();
        let repaired = usage.sanitize();
        if repaired > 0 {
            warn!(entries = repaired, "Discarded invalid usage values");
        }

        let mut monitor = Self {
            limit,
            classifier: ProcessClassifier::new(launcher),
            enforcer: Enforcer::new(host.clone(), launcher),
            host,
            store,
            notifier,
            clock,
            usage,
            today,
            prev_active: BTreeSet::new(),
            last_ts: now,
            was_active: false,
            survivors: Vec::new(),
        };

        if monitor.usage.ensure_day(&monitor.today) || repaired > 0 {
            monitor.persist();
        }

        info!(
            day = %monitor.today,
            used = %format_hms(monitor.usage.used(&monitor.today)),
            limit = %format_hms(limit),
            "Monitor initialized"
        );

        monitor
    }

    /// Run one tick: rollover, sample, account, log arrivals, enforce
    pub fn step(&mut self) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        let now = self.clock.now();

        if let Some(event) = self.rollover_at(&now) {
            events.push(event);
        }

        let active = self.sample(&mut events);
        self.account(now, !active.is_empty(), &mut events);
        self.log_arrivals(&active, &now, &mut events);

        let status = self.status();
        info!(
            remaining = %format_hms(status.remaining),
            active_games = status.active_games,
            "Time remaining"
        );

        if status.exhausted {
            self.enforce(&active, &mut events);
        }

        events
    }

    /// Reset usage if the local day changed since the last tick
    pub fn check_day_rollover(&mut self) -> Option<MonitorEvent> {
        let now = self.clock.now();
        self.rollover_at(&now)
    }

    /// Zero today's usage and persist
    pub fn reset_today(&mut self) {
        self.usage.reset_day(&self.today);
        self.persist();
        info!(day = %self.today, "Usage for today reset");
    }

    pub fn set_limit(&mut self, limit: Duration) {
        info!(limit = %format_hms(limit), "Daily limit changed");
        self.limit = limit;
    }

    pub fn today(&self) -> &str {
        &self.today
    }

    pub fn usage(&self) -> &UsageRecord {
        &self.usage
    }

    pub fn status(&self) -> MonitorStatus {
        let used = self.usage.used(&self.today);
        MonitorStatus {
            day: self.today.clone(),
            used,
            limit: self.limit,
            remaining: self.limit.saturating_sub(used),
            active_games: self.prev_active.len(),
            exhausted: self.usage.seconds(&self.today) >= self.limit.as_secs_f64(),
        }
    }

    fn rollover_at(&mut self, now: &DateTime<Local>) -> Option<MonitorEvent> {
        let key = day_key(now);
        if key == self.today {
            return None;
        }

        let previous = std::mem::replace(&mut self.today, key);
        self.usage.reset_day(&self.today);
        self.survivors.clear();
        self.persist();

        info!(previous = %previous, today = %self.today, "New day, usage reset");
        Some(MonitorEvent::DayRolledOver {
            previous,
            today: self.today.clone(),
        })
    }

    fn sample(&mut self, events: &mut Vec<MonitorEvent>) -> Vec<ProcessInfo> {
        match self.host.snapshot() {
            Ok(snapshot) => self.classifier.classify_all(&snapshot).games,
            Err(e) => {
                warn!(error = %e, "Process snapshot failed, treating tick as idle");
                events.push(MonitorEvent::SnapshotFailed {
                    error: e.to_string(),
                });
                Vec::new()
            }
        }
    }

    fn account(&mut self, now: DateTime<Local>, active: bool, events: &mut Vec<MonitorEvent>) {
        if active && self.was_active {
            let seconds = elapsed_seconds(&self.last_ts, &now);
            if seconds < 0.0 {
                warn!(
                    last = %format_clock_time(&self.last_ts),
                    now = %format_clock_time(&now),
                    "Clock moved backwards, not crediting this interval"
                );
            } else if seconds > 0.0 {
                let total_seconds = self.usage.add(&self.today, seconds);
                if let Some(event) = self.persist() {
                    events.push(event);
                }
                events.push(MonitorEvent::UsageAccrued {
                    seconds,
                    total_seconds,
                });
            }
        }

        self.was_active = active;
        self.last_ts = now;
    }

    fn log_arrivals(
        &mut self,
        active: &[ProcessInfo],
        now: &DateTime<Local>,
        events: &mut Vec<MonitorEvent>,
    ) {
        for game in active.iter().filter(|p| !self.prev_active.contains(&p.pid)) {
            info!(
                pid = game.pid,
                name = %game.name,
                at = %format_clock_time(now),
                "Game started"
            );
            events.push(MonitorEvent::GameStarted {
                pid: game.pid,
                name: game.name.clone(),
                at: *now,
            });
        }

        self.prev_active = active.iter().map(|p| p.pid).collect();
    }

    fn enforce(&mut self, active: &[ProcessInfo], events: &mut Vec<MonitorEvent>) {
        let used = self.usage.used(&self.today);

        let notified = if active.is_empty() {
            debug!("Over the daily limit, sweeping for late launches");
            false
        } else {
            info!(
                used = %format_hms(used),
                limit = %format_hms(self.limit),
                "Daily limit reached, closing games and launcher"
            );
            self.notifier.notify(EXHAUSTED_MESSAGE)
        };

        events.push(MonitorEvent::LimitExhausted {
            used,
            limit: self.limit,
            notified,
        });

        let report = self
            .enforcer
            .kill_monitored_tree(&self.classifier, &self.survivors);
        if !report.snapshot_failed {
            self.survivors = report.surviving_games();
            if !self.survivors.is_empty() {
                let pids: Vec<u32> = self.survivors.iter().map(|p| p.pid).collect();
                warn!(?pids, "Games survived enforcement, retrying next tick");
            }
        }
        events.push(MonitorEvent::TreeKilled { report });
    }

    fn persist(&mut self) -> Option<MonitorEvent> {
        match self.store.save(&self.usage) {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Failed to save usage, keeping in-memory value");
                Some(MonitorEvent::PersistFailed {
                    error: e.to_string(),
                })
            }
        }
    }
}

/// Signed seconds from `from` to `to`
fn elapsed_seconds(from: &DateTime<Local>, to: &DateTime<Local>) -> f64 {
    let delta = *to - *from;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ManualClock, TerminateOutcome};
    use chrono::TimeZone;
    use gamewarden_host_api::{MockHost, MockHostAction, MockStopBehavior, RecordingSink};
    use gamewarden_store::MemoryUsageStore;

    const TICK: Duration = Duration::from_secs(300);

    struct Harness {
        host: Arc<MockHost>,
        store: MemoryUsageStore,
        sink: RecordingSink,
        clock: ManualClock,
        monitor: Monitor,
    }

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 5, 22, 14, 0, 0).unwrap()
    }

    fn harness_with(limit: Duration, record: UsageRecord) -> Harness {
        let host = Arc::new(MockHost::new());
        host.add_process(1, "init", None);
        host.add_process(10, "steam", Some(1));
        host.add_process(11, "steamwebhelper", Some(10));

        let store = MemoryUsageStore::with_record(record);
        let sink = RecordingSink::new();
        let clock = ManualClock::new(start());

        let monitor = Monitor::new(
            limit,
            &LauncherProfile::new("steam", ["steamwebhelper"]),
            host.clone(),
            Box::new(store.clone()),
            Notifier::new(Box::new(sink.clone()), "Game time"),
            Box::new(clock.clone()),
        );

        Harness {
            host,
            store,
            sink,
            clock,
            monitor,
        }
    }

    fn harness(limit: Duration) -> Harness {
        harness_with(limit, UsageRecord::new())
    }

    fn kill_tree_calls(events: &[MonitorEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, MonitorEvent::TreeKilled { .. }))
            .count()
    }

    #[test]
    fn seeds_today_on_startup() {
        let h = harness(Duration::from_secs(3600));

        let persisted = h.store.persisted().unwrap();
        assert!(persisted.contains_day("2025-05-22"));
        assert_eq!(persisted.seconds("2025-05-22"), 0.0);
        assert_eq!(h.monitor.today(), "2025-05-22");
    }

    #[test]
    fn keeps_existing_usage_on_startup() {
        let record: UsageRecord = [("2025-05-22".to_string(), 1200.0)].into_iter().collect();
        let h = harness_with(Duration::from_secs(3600), record);

        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 1200.0);
        assert_eq!(h.store.save_count(), 0);
    }

    #[test]
    fn first_active_tick_gives_no_credit() {
        let mut h = harness(Duration::from_secs(3600));
        h.host.add_process(20, "game", Some(10));

        // Game was running unobserved for a long time before this tick
        h.clock.advance(Duration::from_secs(5000));
        h.monitor.step();
        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 0.0);

        h.clock.advance(TICK);
        h.monitor.step();
        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 300.0);
    }

    #[test]
    fn idle_gap_is_not_credited() {
        let mut h = harness(Duration::from_secs(7200));
        h.host.add_process(20, "game", Some(10));

        h.monitor.step();
        h.clock.advance(TICK);
        h.monitor.step();
        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 300.0);

        h.host.remove_process(20);
        h.clock.advance(TICK);
        h.monitor.step();
        h.clock.advance(TICK);
        h.monitor.step();
        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 300.0);

        h.host.add_process(21, "game", Some(10));
        h.clock.advance(TICK);
        h.monitor.step();
        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 300.0);

        h.clock.advance(TICK);
        h.monitor.step();
        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 600.0);
    }

    #[test]
    fn usage_never_decreases_within_a_day() {
        let mut h = harness(Duration::from_secs(7200));
        h.host.add_process(20, "game", Some(10));

        let mut last = 0.0;
        for i in 0..10 {
            if i == 4 {
                h.clock.rewind(Duration::from_secs(900));
            } else {
                h.clock.advance(Duration::from_secs(60));
            }
            h.monitor.step();
            let now = h.monitor.usage().seconds("2025-05-22");
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn accrual_is_persisted() {
        let mut h = harness(Duration::from_secs(3600));
        h.host.add_process(20, "game", Some(10));

        h.monitor.step();
        h.clock.advance(Duration::from_secs(42));
        let events = h.monitor.step();

        assert!(events.iter().any(|e| matches!(
            e,
            MonitorEvent::UsageAccrued { seconds, .. } if *seconds == 42.0
        )));
        assert_eq!(h.store.persisted().unwrap().seconds("2025-05-22"), 42.0);
    }

    #[test]
    fn persist_failure_keeps_counting() {
        let mut h = harness(Duration::from_secs(3600));
        h.host.add_process(20, "game", Some(10));
        h.store.set_fail_saves(true);

        h.monitor.step();
        h.clock.advance(TICK);
        let events = h.monitor.step();

        assert!(events.iter().any(|e| matches!(e, MonitorEvent::PersistFailed { .. })));
        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 300.0);
    }

    #[test]
    fn arrivals_are_reported_once() {
        let mut h = harness(Duration::from_secs(3600));
        h.host.add_process(20, "game", Some(10));

        let events = h.monitor.step();
        let started: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::GameStarted { pid, name, .. } => Some((*pid, name.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![(20, "game".to_string())]);

        h.clock.advance(TICK);
        let events = h.monitor.step();
        assert!(!events.iter().any(|e| matches!(e, MonitorEvent::GameStarted { .. })));
        assert_eq!(h.monitor.status().active_games, 1);
    }

    #[test]
    fn helpers_do_not_accrue() {
        let mut h = harness(Duration::from_secs(3600));

        h.monitor.step();
        h.clock.advance(TICK);
        h.monitor.step();

        // Only the launcher and its web helper are running
        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 0.0);
        assert_eq!(h.monitor.status().active_games, 0);
    }

    #[test]
    fn over_limit_kills_once_and_notifies_once() {
        let record: UsageRecord = [("2025-05-22".to_string(), 5.0)].into_iter().collect();
        let mut h = harness_with(Duration::from_secs(1), record);
        h.host.add_process(20, "game", Some(10));

        let events = h.monitor.step();

        assert_eq!(kill_tree_calls(&events), 1);
        let exhausted: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, MonitorEvent::LimitExhausted { notified: true, .. }))
            .collect();
        assert_eq!(exhausted.len(), 1);
        assert_eq!(h.sink.sent().len(), 1);

        // Game first, then helper, then launcher
        assert_eq!(h.host.stop_order(), vec![20, 11, 10]);
        assert!(!h.host.is_running(20));
        assert!(!h.host.is_running(10));
    }

    #[test]
    fn crossing_the_limit_enforces() {
        let mut h = harness(Duration::from_secs(600));
        h.host.add_process(20, "game", Some(10));

        h.monitor.step();
        h.clock.advance(TICK);
        let events = h.monitor.step();
        assert_eq!(kill_tree_calls(&events), 0);

        h.clock.advance(TICK);
        let events = h.monitor.step();
        assert_eq!(kill_tree_calls(&events), 1);
        assert!(h.monitor.status().exhausted);
        assert_eq!(h.monitor.status().remaining, Duration::ZERO);
    }

    #[test]
    fn late_launch_is_killed_without_notification() {
        let record: UsageRecord = [("2025-05-22".to_string(), 900.0)].into_iter().collect();
        let mut h = harness_with(Duration::from_secs(600), record);

        // Nothing running: sweep, but no notification
        h.host.remove_process(10);
        h.host.remove_process(11);
        let events = h.monitor.step();
        assert_eq!(kill_tree_calls(&events), 1);
        assert!(h.sink.sent().is_empty());

        // Launcher and a game appear after the limit was used up
        h.host.add_process(10, "steam", Some(1));
        h.host.add_process(20, "game", Some(10));
        h.clock.advance(TICK);
        h.monitor.step();

        assert!(!h.host.is_running(20));
        assert!(!h.host.is_running(10));
        assert_eq!(h.sink.sent().len(), 1);
    }

    #[test]
    fn notifies_every_active_tick_over_limit() {
        let record: UsageRecord = [("2025-05-22".to_string(), 900.0)].into_iter().collect();
        let mut h = harness_with(Duration::from_secs(600), record);

        for _ in 0..3 {
            h.host.add_process(10, "steam", Some(1));
            h.host.add_process(20, "game", Some(10));
            h.monitor.step();
            h.clock.advance(TICK);
        }

        assert_eq!(h.sink.sent().len(), 3);
    }

    #[test]
    fn notification_failure_latches() {
        let record: UsageRecord = [("2025-05-22".to_string(), 900.0)].into_iter().collect();
        let host = Arc::new(MockHost::new());
        let sink = RecordingSink::failing();
        let clock = ManualClock::new(start());
        let mut monitor = Monitor::new(
            Duration::from_secs(600),
            &LauncherProfile::new("steam", ["steamwebhelper"]),
            host.clone(),
            Box::new(MemoryUsageStore::with_record(record)),
            Notifier::new(Box::new(sink.clone()), "Game time"),
            Box::new(clock.clone()),
        );

        for _ in 0..3 {
            host.add_process(10, "steam", None);
            host.add_process(20, "game", Some(10));
            let events = monitor.step();
            assert_eq!(kill_tree_calls(&events), 1);
            clock.advance(TICK);
        }

        assert_eq!(sink.attempts(), 1);
        assert!(!host.is_running(20));
    }

    #[test]
    fn snapshot_failure_is_idle_tick() {
        let mut h = harness(Duration::from_secs(3600));
        h.host.add_process(20, "game", Some(10));

        h.monitor.step();
        h.host.set_fail_snapshot(true);
        h.clock.advance(TICK);
        let events = h.monitor.step();
        assert!(events.iter().any(|e| matches!(e, MonitorEvent::SnapshotFailed { .. })));

        // Stopwatch restarted: the recovery tick earns nothing
        h.host.set_fail_snapshot(false);
        h.clock.advance(TICK);
        h.monitor.step();
        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 0.0);
    }

    #[test]
    fn day_rollover_resets_once() {
        let mut h = harness(Duration::from_secs(600));
        h.host.add_process(20, "game", Some(10));

        h.monitor.step();
        h.clock.advance(TICK);
        h.monitor.step();
        h.clock.advance(TICK);
        h.monitor.step();
        assert!(h.monitor.status().exhausted);

        h.clock.set(Local.with_ymd_and_hms(2025, 5, 23, 0, 1, 0).unwrap());
        let events = h.monitor.step();
        assert!(events.iter().any(|e| matches!(
            e,
            MonitorEvent::DayRolledOver { previous, today }
                if previous == "2025-05-22" && today == "2025-05-23"
        )));
        assert_eq!(h.monitor.today(), "2025-05-23");
        assert!(!h.monitor.status().exhausted);
        assert_eq!(h.store.persisted().unwrap().seconds("2025-05-22"), 600.0);

        // Same day again: no second reset
        assert!(h.monitor.check_day_rollover().is_none());
    }

    #[test]
    fn rollover_credits_new_day() {
        let mut h = harness(Duration::from_secs(7200));
        h.host.add_process(20, "game", Some(10));

        h.clock.set(Local.with_ymd_and_hms(2025, 5, 22, 23, 58, 0).unwrap());
        h.monitor.step();
        h.clock.set(Local.with_ymd_and_hms(2025, 5, 23, 0, 3, 0).unwrap());
        h.monitor.step();

        assert_eq!(h.monitor.usage().seconds("2025-05-23"), 300.0);
        assert_eq!(h.monitor.usage().seconds("2025-05-22"), 0.0);
    }

    #[test]
    fn reset_today_zeroes() {
        let record: UsageRecord = [("2025-05-22".to_string(), 900.0)].into_iter().collect();
        let mut h = harness_with(Duration::from_secs(600), record);
        assert!(h.monitor.status().exhausted);

        h.monitor.reset_today();
        assert!(!h.monitor.status().exhausted);
        assert_eq!(h.store.persisted().unwrap().seconds("2025-05-22"), 0.0);
    }

    #[test]
    fn set_limit_changes_threshold() {
        let record: UsageRecord = [("2025-05-22".to_string(), 900.0)].into_iter().collect();
        let mut h = harness_with(Duration::from_secs(600), record);
        h.host.add_process(20, "game", Some(10));

        h.monitor.set_limit(Duration::from_secs(3600));
        let events = h.monitor.step();

        assert_eq!(kill_tree_calls(&events), 0);
        assert!(h.host.is_running(20));
        assert_eq!(h.monitor.status().remaining, Duration::from_secs(2700));
    }

    #[test]
    fn unreachable_game_is_retried_next_tick() {
        let record: UsageRecord = [("2025-05-22".to_string(), 900.0)].into_iter().collect();
        let mut h = harness_with(Duration::from_secs(600), record);
        h.host.add_process(20, "game", Some(10));
        h.host.set_behavior(20, MockStopBehavior::Denied);

        let events = h.monitor.step();
        let outcome = events.iter().find_map(|e| match e {
            MonitorEvent::TreeKilled { report } => report.games.first().map(|(_, o)| *o),
            _ => None,
        });
        assert_eq!(outcome, Some(TerminateOutcome::Unreachable));

        h.host.clear_actions();
        h.clock.advance(TICK);
        h.monitor.step();
        assert!(
            h.host
                .actions()
                .iter()
                .any(|a| matches!(a, MockHostAction::KillTree { pid: 20 }))
        );
    }

    #[test]
    fn survivor_replaced_by_new_process_is_not_retried() {
        let record: UsageRecord = [("2025-05-22".to_string(), 900.0)].into_iter().collect();
        let mut h = harness_with(Duration::from_secs(600), record);
        h.host.add_process(20, "game", Some(10));
        h.host.set_behavior(20, MockStopBehavior::Denied);
        h.monitor.step();

        // The game finally exits and its pid goes to an unrelated program
        h.host.remove_process(20);
        h.host.add_process(20, "editor", Some(1));
        h.host.set_behavior(20, MockStopBehavior::Cooperative);
        h.host.clear_actions();

        h.clock.advance(TICK);
        h.monitor.step();
        assert!(h.host.is_running(20));
        assert!(h.host.actions().iter().all(|a| a.pid() != 20));
    }

    #[test]
    fn rollover_forgets_survivors() {
        let record: UsageRecord = [("2025-05-22".to_string(), 900.0)].into_iter().collect();
        let mut h = harness_with(Duration::from_secs(600), record);
        h.host.add_process(20, "game", Some(10));
        h.host.set_behavior(20, MockStopBehavior::Denied);
        h.monitor.step();
        h.host.clear_actions();

        // A new session runs past midnight and uses up the new day too
        h.host.add_process(12, "steam", Some(1));
        h.host.add_process(50, "game", Some(12));
        h.clock.set(Local.with_ymd_and_hms(2025, 5, 23, 0, 1, 0).unwrap());
        let events = h.monitor.step();

        assert_eq!(kill_tree_calls(&events), 1);
        assert!(!h.host.is_running(50));
        assert!(h.host.is_running(20));
        assert!(h.host.actions().iter().all(|a| a.pid() != 20));
    }
}
