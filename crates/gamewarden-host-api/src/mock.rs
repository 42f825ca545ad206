//! Mock host adapter for testing

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::{HostAdapter, HostError, HostResult, ProcessInfo, ProcessSnapshot, StopMode};

/// How a mock process reacts to being stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockStopBehavior {
    /// Exits on any stop request
    #[default]
    Cooperative,
    /// Ignores graceful requests, dies on force
    IgnoresGraceful,
    /// Survives graceful and force, only a tree kill removes it
    Unkillable,
    /// Every request is rejected with permission denied
    Denied,
}

/// A call recorded by the mock host, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockHostAction {
    Stop { pid: u32, mode: StopMode },
    KillTree { pid: u32 },
}

impl MockHostAction {
    pub fn pid(&self) -> u32 {
        match self {
            MockHostAction::Stop { pid, .. } | MockHostAction::KillTree { pid } => *pid,
        }
    }
}

/// Mock host adapter for unit/integration testing
#[derive(Debug, Default)]
pub struct MockHost {
    processes: Mutex<BTreeMap<u32, ProcessInfo>>,
    behaviors: Mutex<HashMap<u32, MockStopBehavior>>,
    actions: Mutex<Vec<MockHostAction>>,

    /// Configure snapshot to fail
    pub fail_snapshot: AtomicBool,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live process to the fake table
    pub fn add_process(&self, pid: u32, name: &str, parent: Option<u32>) {
        self.processes
            .lock()
            .unwrap()
            .insert(pid, ProcessInfo::new(pid, name, parent));
    }

    /// Simulate a process exiting on its own
    pub fn remove_process(&self, pid: u32) {
        self.processes.lock().unwrap().remove(&pid);
    }

    pub fn set_behavior(&self, pid: u32, behavior: MockStopBehavior) {
        self.behaviors.lock().unwrap().insert(pid, behavior);
    }

    pub fn set_fail_snapshot(&self, fail: bool) {
        self.fail_snapshot.store(fail, Ordering::SeqCst);
    }

    pub fn is_running(&self, pid: u32) -> bool {
        self.processes.lock().unwrap().contains_key(&pid)
    }

    /// All stop/kill calls so far
    pub fn actions(&self) -> Vec<MockHostAction> {
        self.actions.lock().unwrap().clone()
    }

    /// PIDs in the order they were first asked to stop
    pub fn stop_order(&self) -> Vec<u32> {
        let mut order = Vec::new();
        for action in self.actions.lock().unwrap().iter() {
            if !order.contains(&action.pid()) {
                order.push(action.pid());
            }
        }
        order
    }

    pub fn clear_actions(&self) {
        self.actions.lock().unwrap().clear();
    }

    fn behavior(&self, pid: u32) -> MockStopBehavior {
        self.behaviors
            .lock()
            .unwrap()
            .get(&pid)
            .copied()
            .unwrap_or_default()
    }

    fn record(&self, action: MockHostAction) {
        self.actions.lock().unwrap().push(action);
    }
}

impl HostAdapter for MockHost {
    fn snapshot(&self) -> HostResult<ProcessSnapshot> {
        if self.fail_snapshot.load(Ordering::SeqCst) {
            return Err(HostError::Enumeration("Mock snapshot failure".into()));
        }
        Ok(self.processes.lock().unwrap().values().cloned().collect())
    }

    fn stop(&self, pid: u32, mode: StopMode) -> HostResult<()> {
        self.record(MockHostAction::Stop { pid, mode });

        if !self.is_running(pid) {
            return Err(HostError::NoSuchProcess(pid));
        }

        let exits = match (self.behavior(pid), mode) {
            (MockStopBehavior::Cooperative, _) => true,
            (MockStopBehavior::IgnoresGraceful, StopMode::Force { .. }) => true,
            (MockStopBehavior::Denied, _) => return Err(HostError::PermissionDenied(pid)),
            _ => false,
        };

        if exits {
            self.remove_process(pid);
            Ok(())
        } else {
            Err(HostError::Timeout {
                pid,
                timeout: mode.timeout(),
            })
        }
    }

    fn kill_tree(&self, pid: u32) -> HostResult<()> {
        self.record(MockHostAction::KillTree { pid });

        if self.behavior(pid) == MockStopBehavior::Denied {
            return Err(HostError::PermissionDenied(pid));
        }

        let mut processes = self.processes.lock().unwrap();
        if !processes.contains_key(&pid) {
            return Err(HostError::NoSuchProcess(pid));
        }

        let snapshot: ProcessSnapshot = processes.values().cloned().collect();
        let mut doomed = snapshot.descendants(pid);
        doomed.push(pid);
        for pid in doomed {
            processes.remove(&pid);
        }
        Ok(())
    }
}
