//! Per-tick process table snapshot

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One live process as seen at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Parent PID, if the OS reported one
    pub parent: Option<u32>,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>, parent: Option<u32>) -> Self {
        Self {
            pid,
            name: name.into(),
            parent,
        }
    }

    /// Lowercased name for case-insensitive comparisons
    pub fn name_lower(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Point-in-time view of the process table.
///
/// Lookups are by PID and return `None` for processes that were not
/// present when the snapshot was taken, so an ancestor walk over a
/// snapshot can never observe a handle going stale halfway through.
#[derive(Debug, Clone, Default)]
pub struct ProcessSnapshot {
    processes: HashMap<u32, ProcessInfo>,
}

impl ProcessSnapshot {
    pub fn get(&self, pid: u32) -> Option<&ProcessInfo> {
        self.processes.get(&pid)
    }

    /// Parent of `process`, if it has one and it is still in the table
    pub fn parent_of(&self, process: &ProcessInfo) -> Option<&ProcessInfo> {
        process
            .parent
            .filter(|ppid| *ppid != process.pid)
            .and_then(|ppid| self.get(ppid))
    }

    /// Ancestors of `process`, nearest first.
    ///
    /// Stops at the first missing parent and never yields the same PID
    /// twice, so PID reuse cannot produce an endless walk.
    pub fn ancestors<'a>(&'a self, process: &'a ProcessInfo) -> Ancestors<'a> {
        Ancestors {
            snapshot: self,
            current: process,
            visited: vec![process.pid],
        }
    }

    /// Every process below `pid` in the tree, breadth first (nearest first).
    pub fn descendants(&self, pid: u32) -> Vec<u32> {
        let mut found = vec![pid];
        let mut i = 0;
        while i < found.len() {
            let current = found[i];
            let mut children: Vec<u32> = self
                .processes
                .values()
                .filter(|p| p.parent == Some(current) && !found.contains(&p.pid))
                .map(|p| p.pid)
                .collect();
            children.sort_unstable();
            found.extend(children);
            i += 1;
        }
        found.remove(0);
        found
    }

    /// All processes, ordered by PID
    pub fn processes(&self) -> Vec<&ProcessInfo> {
        let mut all: Vec<_> = self.processes.values().collect();
        all.sort_by_key(|p| p.pid);
        all
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

impl FromIterator<ProcessInfo> for ProcessSnapshot {
    fn from_iter<T: IntoIterator<Item = ProcessInfo>>(iter: T) -> Self {
        Self {
            processes: iter.into_iter().map(|p| (p.pid, p)).collect(),
        }
    }
}

/// Iterator over a process's ancestors within a snapshot
pub struct Ancestors<'a> {
    snapshot: &'a ProcessSnapshot,
    current: &'a ProcessInfo,
    visited: Vec<u32>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a ProcessInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let parent = self.snapshot.parent_of(self.current)?;
        if self.visited.contains(&parent.pid) {
            return None;
        }
        self.visited.push(parent.pid);
        self.current = parent;
        Some(parent)
    }
}
