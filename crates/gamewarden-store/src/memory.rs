//! In-memory store for testing

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{StoreError, StoreResult, UsageRecord, UsageStore};

/// In-memory usage store.
///
/// Clones share state, so a test can keep one handle and give another to
/// the monitor.
#[derive(Debug, Clone, Default)]
pub struct MemoryUsageStore {
    record: Arc<Mutex<Option<UsageRecord>>>,
    saves: Arc<AtomicUsize>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `record`
    pub fn with_record(record: UsageRecord) -> Self {
        let store = Self::default();
        *store.record.lock().unwrap() = Some(record);
        store
    }

    /// Currently persisted record, if any
    pub fn persisted(&self) -> Option<UsageRecord> {
        self.record.lock().unwrap().clone()
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl UsageStore for MemoryUsageStore {
    fn load(&self) -> UsageRecord {
        let mut guard = self.record.lock().unwrap();
        guard.get_or_insert_with(UsageRecord::new).clone()
    }

    fn save(&self, record: &UsageRecord) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Mock save failure".into()));
        }
        *self.record.lock().unwrap() = Some(record.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reset(&self) -> StoreResult<()> {
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}
