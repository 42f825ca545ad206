//! JSON file store

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{StoreError, StoreResult, UsageRecord, UsageStore};

/// Usage record persisted as a pretty-printed JSON object on disk
#[derive(Debug, Clone)]
pub struct JsonUsageStore {
    path: PathBuf,
}

impl JsonUsageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoreResult<UsageRecord> {
        let content = std::fs::read_to_string(&self.path)?;
        let mut record: UsageRecord = serde_json::from_str(&content)?;

        let repaired = record.sanitize();
        if repaired > 0 {
            warn!(path = %self.path.display(), repaired, "Clamped invalid usage values to zero");
        }

        Ok(record)
    }

    /// Load without the self-healing write-back (for read-only status queries).
    pub fn peek(&self) -> UsageRecord {
        self.read().unwrap_or_default()
    }
}

impl UsageStore for JsonUsageStore {
    fn load(&self) -> UsageRecord {
        match self.read() {
            Ok(record) => {
                debug!(path = %self.path.display(), days = record.len(), "Usage loaded");
                return record;
            }
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No usage file yet, starting empty");
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Unreadable usage file, starting empty"
                );
            }
        }

        let record = UsageRecord::new();
        if let Err(e) = self.save(&record) {
            warn!(path = %self.path.display(), error = %e, "Failed to write empty usage file");
        }
        record
    }

    fn save(&self, record: &UsageRecord) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(record)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Write to temp file in same directory, then rename over the target
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        debug!(path = %self.path.display(), days = record.len(), "Usage saved");
        Ok(())
    }

    fn reset(&self) -> StoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> JsonUsageStore {
        JsonUsageStore::new(dir.path().join("usage.json"))
    }

    #[test]
    fn missing_file_loads_empty_and_heals() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let record = store.load();
        assert!(record.is_empty());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap().trim(), "{}");
    }

    #[test]
    fn corrupt_file_loads_empty_and_heals() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{not json").unwrap();

        let record = store.load();
        assert!(record.is_empty());

        let healed: UsageRecord =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(healed.is_empty());
    }

    #[test]
    fn wrong_shape_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"2025-05-22": "lots"}"#).unwrap();

        assert!(store.load().is_empty());
    }

    #[test]
    fn save_load_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut record = UsageRecord::new();
        record.add("2025-05-21", 7200.0);
        record.add("2025-05-22", 1234.5);

        store.save(&record).unwrap();
        let first = store.load();
        store.save(&first).unwrap();
        let second = store.load();

        assert_eq!(first, record);
        assert_eq!(second, record);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonUsageStore::new(dir.path().join("nested").join("usage.json"));

        store.save(&UsageRecord::new()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut record = UsageRecord::new();
        record.add("2025-05-22", 1.0);
        store.save(&record).unwrap();
        store.save(&record).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn reset_removes_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(&UsageRecord::new()).unwrap();
        store.reset().unwrap();
        assert!(!store.path().exists());
        store.reset().unwrap();
    }

    #[test]
    fn peek_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.peek().is_empty());
        assert!(!store.path().exists());
    }
}
