//! Daily usage record

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Mapping from ISO-8601 calendar day to seconds played that day.
///
/// Serialized as a flat JSON object (`{"2025-05-22": 5400.0}`); a
/// `BTreeMap` keeps the file sorted by day for human inspection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageRecord(BTreeMap<String, f64>);

impl UsageRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds played on `day` (zero if the day was never observed)
    pub fn seconds(&self, day: &str) -> f64 {
        self.0.get(day).copied().unwrap_or(0.0)
    }

    /// Usage on `day` as a whole-second duration
    pub fn used(&self, day: &str) -> Duration {
        Duration::from_secs(self.seconds(day) as u64)
    }

    pub fn contains_day(&self, day: &str) -> bool {
        self.0.contains_key(day)
    }

    /// Insert `day` with zero usage if absent. Returns true if inserted.
    pub fn ensure_day(&mut self, day: &str) -> bool {
        if self.contains_day(day) {
            return false;
        }
        self.0.insert(day.to_string(), 0.0);
        true
    }

    /// Set `day` to zero usage
    pub fn reset_day(&mut self, day: &str) {
        self.0.insert(day.to_string(), 0.0);
    }

    /// Add `seconds` to `day` and return the new total.
    ///
    /// Negative or non-finite amounts are ignored so a day never decreases.
    pub fn add(&mut self, day: &str, seconds: f64) -> f64 {
        let entry = self.0.entry(day.to_string()).or_insert(0.0);
        if seconds.is_finite() && seconds > 0.0 {
            *entry += seconds;
        }
        *entry
    }

    /// Clamp invalid persisted values (negative, non-finite) to zero.
    /// Returns the number of entries that were repaired.
    pub fn sanitize(&mut self) -> usize {
        let mut repaired = 0;
        for value in self.0.values_mut() {
            if !value.is_finite() || *value < 0.0 {
                *value = 0.0;
                repaired += 1;
            }
        }
        repaired
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for UsageRecord {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
