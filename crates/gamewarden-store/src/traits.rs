//! Store trait definitions

use crate::{StoreResult, UsageRecord};

/// Persistence for the daily usage record
pub trait UsageStore: Send {
    /// Load the persisted record.
    ///
    /// Never fails: a missing or unreadable backing resource yields an empty
    /// record, and implementations write the empty record back.
    fn load(&self) -> UsageRecord;

    /// Replace the persisted record with `record`.
    fn save(&self, record: &UsageRecord) -> StoreResult<()>;

    /// Remove the persisted record entirely.
    fn reset(&self) -> StoreResult<()>;
}
