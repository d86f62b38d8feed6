//! Durable storage for workflow progress.
//!
//! Three narrow traits cover the three things this core writes: the primary
//! workflow state (errors must be propagated), the append-only audit trail,
//! and reclass tracking records. [`MemoryStore`] and [`FileStore`] implement
//! all three.

mod file;
mod memory;
mod state;

use async_trait::async_trait;

use crate::error::StoreError;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use state::{
    AuditEntry, ReclassStatus, ReclassTrackingRecord, WorkflowItem, WorkflowState,
    WorkflowStatus, state_key,
};

/// Primary workflow state, keyed by `(request_number, execution_id)` with a
/// secondary access path by loan number ordered by `created_at` descending.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Last-writer-wins upsert. Returns the state exactly as written,
    /// including its timestamps.
    async fn save(&self, state: &WorkflowState) -> Result<WorkflowState, StoreError>;

    async fn find_by_key(
        &self,
        request_number: &str,
        execution_id: &str,
    ) -> Result<Option<WorkflowState>, StoreError>;

    async fn find_most_recent_by_loan_number(
        &self,
        loan_number: &str,
    ) -> Result<Option<WorkflowState>, StoreError>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ReclassTracker: Send + Sync {
    /// Create-if-absent. Returns `false` and leaves the stored record
    /// untouched when one already exists for the key.
    async fn create(&self, record: &ReclassTrackingRecord) -> Result<bool, StoreError>;
}

/// Picks the most recently created item for `loan_number`.
pub(crate) fn most_recent_for_loan<'a>(
    items: impl Iterator<Item = &'a WorkflowItem>,
    loan_number: &str,
) -> Option<&'a WorkflowItem> {
    items
        .filter(|item| item.loan_number == loan_number)
        .max_by_key(|item| item.created_at)
}
