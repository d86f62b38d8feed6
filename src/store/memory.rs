use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::state::{AuditEntry, ReclassTrackingRecord, WorkflowItem, WorkflowState, state_key};
use super::{AuditSink, ReclassTracker, StateStore, most_recent_for_loan};
use crate::error::StoreError;

/// Ephemeral in-process backend.
#[derive(Default)]
pub struct MemoryStore {
    states: RwLock<HashMap<String, WorkflowItem>>,
    audit: RwLock<Vec<AuditEntry>>,
    reclass: RwLock<HashMap<String, ReclassTrackingRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored item, as the backend holds it.
    pub async fn item(&self, request_number: &str, execution_id: &str) -> Option<WorkflowItem> {
        self.states
            .read()
            .await
            .get(&state_key(request_number, execution_id))
            .cloned()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.read().await.clone()
    }

    pub async fn reclass_records(&self) -> Vec<ReclassTrackingRecord> {
        self.reclass.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save(&self, state: &WorkflowState) -> Result<WorkflowState, StoreError> {
        let mut states = self.states.write().await;
        let key = state.key();
        let item = WorkflowItem::stamp(state, states.get(&key), Utc::now())?;
        states.insert(key, item.clone());
        debug!(
            request_number = %state.request_number,
            execution_id = %state.execution_id,
            "Saved workflow state"
        );
        item.into_state()
    }

    async fn find_by_key(
        &self,
        request_number: &str,
        execution_id: &str,
    ) -> Result<Option<WorkflowState>, StoreError> {
        self.item(request_number, execution_id)
            .await
            .map(WorkflowItem::into_state)
            .transpose()
    }

    async fn find_most_recent_by_loan_number(
        &self,
        loan_number: &str,
    ) -> Result<Option<WorkflowState>, StoreError> {
        let states = self.states.read().await;
        most_recent_for_loan(states.values(), loan_number)
            .cloned()
            .map(WorkflowItem::into_state)
            .transpose()
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.audit.write().await.push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl ReclassTracker for MemoryStore {
    async fn create(&self, record: &ReclassTrackingRecord) -> Result<bool, StoreError> {
        let mut records = self.reclass.write().await;
        match records.entry(record.key()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }
}
