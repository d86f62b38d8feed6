//! Append-only audit trail of workflow state transitions.
//!
//! Every write is best-effort: a failing sink is logged and reported as a
//! [`SideEffect`], never as an error the step has to handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::error::SideEffect;
use crate::store::{AuditEntry, AuditSink};

pub const WORKFLOW_COMPLETED: &str = "WorkflowCompleted";
pub const WORKFLOW_ERROR: &str = "WorkflowError";

/// Identifies the workflow attempt an audit entry belongs to.
#[derive(Debug, Clone, Copy)]
pub struct AuditScope<'a> {
    pub request_number: &'a str,
    pub loan_number: &'a str,
    pub execution_id: &'a str,
}

#[derive(Clone)]
pub struct AuditTrailRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditTrailRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub async fn record(
        &self,
        scope: AuditScope<'_>,
        state_change: &str,
        details: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> SideEffect {
        let entry = AuditEntry::new(
            scope.request_number,
            scope.loan_number,
            scope.execution_id,
            state_change,
            details,
            timestamp,
        );

        match self.sink.append(&entry).await {
            Ok(()) => {
                info!(
                    request_number = scope.request_number,
                    state_change,
                    audit_id = %entry.audit_id,
                    "Audit trail logged"
                );
                SideEffect::Applied
            }
            Err(err) => {
                error!(
                    request_number = scope.request_number,
                    state_change,
                    error = %err,
                    "Error logging audit trail"
                );
                SideEffect::failed(err)
            }
        }
    }

    pub async fn workflow_completed(
        &self,
        scope: AuditScope<'_>,
        final_status: &str,
    ) -> SideEffect {
        self.record(
            scope,
            WORKFLOW_COMPLETED,
            Some(format!("finalStatus={final_status}")),
            Utc::now(),
        )
        .await
    }

    pub async fn workflow_error(&self, scope: AuditScope<'_>, message: &str) -> SideEffect {
        self.record(
            scope,
            WORKFLOW_ERROR,
            Some(format!("error={message}")),
            Utc::now(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct OfflineSink;

    #[async_trait]
    impl AuditSink for OfflineSink {
        async fn append(&self, _entry: &AuditEntry) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("audit table offline".into()))
        }
    }

    const SCOPE: AuditScope<'static> = AuditScope {
        request_number: "REQ-1",
        loan_number: "LOAN-1",
        execution_id: "exec-1",
    };

    #[tokio::test]
    async fn records_entry_with_fresh_id() {
        let store = Arc::new(MemoryStore::new());
        let recorder = AuditTrailRecorder::new(store.clone());

        let ts = Utc::now();
        assert!(recorder.record(SCOPE, "Started", Some("x=1".into()), ts).await.is_applied());
        assert!(recorder.record(SCOPE, "Started", None, ts).await.is_applied());

        let entries = store.audit_entries().await;
        assert_eq!(entries.len(), 2);
        assert_ne!(entries[0].audit_id, entries[1].audit_id);
        assert_eq!(entries[0].details.as_deref(), Some("x=1"));
        assert_eq!(entries[0].timestamp, ts);
    }

    #[tokio::test]
    async fn convenience_wrappers_format_details() {
        let store = Arc::new(MemoryStore::new());
        let recorder = AuditTrailRecorder::new(store.clone());

        recorder.workflow_completed(SCOPE, "Approved").await;
        recorder.workflow_error(SCOPE, "timer expired").await;

        let entries = store.audit_entries().await;
        assert_eq!(entries[0].state_change, WORKFLOW_COMPLETED);
        assert_eq!(entries[0].details.as_deref(), Some("finalStatus=Approved"));
        assert_eq!(entries[1].state_change, WORKFLOW_ERROR);
        assert_eq!(entries[1].details.as_deref(), Some("error=timer expired"));
    }

    #[tokio::test]
    async fn sink_outage_is_swallowed() {
        let recorder = AuditTrailRecorder::new(Arc::new(OfflineSink));
        let outcome = recorder.record(SCOPE, "Started", None, Utc::now()).await;
        assert_eq!(
            outcome,
            SideEffect::Failed {
                reason: "Store unavailable: audit table offline".into()
            }
        );
    }
}
