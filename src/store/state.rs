use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::review::{AttributeDecision, LoanStatus};

/// Lifecycle tag of a workflow attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    #[default]
    Pending,
    Suspended,
    Completed,
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "PENDING",
            WorkflowStatus::Suspended => "SUSPENDED",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable record of one workflow attempt, keyed by `(request_number, execution_id)`.
///
/// A record holding a `task_token` is a suspended execution waiting for an
/// external resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub request_number: String,
    pub execution_id: String,
    pub loan_number: String,
    pub review_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_status: Option<LoanStatus>,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_assigned_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_token: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    pub fn new(
        request_number: impl Into<String>,
        execution_id: impl Into<String>,
        loan_number: impl Into<String>,
        review_type: impl Into<String>,
    ) -> Self {
        Self {
            request_number: request_number.into(),
            execution_id: execution_id.into(),
            loan_number: loan_number.into(),
            review_type: review_type.into(),
            loan_decision: None,
            loan_status: None,
            status: WorkflowStatus::Pending,
            current_assigned_username: None,
            task_token: None,
            attributes: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn key(&self) -> String {
        state_key(&self.request_number, &self.execution_id)
    }

    pub fn is_suspended(&self) -> bool {
        self.task_token.is_some()
    }
}

pub fn state_key(request_number: &str, execution_id: &str) -> String {
    format!("{request_number}#{execution_id}")
}

/// Stored shape of a [`WorkflowState`]. Attributes are kept as an embedded
/// JSON blob and unset optional fields are omitted entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowItem {
    pub request_number: String,
    pub execution_id: String,
    pub loan_number: String,
    pub review_type: String,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_status: Option<LoanStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_assigned_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<String>,
}

impl WorkflowItem {
    /// Build the item to write for `state`, given whatever is already stored
    /// under the same key.
    ///
    /// `created_at` comes from the previous item, else the state, else `now`;
    /// once stored it never changes.
    /// `updated_at` is strictly after the previous item's.
    pub fn stamp(
        state: &WorkflowState,
        previous: Option<&WorkflowItem>,
        now: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let created_at = previous
            .map(|p| p.created_at)
            .or(state.created_at)
            .unwrap_or(now);
        let updated_at = match previous {
            Some(p) if p.updated_at >= now => p.updated_at + Duration::microseconds(1),
            _ => now,
        };
        let attributes = if state.attributes.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&state.attributes)?)
        };

        Ok(Self {
            request_number: state.request_number.clone(),
            execution_id: state.execution_id.clone(),
            loan_number: state.loan_number.clone(),
            review_type: state.review_type.clone(),
            status: state.status,
            created_at,
            updated_at,
            loan_decision: state.loan_decision.clone(),
            loan_status: state.loan_status,
            current_assigned_username: state.current_assigned_username.clone(),
            task_token: state.task_token.clone(),
            attributes,
        })
    }

    pub fn key(&self) -> String {
        state_key(&self.request_number, &self.execution_id)
    }

    pub fn into_state(self) -> Result<WorkflowState, StoreError> {
        let attributes = match &self.attributes {
            Some(blob) => serde_json::from_str(blob).map_err(|e| StoreError::Corrupt {
                key: self.key(),
                reason: format!("invalid attributes blob: {e}"),
            })?,
            None => Vec::new(),
        };

        Ok(WorkflowState {
            request_number: self.request_number,
            execution_id: self.execution_id,
            loan_number: self.loan_number,
            review_type: self.review_type,
            loan_decision: self.loan_decision,
            loan_status: self.loan_status,
            status: self.status,
            current_assigned_username: self.current_assigned_username,
            task_token: self.task_token,
            attributes,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        })
    }
}

/// Append-only compliance record of one state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub audit_id: String,
    pub request_number: String,
    pub loan_number: String,
    pub execution_id: String,
    pub state_change: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        request_number: &str,
        loan_number: &str,
        execution_id: &str,
        state_change: &str,
        details: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            audit_id: Uuid::new_v4().to_string(),
            request_number: request_number.to_string(),
            loan_number: loan_number.to_string(),
            execution_id: execution_id.to_string(),
            state_change: state_change.to_string(),
            details: details.filter(|d| !d.is_empty()),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReclassStatus {
    #[default]
    Pending,
    Confirmed,
    Expired,
}

/// Tracks the confirmation window opened by a `Reclass Approved` status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclassTrackingRecord {
    pub request_number: String,
    pub execution_id: String,
    pub loan_number: String,
    pub reclass_confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub status: ReclassStatus,
}

impl ReclassTrackingRecord {
    pub fn new(request_number: &str, execution_id: &str, loan_number: &str) -> Self {
        Self {
            request_number: request_number.to_string(),
            execution_id: execution_id.to_string(),
            loan_number: loan_number.to_string(),
            reclass_confirmed: false,
            created_at: Utc::now(),
            status: ReclassStatus::Pending,
        }
    }

    pub fn key(&self) -> String {
        state_key(&self.request_number, &self.execution_id)
    }
}
