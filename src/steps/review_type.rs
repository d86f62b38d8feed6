use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{RawAttribute, WorkflowSteps, parse_attributes, require};
use crate::audit::AuditScope;
use crate::error::StepError;
use crate::review::ReviewTypeValidator;
use crate::store::{WorkflowState, WorkflowStatus};

pub const REVIEW_TYPE_VALIDATED: &str = "ReviewTypeValidated";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTypeInput {
    #[serde(default)]
    pub request_number: Option<String>,
    #[serde(default)]
    pub loan_number: Option<String>,
    #[serde(default)]
    pub review_type: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub loan_decision: Option<String>,
    #[serde(default)]
    pub current_assigned_username: Option<String>,
    #[serde(default)]
    pub attributes: Option<Vec<RawAttribute>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTypeOutput {
    pub success: bool,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

impl ReviewTypeOutput {
    fn ok(state: &WorkflowState) -> Self {
        Self {
            success: true,
            is_valid: true,
            request_number: Some(state.request_number.clone()),
            loan_number: Some(state.loan_number.clone()),
            review_type: Some(state.review_type.clone()),
            execution_id: Some(state.execution_id.clone()),
            message: Some("Review type validated successfully".to_string()),
            error: None,
            allowed_values: None,
        }
    }

    pub fn failed(
        request_number: Option<&str>,
        loan_number: Option<&str>,
        review_type: Option<&str>,
        err: &StepError,
    ) -> Self {
        Self {
            success: false,
            is_valid: false,
            request_number: request_number.map(str::to_string),
            loan_number: loan_number.map(str::to_string),
            review_type: review_type.map(str::to_string),
            execution_id: None,
            message: None,
            error: Some(err.to_string()),
            allowed_values: Some(ReviewTypeValidator::allowed()),
        }
    }
}

/// Execution id used when the engine does not supply one.
pub fn default_execution_id(request_number: &str) -> String {
    format!("ldc-loan-review-{request_number}")
}

impl WorkflowSteps {
    /// Validates the review type and records the initial workflow state.
    pub async fn validate_review_type(&self, input: ReviewTypeInput) -> ReviewTypeOutput {
        match self.try_validate_review_type(&input).await {
            Ok(state) => {
                info!(
                    request_number = %state.request_number,
                    execution_id = %state.execution_id,
                    "Review type validated and stored"
                );
                ReviewTypeOutput::ok(&state)
            }
            Err(err) => {
                warn!(error = %err, "Review type validation failed");
                ReviewTypeOutput::failed(
                    input.request_number.as_deref(),
                    input.loan_number.as_deref(),
                    input.review_type.as_deref(),
                    &err,
                )
            }
        }
    }

    async fn try_validate_review_type(
        &self,
        input: &ReviewTypeInput,
    ) -> Result<WorkflowState, StepError> {
        let request_number = require(&input.request_number, "requestNumber")?;
        let loan_number = require(&input.loan_number, "loanNumber")?;
        let review_type = require(&input.review_type, "reviewType")?;
        let execution_id = input
            .execution_id
            .clone()
            .unwrap_or_else(|| default_execution_id(request_number));

        debug!(review_type, request_number, "Validating review type");
        if !ReviewTypeValidator::is_valid(review_type) {
            return Err(StepError::Invalid(ReviewTypeValidator::error_message(review_type)));
        }

        let mut state = WorkflowState::new(request_number, execution_id, loan_number, review_type);
        state.status = WorkflowStatus::Pending;
        state.loan_decision = input.loan_decision.clone();
        state.current_assigned_username = input.current_assigned_username.clone();
        if let Some(raw) = &input.attributes {
            state.attributes = parse_attributes(raw)?;
        }

        let saved = self.states.save(&state).await?;

        self.audit
            .record(
                AuditScope {
                    request_number: &saved.request_number,
                    loan_number: &saved.loan_number,
                    execution_id: &saved.execution_id,
                },
                REVIEW_TYPE_VALIDATED,
                Some(format!("reviewType={}", saved.review_type)),
                Utc::now(),
            )
            .await;

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::review::{AttributeDecision, DecisionValue};
    use crate::steps::test_support::steps;
    use crate::store::{MemoryStore, StateStore};

    fn input(review_type: &str) -> ReviewTypeInput {
        ReviewTypeInput {
            request_number: Some("REQ-1".into()),
            loan_number: Some("LOAN-1".into()),
            review_type: Some(review_type.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn valid_type_is_stored_with_default_execution_id() {
        let store = Arc::new(MemoryStore::new());
        let out = steps(store.clone()).validate_review_type(input("SecPolicyReview")).await;

        assert!(out.success && out.is_valid);
        assert_eq!(out.execution_id.as_deref(), Some("ldc-loan-review-REQ-1"));

        let saved = store
            .find_by_key("REQ-1", "ldc-loan-review-REQ-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.review_type, "SecPolicyReview");
        assert_eq!(saved.status, WorkflowStatus::Pending);

        let audit = store.audit_entries().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].state_change, REVIEW_TYPE_VALIDATED);
    }

    #[tokio::test]
    async fn optional_fields_are_copied() {
        let store = Arc::new(MemoryStore::new());
        let mut i = input("LDCReview");
        i.execution_id = Some("exec-42".into());
        i.loan_decision = Some("Approved".into());
        i.current_assigned_username = Some("underwriter1".into());
        i.attributes = Some(vec![RawAttribute::new("CreditScore", Some("Approved"))]);

        let out = steps(store.clone()).validate_review_type(i).await;
        assert!(out.success);

        let saved = store.find_by_key("REQ-1", "exec-42").await.unwrap().unwrap();
        assert_eq!(saved.loan_decision.as_deref(), Some("Approved"));
        assert_eq!(saved.current_assigned_username.as_deref(), Some("underwriter1"));
        assert_eq!(
            saved.attributes,
            vec![AttributeDecision::decided("CreditScore", DecisionValue::Approved)]
        );
    }

    #[tokio::test]
    async fn invalid_type_reports_allow_list_and_stores_nothing() {
        let store = Arc::new(MemoryStore::new());
        let out = steps(store.clone()).validate_review_type(input(" LDCReview ")).await;

        assert!(!out.success);
        assert!(!out.is_valid);
        assert_eq!(out.review_type.as_deref(), Some(" LDCReview "));
        assert_eq!(
            out.allowed_values.unwrap(),
            vec!["LDCReview", "SecPolicyReview", "ConduitReview"]
        );
        assert!(out.error.unwrap().contains("' LDCReview '"));
        assert!(store.find_most_recent_by_loan_number("LOAN-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_required_field_is_named() {
        let store = Arc::new(MemoryStore::new());
        let mut i = input("LDCReview");
        i.loan_number = None;
        let out = steps(store).validate_review_type(i).await;
        assert!(!out.success);
        assert_eq!(out.error.as_deref(), Some("Missing required field: loanNumber"));
    }

    #[tokio::test]
    async fn invalid_attribute_decision_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut i = input("ConduitReview");
        i.attributes = Some(vec![RawAttribute::new("CreditScore", Some(""))]);
        let out = steps(store).validate_review_type(i).await;
        assert!(!out.success);
        assert!(out.error.unwrap().starts_with("Invalid attribute decision: ''"));
    }
}
