use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{RawAttribute, WorkflowSteps, parse_attributes, require};
use crate::error::{SideEffect, StepError};
use crate::review::{LoanStatus, StatusEngine};
use crate::store::ReclassTrackingRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInput {
    #[serde(default)]
    pub request_number: Option<String>,
    #[serde(default)]
    pub loan_number: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub attributes: Option<Vec<RawAttribute>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LoanStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowSteps {
    /// Folds the attribute decisions into the aggregate loan status.
    ///
    /// A `Reclass Approved` result also opens a reclass tracking record; if a
    /// workflow state exists for the key, its `loanStatus` and attributes are
    /// updated.
    pub async fn determine_status(&self, input: StatusInput) -> StatusOutput {
        match self.try_determine_status(&input).await {
            Ok((status, count)) => StatusOutput {
                success: true,
                request_number: input.request_number,
                loan_number: input.loan_number,
                status: Some(status),
                attribute_count: Some(count),
                error: None,
            },
            Err(err) => {
                warn!(error = %err, "Loan status determination failed");
                StatusOutput {
                    success: false,
                    request_number: input.request_number,
                    loan_number: input.loan_number,
                    status: None,
                    attribute_count: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    async fn try_determine_status(
        &self,
        input: &StatusInput,
    ) -> Result<(LoanStatus, usize), StepError> {
        let request_number = require(&input.request_number, "requestNumber")?;
        let loan_number = require(&input.loan_number, "loanNumber")?;
        let execution_id = require(&input.execution_id, "executionId")?;
        let raw = input
            .attributes
            .as_deref()
            .ok_or(StepError::MissingField("attributes"))?;

        let attributes = parse_attributes(raw)?;
        if attributes.is_empty() {
            return Err(StepError::Invalid("No attributes found".to_string()));
        }

        let status = StatusEngine::determine(&attributes);
        info!(%status, request_number, execution_id, "Status determination step resolved");

        if status.requires_reclass_tracking() {
            let outcome = self.track_reclass(request_number, execution_id, loan_number).await;
            debug!(%outcome, "Reclass tracking side effect");
        }

        if let Some(mut state) = self.states.find_by_key(request_number, execution_id).await? {
            state.loan_status = Some(status);
            state.attributes = attributes.clone();
            self.states.save(&state).await?;
        } else {
            debug!(request_number, execution_id, "No workflow state to update with loan status");
        }

        Ok((status, attributes.len()))
    }

    async fn track_reclass(
        &self,
        request_number: &str,
        execution_id: &str,
        loan_number: &str,
    ) -> SideEffect {
        let record = ReclassTrackingRecord::new(request_number, execution_id, loan_number);
        match self.reclass.create(&record).await {
            Ok(true) => {
                info!(request_number, execution_id, "Reclass confirmation record created");
                SideEffect::Applied
            }
            Ok(false) => {
                debug!(request_number, execution_id, "Reclass confirmation record already open");
                SideEffect::Applied
            }
            Err(err) => {
                error!(request_number, error = %err, "Error creating reclass confirmation record");
                SideEffect::failed(err)
            }
        }
    }
}
