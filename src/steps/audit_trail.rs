use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{WorkflowSteps, require};
use crate::audit::AuditScope;
use crate::error::StepError;

const UNKNOWN_EXECUTION: &str = "unknown";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrailInput {
    #[serde(default)]
    pub request_number: Option<String>,
    #[serde(default)]
    pub loan_number: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub state_change: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrailOutput {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_change: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowSteps {
    /// Records an arbitrary state transition. A failed write is logged by the
    /// recorder and does not change the output.
    pub async fn log_audit_trail(&self, input: AuditTrailInput) -> AuditTrailOutput {
        match self.try_log_audit_trail(&input).await {
            Ok(()) => AuditTrailOutput {
                success: true,
                request_number: input.request_number,
                loan_number: input.loan_number,
                state_change: input.state_change,
                message: Some("Audit trail logged successfully".to_string()),
                error: None,
            },
            Err(err) => {
                warn!(error = %err, "Audit trail step rejected");
                AuditTrailOutput {
                    success: false,
                    request_number: input.request_number,
                    loan_number: input.loan_number,
                    state_change: input.state_change,
                    message: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    async fn try_log_audit_trail(&self, input: &AuditTrailInput) -> Result<(), StepError> {
        let request_number = require(&input.request_number, "requestNumber")?;
        let loan_number = require(&input.loan_number, "loanNumber")?;
        let state_change = require(&input.state_change, "stateChange")?;
        let execution_id = input.execution_id.as_deref().unwrap_or(UNKNOWN_EXECUTION);

        let outcome = self
            .audit
            .record(
                AuditScope {
                    request_number,
                    loan_number,
                    execution_id,
                },
                state_change,
                input.details.clone(),
                Utc::now(),
            )
            .await;
        debug!(%outcome, state_change, "Audit trail side effect");
        Ok(())
    }
}
