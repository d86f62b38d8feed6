use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{RawAttribute, WorkflowSteps, parse_attributes, require};
use crate::error::StepError;
use crate::review::{Completion, CompletionChecker};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionInput {
    #[serde(default)]
    pub request_number: Option<String>,
    #[serde(default)]
    pub loan_number: Option<String>,
    #[serde(default)]
    pub loan_decision: Option<String>,
    #[serde(default)]
    pub attributes: Option<Vec<RawAttribute>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutput {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking_reasons: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowSteps {
    /// Checks whether the review is ready to finalize. Pure, no I/O.
    pub fn check_completion(&self, input: CompletionInput) -> CompletionOutput {
        match evaluate(&input) {
            Ok(completion) => {
                info!(
                    request_number = input.request_number.as_deref().unwrap_or_default(),
                    complete = completion.is_complete(),
                    "Completion criteria checked"
                );
                CompletionOutput {
                    success: true,
                    request_number: input.request_number,
                    loan_number: input.loan_number,
                    complete: Some(completion.is_complete()),
                    blocking_reasons: completion.reason(),
                    error: None,
                }
            }
            Err(err) => {
                warn!(error = %err, "Completion check failed");
                CompletionOutput {
                    success: false,
                    request_number: input.request_number,
                    loan_number: input.loan_number,
                    complete: None,
                    blocking_reasons: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

fn evaluate(input: &CompletionInput) -> Result<Completion, StepError> {
    require(&input.request_number, "requestNumber")?;
    require(&input.loan_number, "loanNumber")?;
    let attributes = input
        .attributes
        .as_deref()
        .map(parse_attributes)
        .transpose()?;

    Ok(CompletionChecker::check(
        input.loan_decision.as_deref(),
        attributes.as_deref(),
    ))
}
