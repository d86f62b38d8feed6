//! Single-purpose workflow steps invoked by the orchestration engine.
//!
//! Each step takes a typed input, returns a typed output, and never fails at
//! the transport level: validation problems, missing fields and internal
//! faults all come back as `success: false` with an `error` message.
//! [`WorkflowSteps::dispatch`] is the JSON entry point and picks the step by
//! the `handlerType` field.

mod audit_trail;
mod completion;
mod execution;
mod notification;
mod review_type;
mod status;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::audit::AuditTrailRecorder;
use crate::error::StepError;
use crate::mailer::Mailer;
use crate::notifier::TaskNotifier;
use crate::parameters::ParameterCache;
use crate::review::{AttributeDecision, parse_attribute};
use crate::store::{AuditSink, ReclassTracker, StateStore};

pub use audit_trail::{AuditTrailInput, AuditTrailOutput};
pub use completion::{CompletionInput, CompletionOutput};
pub use execution::{ExecutionOutput, ResumeInput, ResumeOutcome, SuspendInput};
pub use notification::{NotificationInput, NotificationOutput};
pub use review_type::{ReviewTypeInput, ReviewTypeOutput};
pub use status::{StatusInput, StatusOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerType {
    ReviewTypeValidation,
    LoanStatusDetermination,
    CompletionCriteria,
    AuditTrail,
    EmailNotification,
    SuspendExecution,
    ResumeExecution,
}

impl HandlerType {
    pub const ALL: [HandlerType; 7] = [
        HandlerType::ReviewTypeValidation,
        HandlerType::LoanStatusDetermination,
        HandlerType::CompletionCriteria,
        HandlerType::AuditTrail,
        HandlerType::EmailNotification,
        HandlerType::SuspendExecution,
        HandlerType::ResumeExecution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerType::ReviewTypeValidation => "reviewTypeValidation",
            HandlerType::LoanStatusDetermination => "loanStatusDetermination",
            HandlerType::CompletionCriteria => "completionCriteria",
            HandlerType::AuditTrail => "auditTrail",
            HandlerType::EmailNotification => "emailNotification",
            HandlerType::SuspendExecution => "suspendExecution",
            HandlerType::ResumeExecution => "resumeExecution",
        }
    }
}

impl fmt::Display for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerType {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HandlerType::ALL
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| StepError::Invalid(format!("Unknown handler type: {s}")))
    }
}

/// Attribute as it arrives in step input, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttribute {
    #[serde(default)]
    pub attribute_name: Option<String>,
    #[serde(default)]
    pub attribute_decision: Option<String>,
}

impl RawAttribute {
    pub fn new(name: &str, decision: Option<&str>) -> Self {
        Self {
            attribute_name: Some(name.to_string()),
            attribute_decision: decision.map(str::to_string),
        }
    }
}

pub(crate) fn require<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, StepError> {
    value.as_deref().ok_or(StepError::MissingField(field))
}

/// Validates raw attributes. Entries without a name are skipped.
pub(crate) fn parse_attributes(raw: &[RawAttribute]) -> Result<Vec<AttributeDecision>, StepError> {
    raw.iter()
        .filter_map(|a| {
            a.attribute_name
                .as_deref()
                .map(|name| parse_attribute(name, a.attribute_decision.as_deref()))
        })
        .collect::<Result<Vec<_>, String>>()
        .map_err(StepError::Invalid)
}

fn to_output<T: Serialize>(output: &T) -> Value {
    serde_json::to_value(output)
        .unwrap_or_else(|e| failure_value(&StepError::Internal(e.to_string())))
}

fn failure_value(err: &StepError) -> Value {
    json!({ "success": false, "error": err.to_string() })
}

fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, StepError> {
    Ok(serde_json::from_value(input)?)
}

/// The step catalogue together with its collaborators.
#[derive(Clone)]
pub struct WorkflowSteps {
    states: Arc<dyn StateStore>,
    reclass: Arc<dyn ReclassTracker>,
    audit: AuditTrailRecorder,
    notifier: Arc<dyn TaskNotifier>,
    mailer: Arc<dyn Mailer>,
    parameters: ParameterCache,
}

impl WorkflowSteps {
    pub fn new(
        states: Arc<dyn StateStore>,
        reclass: Arc<dyn ReclassTracker>,
        audit_sink: Arc<dyn AuditSink>,
        notifier: Arc<dyn TaskNotifier>,
        mailer: Arc<dyn Mailer>,
        parameters: ParameterCache,
    ) -> Self {
        Self {
            states,
            reclass,
            audit: AuditTrailRecorder::new(audit_sink),
            notifier,
            mailer,
            parameters,
        }
    }

    /// Wire every store role to one backend.
    pub fn with_store<S>(
        store: Arc<S>,
        notifier: Arc<dyn TaskNotifier>,
        mailer: Arc<dyn Mailer>,
        parameters: ParameterCache,
    ) -> Self
    where
        S: StateStore + AuditSink + ReclassTracker + 'static,
    {
        Self::new(
            store.clone(),
            store.clone(),
            store,
            notifier,
            mailer,
            parameters,
        )
    }

    /// Routes a JSON input to the step named by its `handlerType` field.
    pub async fn dispatch(&self, input: Value) -> Value {
        let handler = match input.get("handlerType").and_then(Value::as_str) {
            Some(name) => name.parse::<HandlerType>(),
            None => Err(StepError::MissingField("handlerType")),
        };
        let handler = match handler {
            Ok(handler) => handler,
            Err(err) => {
                warn!(error = %err, "Rejected step input");
                return failure_value(&err);
            }
        };

        info!(handler = %handler, "Step handler invoked");
        let output = match handler {
            HandlerType::ReviewTypeValidation => match parse_input(input) {
                Ok(input) => to_output(&self.validate_review_type(input).await),
                Err(err) => to_output(&ReviewTypeOutput::failed(None, None, None, &err)),
            },
            HandlerType::LoanStatusDetermination => match parse_input(input) {
                Ok(input) => to_output(&self.determine_status(input).await),
                Err(err) => failure_value(&err),
            },
            HandlerType::CompletionCriteria => match parse_input(input) {
                Ok(input) => to_output(&self.check_completion(input)),
                Err(err) => failure_value(&err),
            },
            HandlerType::AuditTrail => match parse_input(input) {
                Ok(input) => to_output(&self.log_audit_trail(input).await),
                Err(err) => failure_value(&err),
            },
            HandlerType::EmailNotification => match parse_input(input) {
                Ok(input) => to_output(&self.send_notification(input).await),
                Err(err) => failure_value(&err),
            },
            HandlerType::SuspendExecution => match parse_input(input) {
                Ok(input) => to_output(&self.suspend_execution(input).await),
                Err(err) => failure_value(&err),
            },
            HandlerType::ResumeExecution => match parse_input(input) {
                Ok(input) => to_output(&self.resume_execution(input).await),
                Err(err) => failure_value(&err),
            },
        };
        info!(handler = %handler, success = %output["success"], "Step handler finished");
        output
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::steps;
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn handler_type_names_roundtrip() {
        for handler in HandlerType::ALL {
            assert_eq!(handler.as_str().parse::<HandlerType>().unwrap(), handler);
        }
        assert!("ReviewTypeValidation".parse::<HandlerType>().is_err());
    }

    #[test]
    fn nameless_attributes_are_skipped_and_bad_decisions_rejected() {
        let raw = vec![
            RawAttribute::new("CreditScore", Some("Approved")),
            RawAttribute {
                attribute_name: None,
                attribute_decision: Some("Rejected".into()),
            },
            RawAttribute::new("DebtRatio", None),
        ];
        let parsed = parse_attributes(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].name, "DebtRatio");

        let err = parse_attributes(&[RawAttribute::new("X", Some("approved"))]).unwrap_err();
        assert!(err.to_string().starts_with("Invalid attribute decision: 'approved'"));
    }

    #[tokio::test]
    async fn dispatch_requires_handler_type() {
        let steps = steps(Arc::new(MemoryStore::new()));
        let out = steps.dispatch(json!({"requestNumber": "REQ-1"})).await;
        assert_eq!(out["success"], false);
        assert_eq!(out["error"], "Missing required field: handlerType");
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_handler() {
        let steps = steps(Arc::new(MemoryStore::new()));
        let out = steps.dispatch(json!({"handlerType": "vendPpa"})).await;
        assert_eq!(out["success"], false);
        assert_eq!(out["error"], "Unknown handler type: vendPpa");
    }

    #[tokio::test]
    async fn malformed_input_is_an_internal_error_output() {
        let steps = steps(Arc::new(MemoryStore::new()));
        let out = steps
            .dispatch(json!({
                "handlerType": "completionCriteria",
                "requestNumber": "REQ-1",
                "loanNumber": "LOAN-1",
                "attributes": "not a list"
            }))
            .await;
        assert_eq!(out["success"], false);
        assert!(out["error"].as_str().unwrap().starts_with("Internal error: "));
    }
}
