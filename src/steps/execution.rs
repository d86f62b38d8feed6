//! Parking and resuming an orchestration execution by task token.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{WorkflowSteps, require};
use crate::audit::AuditScope;
use crate::error::StepError;
use crate::store::{WorkflowState, WorkflowStatus};

pub const EXECUTION_SUSPENDED: &str = "ExecutionSuspended";

const DEFAULT_FAILURE_ERROR: &str = "WorkflowFailed";
const DEFAULT_FAILURE_CAUSE: &str = "Execution aborted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeOutcome {
    Success,
    Failure,
}

impl ResumeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeOutcome::Success => "success",
            ResumeOutcome::Failure => "failure",
        }
    }

    fn final_status(&self) -> WorkflowStatus {
        match self {
            ResumeOutcome::Success => WorkflowStatus::Completed,
            ResumeOutcome::Failure => WorkflowStatus::Failed,
        }
    }
}

impl fmt::Display for ResumeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResumeOutcome {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ResumeOutcome::Success),
            "failure" => Ok(ResumeOutcome::Failure),
            other => Err(StepError::Invalid(format!(
                "Invalid outcome: '{other}'. Must be one of: success, failure"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendInput {
    #[serde(default)]
    pub request_number: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub loan_number: Option<String>,
    #[serde(default)]
    pub task_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeInput {
    #[serde(default)]
    pub loan_number: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub request_number: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    /// Payload handed back to the engine on success.
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutput {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkflowStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutput {
    fn ok(state: &WorkflowState) -> Self {
        Self {
            success: true,
            request_number: Some(state.request_number.clone()),
            loan_number: Some(state.loan_number.clone()),
            execution_id: Some(state.execution_id.clone()),
            status: Some(state.status),
            error: None,
        }
    }

    fn failed(
        request_number: Option<String>,
        loan_number: Option<String>,
        err: &StepError,
    ) -> Self {
        Self {
            success: false,
            request_number,
            loan_number,
            execution_id: None,
            status: None,
            error: Some(err.to_string()),
        }
    }
}

impl WorkflowSteps {
    /// Parks the execution: stores the task token and marks the state suspended.
    pub async fn suspend_execution(&self, input: SuspendInput) -> ExecutionOutput {
        match self.try_suspend(&input).await {
            Ok(state) => {
                info!(
                    request_number = %state.request_number,
                    execution_id = %state.execution_id,
                    "Execution suspended"
                );
                ExecutionOutput::ok(&state)
            }
            Err(err) => {
                warn!(error = %err, "Suspend execution failed");
                ExecutionOutput::failed(input.request_number, input.loan_number, &err)
            }
        }
    }

    async fn try_suspend(&self, input: &SuspendInput) -> Result<WorkflowState, StepError> {
        let request_number = require(&input.request_number, "requestNumber")?;
        let execution_id = require(&input.execution_id, "executionId")?;
        let task_token = require(&input.task_token, "taskToken")?;

        let mut state = self
            .states
            .find_by_key(request_number, execution_id)
            .await?
            .ok_or_else(|| {
                StepError::Invalid(format!(
                    "No workflow state found for request {request_number} execution {execution_id}"
                ))
            })?;

        state.task_token = Some(task_token.to_string());
        state.status = WorkflowStatus::Suspended;
        let saved = self.states.save(&state).await?;

        self.audit
            .record(scope(&saved), EXECUTION_SUSPENDED, None, Utc::now())
            .await;
        Ok(saved)
    }

    /// Resumes or aborts a parked execution through the task notifier.
    ///
    /// The notifier is called before the state is updated; its failure is
    /// reported and nothing is written. The token is not retried.
    pub async fn resume_execution(&self, input: ResumeInput) -> ExecutionOutput {
        match self.try_resume(&input).await {
            Ok(state) => {
                info!(
                    request_number = %state.request_number,
                    execution_id = %state.execution_id,
                    status = %state.status,
                    "Execution resumed"
                );
                ExecutionOutput::ok(&state)
            }
            Err(err) => {
                warn!(error = %err, "Resume execution failed");
                ExecutionOutput::failed(input.request_number, input.loan_number, &err)
            }
        }
    }

    async fn try_resume(&self, input: &ResumeInput) -> Result<WorkflowState, StepError> {
        let loan_number = require(&input.loan_number, "loanNumber")?;
        let outcome: ResumeOutcome = require(&input.outcome, "outcome")?.parse()?;

        // Both halves of the key, or neither.
        let found = match (input.request_number.as_deref(), input.execution_id.as_deref()) {
            (Some(request_number), Some(execution_id)) => {
                self.states.find_by_key(request_number, execution_id).await?
            }
            (Some(_), None) => return Err(StepError::MissingField("executionId")),
            (None, Some(_)) => return Err(StepError::MissingField("requestNumber")),
            (None, None) => self.states.find_most_recent_by_loan_number(loan_number).await?,
        };
        let mut state = found.ok_or_else(|| {
            StepError::Invalid(format!("No workflow state found for loan {loan_number}"))
        })?;
        let task_token = state.task_token.clone().ok_or_else(|| {
            StepError::Invalid(format!(
                "No task token stored for request {} execution {}",
                state.request_number, state.execution_id
            ))
        })?;

        debug!(
            request_number = %state.request_number,
            %outcome,
            "Notifying orchestration engine"
        );
        let notified = match outcome {
            ResumeOutcome::Success => {
                let output = input
                    .output
                    .clone()
                    .unwrap_or_else(|| default_success_output(&state));
                self.notifier.notify_success(&task_token, &output).await
            }
            ResumeOutcome::Failure => {
                self.notifier
                    .notify_failure(
                        &task_token,
                        input.error.as_deref().unwrap_or(DEFAULT_FAILURE_ERROR),
                        failure_cause(input),
                    )
                    .await
            }
        };
        notified.map_err(|e| {
            StepError::Internal(format!("failed to notify orchestration engine: {e}"))
        })?;

        state.task_token = None;
        state.status = outcome.final_status();
        let saved = self.states.save(&state).await?;

        match outcome {
            ResumeOutcome::Success => {
                let final_status = saved
                    .loan_status
                    .map(|s| s.as_str())
                    .unwrap_or(WorkflowStatus::Completed.as_str());
                self.audit
                    .workflow_completed(scope(&saved), final_status)
                    .await;
            }
            ResumeOutcome::Failure => {
                self.audit
                    .workflow_error(scope(&saved), failure_cause(input))
                    .await;
            }
        }
        Ok(saved)
    }
}

fn scope(state: &WorkflowState) -> AuditScope<'_> {
    AuditScope {
        request_number: &state.request_number,
        loan_number: &state.loan_number,
        execution_id: &state.execution_id,
    }
}

fn failure_cause(input: &ResumeInput) -> &str {
    input.cause.as_deref().unwrap_or(DEFAULT_FAILURE_CAUSE)
}

fn default_success_output(state: &WorkflowState) -> Value {
    json!({
        "requestNumber": state.request_number,
        "loanNumber": state.loan_number,
        "executionId": state.execution_id,
        "loanStatus": state.loan_status,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::review::LoanStatus;
    use crate::steps::test_support::{RecordingNotifier, steps, steps_with};
    use crate::store::{MemoryStore, StateStore};

    async fn seeded(store: &MemoryStore, request: &str, execution: &str) -> WorkflowState {
        store
            .save(&WorkflowState::new(request, execution, "LOAN-1", "LDCReview"))
            .await
            .unwrap()
    }

    fn suspend(token: &str) -> SuspendInput {
        SuspendInput {
            request_number: Some("REQ-1".into()),
            execution_id: Some("exec-1".into()),
            task_token: Some(token.into()),
            ..Default::default()
        }
    }

    fn resume(outcome: &str) -> ResumeInput {
        ResumeInput {
            loan_number: Some("LOAN-1".into()),
            outcome: Some(outcome.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn suspend_stores_token() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, "REQ-1", "exec-1").await;

        let out = steps(store.clone()).suspend_execution(suspend("tok-1")).await;
        assert!(out.success);
        assert_eq!(out.status, Some(WorkflowStatus::Suspended));

        let state = store.find_by_key("REQ-1", "exec-1").await.unwrap().unwrap();
        assert!(state.is_suspended());
        assert_eq!(state.task_token.as_deref(), Some("tok-1"));

        let audit = store.audit_entries().await;
        assert_eq!(audit.last().unwrap().state_change, EXECUTION_SUSPENDED);
    }

    #[tokio::test]
    async fn suspend_unknown_state_fails() {
        let store = Arc::new(MemoryStore::new());
        let out = steps(store).suspend_execution(suspend("tok-1")).await;
        assert!(!out.success);
        assert!(out.error.unwrap().starts_with("No workflow state found"));
    }

    #[tokio::test]
    async fn resume_success_completes_most_recent_state() {
        let store = Arc::new(MemoryStore::new());
        let mut state = seeded(&store, "REQ-1", "exec-1").await;
        state.loan_status = Some(LoanStatus::Approved);
        store.save(&state).await.unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let steps = steps_with(store.clone(), notifier.clone());
        steps.suspend_execution(suspend("tok-1")).await;

        let out = steps.resume_execution(resume("success")).await;
        assert!(out.success, "{:?}", out.error);
        assert_eq!(out.status, Some(WorkflowStatus::Completed));
        assert_eq!(*notifier.calls.lock().unwrap(), vec!["success:tok-1".to_string()]);

        let state = store.find_by_key("REQ-1", "exec-1").await.unwrap().unwrap();
        assert!(state.task_token.is_none());
        assert_eq!(state.status, WorkflowStatus::Completed);

        let last = store.audit_entries().await.pop().unwrap();
        assert_eq!(last.state_change, crate::audit::WORKFLOW_COMPLETED);
        assert_eq!(last.details.as_deref(), Some("finalStatus=Approved"));
    }

    #[tokio::test]
    async fn resume_failure_uses_defaults() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, "REQ-1", "exec-1").await;
        let notifier = Arc::new(RecordingNotifier::default());
        let steps = steps_with(store.clone(), notifier.clone());
        steps.suspend_execution(suspend("tok-9")).await;

        let mut input = resume("failure");
        input.request_number = Some("REQ-1".into());
        input.execution_id = Some("exec-1".into());
        let out = steps.resume_execution(input).await;

        assert_eq!(out.status, Some(WorkflowStatus::Failed));
        assert_eq!(
            *notifier.calls.lock().unwrap(),
            vec!["failure:tok-9:WorkflowFailed".to_string()]
        );
        let last = store.audit_entries().await.pop().unwrap();
        assert_eq!(last.details.as_deref(), Some("error=Execution aborted"));
    }

    #[tokio::test]
    async fn resume_without_token_fails_without_notifying() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, "REQ-1", "exec-1").await;
        let notifier = Arc::new(RecordingNotifier::default());

        let out = steps_with(store, notifier.clone())
            .resume_execution(resume("success"))
            .await;
        assert!(!out.success);
        assert!(out.error.unwrap().starts_with("No task token stored"));
        assert!(notifier.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_notification_leaves_state_suspended() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, "REQ-1", "exec-1").await;
        let notifier = Arc::new(RecordingNotifier {
            reject: true,
            ..Default::default()
        });
        let steps = steps_with(store.clone(), notifier);
        steps.suspend_execution(suspend("tok-1")).await;

        let out = steps.resume_execution(resume("success")).await;
        assert!(!out.success);
        assert!(
            out.error
                .unwrap()
                .starts_with("Internal error: failed to notify orchestration engine")
        );

        let state = store.find_by_key("REQ-1", "exec-1").await.unwrap().unwrap();
        assert!(state.is_suspended());
        assert_eq!(state.task_token.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn partial_key_does_not_resume_another_request() {
        let store = Arc::new(MemoryStore::new());
        seeded(&store, "REQ-1", "exec-1").await;
        let notifier = Arc::new(RecordingNotifier::default());
        let steps = steps_with(store.clone(), notifier.clone());
        steps.suspend_execution(suspend("tok-1")).await;

        let mut input = resume("success");
        input.request_number = Some("REQ-2".into());
        let out = steps.resume_execution(input).await;
        assert!(!out.success);
        assert_eq!(out.error.as_deref(), Some("Missing required field: executionId"));

        let mut input = resume("success");
        input.execution_id = Some("exec-1".into());
        let out = steps.resume_execution(input).await;
        assert_eq!(out.error.as_deref(), Some("Missing required field: requestNumber"));

        assert!(notifier.calls.lock().unwrap().is_empty());
        let state = store.find_by_key("REQ-1", "exec-1").await.unwrap().unwrap();
        assert!(state.is_suspended());
    }

    #[tokio::test]
    async fn unknown_outcome_is_rejected() {
        let out = steps(Arc::new(MemoryStore::new()))
            .resume_execution(resume("maybe"))
            .await;
        assert!(!out.success);
        assert_eq!(
            out.error.as_deref(),
            Some("Invalid outcome: 'maybe'. Must be one of: success, failure")
        );
    }
}
