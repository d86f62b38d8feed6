use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use super::TaskNotifier;
use super::error::NotifierError;
use super::types::{
    SEND_TASK_FAILURE, SEND_TASK_SUCCESS, SendTaskFailureRequest, SendTaskSuccessRequest,
};

const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Default control endpoint for a region.
pub fn regional_endpoint(region: &str) -> String {
    format!("https://states.{region}.amazonaws.com/")
}

pub struct StepFunctionsNotifier {
    client: Client,
    endpoint: String,
}

impl StepFunctionsNotifier {
    pub fn new(
        endpoint: String,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, NotifierError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// Create a notifier pointing at a custom endpoint with default timeouts
    /// (useful for testing).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, NotifierError> {
        Self::new(
            endpoint.into(),
            Duration::from_secs(10),
            Duration::from_secs(30),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", action)
            .body(serde_json::to_vec(body)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            error!(action, status = status.as_u16(), body = %message, "Control API call failed");
            return Err(NotifierError::Api {
                status: status.as_u16(),
                message,
            });
        }

        info!(action, "Control API call succeeded");
        Ok(())
    }
}

#[async_trait]
impl TaskNotifier for StepFunctionsNotifier {
    async fn notify_success(
        &self,
        task_token: &str,
        output: &serde_json::Value,
    ) -> Result<(), NotifierError> {
        let req = SendTaskSuccessRequest {
            task_token: task_token.to_string(),
            output: serde_json::to_string(output)?,
        };
        self.call(SEND_TASK_SUCCESS, &req).await
    }

    async fn notify_failure(
        &self,
        task_token: &str,
        error: &str,
        cause: &str,
    ) -> Result<(), NotifierError> {
        let req = SendTaskFailureRequest {
            task_token: task_token.to_string(),
            error: error.to_string(),
            cause: cause.to_string(),
        };
        self.call(SEND_TASK_FAILURE, &req).await
    }
}
