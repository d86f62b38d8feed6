pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::StepFunctionsNotifier;
pub use error::NotifierError;
pub use types::{SendTaskFailureRequest, SendTaskSuccessRequest};

/// Signals a suspended execution, identified only by its task token, to
/// resume or abort. One outbound call per signal and no retries.
#[async_trait]
pub trait TaskNotifier: Send + Sync {
    async fn notify_success(
        &self,
        task_token: &str,
        output: &serde_json::Value,
    ) -> Result<(), NotifierError>;

    async fn notify_failure(
        &self,
        task_token: &str,
        error: &str,
        cause: &str,
    ) -> Result<(), NotifierError>;
}
