use thiserror::Error;

/// Failures of the durable stores (workflow state, audit trail, reclass tracking).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid store configuration: {0}")]
    Config(String),
}

/// Failures while resolving a configuration parameter.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("Configuration parameter not found: {0}")]
    NotFound(String),

    #[error("Failed to retrieve configuration parameter: {0}")]
    Source(String),
}

/// Failures of the outbound email side effect.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Error at the boundary of a workflow step. Always folded into a
/// `success: false` output by the router, never returned to the host.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for StepError {
    fn from(err: StoreError) -> Self {
        StepError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for StepError {
    fn from(err: serde_json::Error) -> Self {
        StepError::Internal(err.to_string())
    }
}

/// Outcome of a best-effort side effect (audit write, reclass record, email).
///
/// Callers inspect it for logging only; control flow never branches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    Applied,
    Failed { reason: String },
}

impl SideEffect {
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        SideEffect::Failed {
            reason: reason.to_string(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, SideEffect::Applied)
    }
}

impl std::fmt::Display for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SideEffect::Applied => write!(f, "applied"),
            SideEffect::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}
