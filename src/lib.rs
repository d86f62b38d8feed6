//! Core of the loan-review workflow: attribute decisions, aggregate status,
//! completion rules, durable workflow state and the steps the orchestration
//! engine invokes.

pub mod audit;
pub mod config;
pub mod error;
pub mod mailer;
pub mod notifier;
pub mod parameters;
pub mod review;
pub mod steps;
pub mod store;
pub mod telemetry;

pub use config::LoanReviewConfig;
pub use error::{SideEffect, StepError, StoreError};
pub use review::{AttributeDecision, DecisionValue, LoanStatus, StatusEngine};
pub use steps::{HandlerType, WorkflowSteps};
pub use store::{FileStore, MemoryStore, WorkflowState, WorkflowStatus};
