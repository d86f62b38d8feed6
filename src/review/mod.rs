mod attribute;
mod completion;
mod review_type;
mod status;

pub use attribute::{
    AttributeDecision, DecisionValue, allowed_decisions, decision_error_message, parse_attribute,
    validate_decision,
};
pub use completion::{BlockingReason, Completion, CompletionChecker};
pub use review_type::{ALLOWED_REVIEW_TYPES, ReviewTypeValidator};
pub use status::{DecisionTally, LoanStatus, StatusEngine};
