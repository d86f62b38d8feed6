use std::fmt;

use super::attribute::AttributeDecision;

/// Why a loan decision is not yet final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockingReason {
    MissingLoanDecision,
    MissingAttributes,
    NoAttributes,
    PendingAttributes(Vec<String>),
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockingReason::MissingLoanDecision => write!(f, "Loan decision is not set"),
            BlockingReason::MissingAttributes => write!(f, "Attributes are missing"),
            BlockingReason::NoAttributes => write!(f, "No attributes to review"),
            BlockingReason::PendingAttributes(names) => {
                write!(f, "Attributes pending decision: {}", names.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Complete,
    Incomplete(Vec<BlockingReason>),
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        matches!(self, Completion::Complete)
    }

    /// Human-readable summary of every blocking reason, `None` when complete.
    pub fn reason(&self) -> Option<String> {
        match self {
            Completion::Complete => None,
            Completion::Incomplete(reasons) => Some(
                reasons
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }
}

/// Decides whether a loan decision is final enough for the workflow to proceed.
pub struct CompletionChecker;

impl CompletionChecker {
    pub fn check(
        loan_decision: Option<&str>,
        attributes: Option<&[AttributeDecision]>,
    ) -> Completion {
        let mut reasons = Vec::new();

        if loan_decision.is_none_or(|d| d.trim().is_empty()) {
            reasons.push(BlockingReason::MissingLoanDecision);
        }

        match attributes {
            None => reasons.push(BlockingReason::MissingAttributes),
            Some([]) => reasons.push(BlockingReason::NoAttributes),
            Some(attrs) => {
                let pending: Vec<String> = attrs
                    .iter()
                    .filter(|a| a.is_undecided())
                    .map(|a| a.name.clone())
                    .collect();
                if !pending.is_empty() {
                    reasons.push(BlockingReason::PendingAttributes(pending));
                }
            }
        }

        if reasons.is_empty() {
            Completion::Complete
        } else {
            Completion::Incomplete(reasons)
        }
    }

    pub fn is_complete(
        loan_decision: Option<&str>,
        attributes: Option<&[AttributeDecision]>,
    ) -> bool {
        Self::check(loan_decision, attributes).is_complete()
    }

    /// Empty string when the decision is complete.
    pub fn incomplete_reason(
        loan_decision: Option<&str>,
        attributes: Option<&[AttributeDecision]>,
    ) -> String {
        Self::check(loan_decision, attributes)
            .reason()
            .unwrap_or_default()
    }
}
