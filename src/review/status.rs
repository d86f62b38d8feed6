use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::attribute::{AttributeDecision, DecisionValue};

/// Aggregate loan status folded from all attribute decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Repurchase,
    #[serde(rename = "Reclass Approved")]
    ReclassApproved,
    #[serde(rename = "Partially Approved")]
    PartiallyApproved,
    Approved,
    Rejected,
    Unknown,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Repurchase => "Repurchase",
            LoanStatus::ReclassApproved => "Reclass Approved",
            LoanStatus::PartiallyApproved => "Partially Approved",
            LoanStatus::Approved => "Approved",
            LoanStatus::Rejected => "Rejected",
            LoanStatus::Unknown => "Unknown",
        }
    }

    /// A reclass result opens a timed confirmation window that must be tracked.
    pub fn requires_reclass_tracking(&self) -> bool {
        matches!(self, LoanStatus::ReclassApproved)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-value counts of decided attributes. Undecided attributes are counted
/// separately and never influence the status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecisionTally {
    pub approved: usize,
    pub rejected: usize,
    pub reclass: usize,
    pub repurchase: usize,
    pub undecided: usize,
}

impl DecisionTally {
    pub fn from_attributes(attributes: &[AttributeDecision]) -> Self {
        let mut tally = Self::default();
        for attr in attributes {
            match attr.decision {
                None | Some(DecisionValue::Pending) => tally.undecided += 1,
                Some(DecisionValue::Approved) => tally.approved += 1,
                Some(DecisionValue::Rejected) => tally.rejected += 1,
                Some(DecisionValue::Reclass) => tally.reclass += 1,
                Some(DecisionValue::Repurchase) => tally.repurchase += 1,
            }
        }
        tally
    }
}

/// Folds attribute decisions into one [`LoanStatus`].
pub struct StatusEngine;

impl StatusEngine {
    /// Rules are evaluated in order and the first match wins:
    ///
    /// 1. any `Repurchase` → `Repurchase`
    /// 2. any `Reclass` → `Reclass Approved`
    /// 3. at least one `Approved` and one `Rejected` → `Partially Approved`
    /// 4. only `Approved` → `Approved`
    /// 5. only `Rejected` → `Rejected`
    /// 6. otherwise → `Unknown`
    ///
    /// Repurchase/Reclass precedence is provisional business policy.
    pub fn determine(attributes: &[AttributeDecision]) -> LoanStatus {
        if attributes.is_empty() {
            warn!("No attributes provided for status determination");
            return LoanStatus::Unknown;
        }

        let tally = DecisionTally::from_attributes(attributes);
        debug!(
            approved = tally.approved,
            rejected = tally.rejected,
            reclass = tally.reclass,
            repurchase = tally.repurchase,
            undecided = tally.undecided,
            "Status determination tally"
        );

        let status = Self::from_tally(&tally);
        if status == LoanStatus::Unknown {
            warn!("Unable to determine loan status from attributes");
        } else {
            info!(status = %status, "Loan status determined");
        }
        status
    }

    pub fn from_tally(tally: &DecisionTally) -> LoanStatus {
        match tally {
            DecisionTally { repurchase: 1.., .. } => LoanStatus::Repurchase,
            DecisionTally { reclass: 1.., .. } => LoanStatus::ReclassApproved,
            DecisionTally {
                approved: 1..,
                rejected: 1..,
                ..
            } => LoanStatus::PartiallyApproved,
            DecisionTally {
                approved: 1..,
                rejected: 0,
                ..
            } => LoanStatus::Approved,
            DecisionTally {
                approved: 0,
                rejected: 1..,
                ..
            } => LoanStatus::Rejected,
            DecisionTally {
                approved: 0,
                rejected: 0,
                ..
            } => LoanStatus::Unknown,
        }
    }
}
