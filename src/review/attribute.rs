use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed vocabulary of per-attribute decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionValue {
    Approved,
    Rejected,
    Reclass,
    Repurchase,
    Pending,
}

impl DecisionValue {
    pub const ALL: [DecisionValue; 5] = [
        DecisionValue::Approved,
        DecisionValue::Rejected,
        DecisionValue::Reclass,
        DecisionValue::Repurchase,
        DecisionValue::Pending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionValue::Approved => "Approved",
            DecisionValue::Rejected => "Rejected",
            DecisionValue::Reclass => "Reclass",
            DecisionValue::Repurchase => "Repurchase",
            DecisionValue::Pending => "Pending",
        }
    }
}

impl fmt::Display for DecisionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DecisionValue::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| decision_error_message(s))
    }
}

/// One underwriting factor and its decision. `None` means not yet decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDecision {
    #[serde(rename = "attributeName")]
    pub name: String,
    #[serde(rename = "attributeDecision", default)]
    pub decision: Option<DecisionValue>,
}

impl AttributeDecision {
    pub fn new(name: impl Into<String>, decision: Option<DecisionValue>) -> Self {
        Self {
            name: name.into(),
            decision,
        }
    }

    pub fn decided(name: impl Into<String>, decision: DecisionValue) -> Self {
        Self::new(name, Some(decision))
    }

    /// Unset and `Pending` are the same thing: nobody has decided yet.
    pub fn is_undecided(&self) -> bool {
        matches!(self.decision, None | Some(DecisionValue::Pending))
    }
}

/// Returns true when `value` is an acceptable raw decision.
///
/// `None` is valid (undecided). The empty string and anything outside
/// [`DecisionValue::ALL`] are not. Matching is exact.
pub fn validate_decision(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(s) if s.trim().is_empty() => false,
        Some(s) => s.parse::<DecisionValue>().is_ok(),
    }
}

/// The allow-list in declaration order.
pub fn allowed_decisions() -> Vec<&'static str> {
    DecisionValue::ALL.iter().map(DecisionValue::as_str).collect()
}

pub fn decision_error_message(value: &str) -> String {
    format!(
        "Invalid attribute decision: '{value}'. Must be one of: {}",
        allowed_decisions().join(", ")
    )
}

/// Parses a raw `(name, decision)` pair coming from step input.
pub fn parse_attribute(name: &str, decision: Option<&str>) -> Result<AttributeDecision, String> {
    if !validate_decision(decision) {
        return Err(decision_error_message(decision.unwrap_or_default()));
    }
    let decision = decision.map(str::parse::<DecisionValue>).transpose()?;
    Ok(AttributeDecision::new(name, decision))
}
