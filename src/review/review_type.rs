//! Allow-list check for the review classification tag.

/// Review types accepted by the workflow. Matching is case-sensitive and
/// nothing is trimmed.
pub const ALLOWED_REVIEW_TYPES: [&str; 3] = ["LDCReview", "SecPolicyReview", "ConduitReview"];

pub struct ReviewTypeValidator;

impl ReviewTypeValidator {
    pub fn is_valid(review_type: &str) -> bool {
        ALLOWED_REVIEW_TYPES.contains(&review_type)
    }

    pub fn allowed() -> Vec<String> {
        ALLOWED_REVIEW_TYPES.iter().map(|s| s.to_string()).collect()
    }

    pub fn error_message(review_type: &str) -> String {
        format!(
            "Invalid review type: '{review_type}'. Must be one of: {}",
            ALLOWED_REVIEW_TYPES.join(", ")
        )
    }
}
