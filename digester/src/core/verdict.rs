//! Classification of review-pass responses.

use serde::{Deserialize, Serialize};

const APPROVED_MARKER: &str = "APPROVED";
const CORRECTED_MARKER: &str = "CORRECTED";
const FENCE: &str = "```";
const EXCERPT_CHARS: usize = 100;

/// Outcome of the self-review pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewVerdict {
    /// The reviewer accepted the document as-is.
    Approved,
    /// The reviewer returned a replacement document.
    Corrected(String),
    /// The response matched neither marker; carries a short excerpt for logs.
    Unrecognized(String),
}

/// Stable label recorded in the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictLabel {
    Approved,
    Corrected,
    Unexpected,
}

impl ReviewVerdict {
    pub fn label(&self) -> VerdictLabel {
        match self {
            ReviewVerdict::Approved => VerdictLabel::Approved,
            ReviewVerdict::Corrected(_) => VerdictLabel::Corrected,
            ReviewVerdict::Unrecognized(_) => VerdictLabel::Unexpected,
        }
    }

    /// Pick the document to carry forward: the replacement when corrected,
    /// otherwise the original.
    pub fn resolve(&self, original: &str) -> String {
        match self {
            ReviewVerdict::Corrected(replacement) => replacement.clone(),
            ReviewVerdict::Approved | ReviewVerdict::Unrecognized(_) => original.to_string(),
        }
    }
}

/// Classify the concatenated text of a review response.
pub fn parse_verdict(response: &str) -> ReviewVerdict {
    let response = response.trim();
    if response.starts_with(APPROVED_MARKER) {
        return ReviewVerdict::Approved;
    }
    if let Some(remainder) = response.strip_prefix(CORRECTED_MARKER) {
        return ReviewVerdict::Corrected(strip_fences(remainder.trim()).to_string());
    }
    ReviewVerdict::Unrecognized(response.chars().take(EXCERPT_CHARS).collect())
}

fn strip_fences(text: &str) -> &str {
    let mut body = text;
    if body.starts_with(FENCE) {
        body = match body.find('\n') {
            Some(newline) => &body[newline + 1..],
            None => "",
        };
    }
    if body.ends_with(FENCE)
        && let Some(close) = body.rfind(FENCE)
    {
        body = &body[..close];
    }
    body.trim()
}
