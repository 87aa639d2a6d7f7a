//! Classified failure kinds and records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::Phase;

/// The six failure classes every raw error is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ElementNotFound,
    Timeout,
    ManualChallengeDetected,
    SessionExpired,
    UnexpectedRedirect,
    ValidationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ManualChallengeDetected => "manual_challenge_detected",
            ErrorKind::SessionExpired => "session_expired",
            ErrorKind::UnexpectedRedirect => "unexpected_redirect",
            ErrorKind::ValidationError => "validation_error",
        }
    }

    /// Kinds recovered by retrying the enclosing step.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::ElementNotFound | ErrorKind::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified failure, as kept in a run's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub phase: Phase,
    /// Logical selector target involved, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub detail: String,
    /// Retries of this phase already made when the failure happened.
    pub retry_count: u32,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.kind, self.phase)?;
        if let Some(target) = &self.target {
            write!(f, " at `{target}`")?;
        }
        write!(f, " (retry {}): {}", self.retry_count, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_display() {
        let record = ErrorRecord {
            kind: ErrorKind::Timeout,
            phase: Phase::Search,
            target: Some("search_button".into()),
            detail: "page still loading".into(),
            retry_count: 1,
        };
        assert_eq!(
            record.to_string(),
            "timeout in search at `search_button` (retry 1): page still loading"
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::ManualChallengeDetected).unwrap(),
            "\"manual_challenge_detected\""
        );
        assert!(ErrorKind::ElementNotFound.is_transient());
        assert!(!ErrorKind::SessionExpired.is_transient());
    }
}
