//! Raw step failures and their classification.

use crate::page::PageError;
use crate::selector::ResolveError;
use crate::timing::TimingError;

use super::kind::ErrorKind;

/// Everything a phase step can fail with, before recovery decides what
/// to do about it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error("human verification challenge detected at `{target}`")]
    Challenge { target: String },

    #[error("required fields need manual input: {}", .fields.join(", "))]
    ManualInput { fields: Vec<String> },

    #[error("session expired (at {url})")]
    SessionExpired { url: String },

    #[error("unexpected redirect to {url}")]
    Redirect { url: String },

    #[error("{0}")]
    Validation(String),

    #[error("results view lists no usable candidates")]
    NoCandidates,

    #[error(transparent)]
    Timing(#[from] TimingError),

    #[error("run cancelled")]
    Cancelled,
}

impl StepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Resolve(e) => match e {
                ResolveError::ElementNotFound { .. } | ResolveError::EmptySpec { .. } => {
                    ErrorKind::ElementNotFound
                }
                ResolveError::Timeout { .. } => ErrorKind::Timeout,
                ResolveError::Page { source, .. } => page_kind(source),
            },
            StepError::Page(e) => page_kind(e),
            StepError::Challenge { .. } | StepError::ManualInput { .. } => {
                ErrorKind::ManualChallengeDetected
            }
            StepError::SessionExpired { .. } => ErrorKind::SessionExpired,
            StepError::Redirect { .. } => ErrorKind::UnexpectedRedirect,
            StepError::Validation(_) => ErrorKind::ValidationError,
            StepError::NoCandidates => ErrorKind::ElementNotFound,
            StepError::Timing(TimingError::Cancelled) | StepError::Cancelled => ErrorKind::Timeout,
            StepError::Timing(_) => ErrorKind::ValidationError,
        }
    }

    /// Logical selector target involved, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            StepError::Resolve(e) => Some(e.target()),
            StepError::Challenge { target } => Some(target),
            _ => None,
        }
    }

    /// Failures no retry can fix even though their kind is otherwise
    /// retried: an empty selector spec, a closed browser, cancellation.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            StepError::Resolve(ResolveError::EmptySpec { .. })
                | StepError::Resolve(ResolveError::Page {
                    source: PageError::Closed,
                    ..
                })
                | StepError::Page(PageError::Closed)
                | StepError::Timing(TimingError::Cancelled)
                | StepError::Cancelled
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            StepError::Cancelled | StepError::Timing(TimingError::Cancelled)
        )
    }
}

fn page_kind(error: &PageError) -> ErrorKind {
    match error {
        PageError::NoSuchElement(_) => ErrorKind::ElementNotFound,
        PageError::Loading(_)
        | PageError::Stale(_)
        | PageError::Timeout(_)
        | PageError::Navigation { .. }
        | PageError::Driver(_)
        | PageError::Closed => ErrorKind::Timeout,
    }
}
