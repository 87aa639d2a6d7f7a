//! Page error types.

/// Raw failures from a browser backend, before classification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    /// The document is still loading; the same query may succeed shortly.
    #[error("page still loading: {0}")]
    Loading(String),

    /// The element handle refers to a document that has since changed.
    #[error("stale element: {0}")]
    Stale(String),

    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// A backend command exceeded its own timeout.
    #[error("command timed out: {0}")]
    Timeout(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// Anything else the driver reported.
    #[error("driver error: {0}")]
    Driver(String),

    /// The browser context has been closed.
    #[error("page closed")]
    Closed,
}

impl PageError {
    /// Failures worth repeating the same query for.
    pub fn is_transient(&self) -> bool {
        matches!(self, PageError::Loading(_) | PageError::Stale(_))
    }
}
