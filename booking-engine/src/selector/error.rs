//! Selector error types.

use std::path::PathBuf;

use crate::page::PageError;

/// Failure to resolve a logical target to a live element.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Every strategy was tried and none matched.
    #[error("element not found for `{target}` (tried: {})", .attempted.join("; "))]
    ElementNotFound {
        target: String,
        attempted: Vec<String>,
    },

    /// The overall deadline expired before the strategies were exhausted.
    #[error("timed out resolving `{target}` (tried: {})", .attempted.join("; "))]
    Timeout {
        target: String,
        attempted: Vec<String>,
    },

    /// The selector table has no strategies for this target.
    #[error("no locator strategies configured for `{target}`")]
    EmptySpec { target: String },

    /// The page failed in a way no strategy can route around.
    #[error("page failure resolving `{target}`: {source}")]
    Page { target: String, source: PageError },
}

impl ResolveError {
    pub fn target(&self) -> &str {
        match self {
            ResolveError::ElementNotFound { target, .. }
            | ResolveError::Timeout { target, .. }
            | ResolveError::EmptySpec { target }
            | ResolveError::Page { target, .. } => target,
        }
    }
}

/// Failure to load a selector table.
#[derive(Debug, thiserror::Error)]
pub enum SelectorTableError {
    #[error("failed to read selector table {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid selector table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("selector table entry `{0}` has no strategies")]
    Empty(String),
}
