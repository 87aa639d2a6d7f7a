//! Errors returned by engine operations.
//!
//! Failures inside a run never surface here; they are classified into the
//! run's history. These are caller mistakes and setup failures.

use crate::domain::{InvalidRequest, TrainNumber};
use crate::page::PageError;

use super::result::RunId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("no run with id {0}")]
    UnknownRun(RunId),

    #[error("a run with id {0} already exists")]
    DuplicateRun(RunId),

    #[error("invalid booking request: {0}")]
    InvalidRequest(#[from] InvalidRequest),

    #[error("could not open a browser page: {0}")]
    Browser(PageError),

    #[error("run {run} offered no candidate {train}")]
    UnknownCandidate { run: RunId, train: TrainNumber },

    #[error("run {run} is waiting for {expected}, not this resolution")]
    ResolutionMismatch { run: RunId, expected: &'static str },
}
