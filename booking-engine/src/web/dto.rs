//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::BookingRequest;
use crate::engine::RunId;

/// Request to start a booking run.
#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    /// Caller-chosen id; the engine assigns one when absent
    #[serde(default)]
    pub run_id: Option<RunId>,

    #[serde(flatten)]
    pub request: BookingRequest,
}

/// Ids of every known run.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunList {
    pub runs: Vec<RunId>,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
