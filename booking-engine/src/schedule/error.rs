//! Timetable client error types.

/// Errors from the timetable API.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Network failure, timeout or similar.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {message}")]
    Json { message: String, body: Option<String> },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("rate limited by timetable API")]
    RateLimited,

    #[error("unauthorized (invalid API key)")]
    Unauthorized,

    #[error("invalid API key format")]
    InvalidKey,
}
