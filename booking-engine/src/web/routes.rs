//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::engine::{BookingResult, EngineError, Resolution, RunId};
use crate::page::PageFactory;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router<F: PageFactory>(state: AppState<F>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/runs", get(list_runs::<F>).post(start_run::<F>))
        .route("/runs/:id", get(get_run::<F>).delete(close_run::<F>))
        .route("/runs/:id/resume", post(resume_run::<F>))
        .route("/runs/:id/refresh", post(refresh_run::<F>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn list_runs<F: PageFactory>(State(state): State<AppState<F>>) -> Json<RunList> {
    Json(RunList {
        runs: state.engine.runs(),
    })
}

/// Validate a request and start booking it.
async fn start_run<F: PageFactory>(
    State(state): State<AppState<F>>,
    Json(req): Json<StartRunRequest>,
) -> Result<(StatusCode, Json<BookingResult>), AppError> {
    let result = match req.run_id {
        Some(id) => state.engine.start_with_id(id, req.request).await?,
        None => state.engine.start(req.request).await?,
    };
    Ok((StatusCode::CREATED, Json(result)))
}

async fn get_run<F: PageFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<RunId>,
) -> Result<Json<BookingResult>, AppError> {
    Ok(Json(state.engine.status(id)?))
}

/// Answer a run's suspension.
async fn resume_run<F: PageFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<RunId>,
    Json(resolution): Json<Resolution>,
) -> Result<Json<BookingResult>, AppError> {
    Ok(Json(state.engine.resume(id, resolution).await?))
}

/// Check whether a payment-ready run has been confirmed.
async fn refresh_run<F: PageFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<RunId>,
) -> Result<Json<BookingResult>, AppError> {
    Ok(Json(state.engine.refresh(id).await?))
}

async fn close_run<F: PageFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<RunId>,
) -> Result<Json<BookingResult>, AppError> {
    Ok(Json(state.engine.close(id).await?))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Conflict { message: String },
    BadGateway { message: String },
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        let message = e.to_string();
        match e {
            EngineError::UnknownRun(_) => AppError::NotFound { message },
            EngineError::InvalidRequest(_) | EngineError::UnknownCandidate { .. } => {
                AppError::BadRequest { message }
            }
            EngineError::DuplicateRun(_) | EngineError::ResolutionMismatch { .. } => {
                AppError::Conflict { message }
            }
            EngineError::Browser(_) => AppError::BadGateway { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Conflict { message } => (StatusCode::CONFLICT, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
