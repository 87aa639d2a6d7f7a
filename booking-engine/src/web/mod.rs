//! HTTP control surface for the booking engine.
//!
//! Thin JSON wrapper over [`Engine`](crate::engine::Engine): start runs,
//! poll them, answer their suspensions and close them.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
