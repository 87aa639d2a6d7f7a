//! Booking state machine and the engine that runs it.
//!
//! A run walks `Search → Select → ClassConfigure → Authenticate →
//! PassengerDetails → PaymentHandoff` and ends in `Completed` or
//! `Aborted`. Steps that need a human (an ambiguous choice of train, a
//! verification challenge, form fields with no automatable input) park the
//! run until [`Engine::resume`] is called with a matching [`Resolution`].

mod config;
mod error;
mod phase;
mod result;
mod run;
mod service;
mod state;

pub use config::{Credentials, EngineConfig, LocationMarkers};
pub use error::EngineError;
pub use phase::Phase;
pub use result::{BookingResult, Choice, Resolution, RunId, RunStatus};
pub use service::Engine;
pub use state::{BookingState, Event, HistoryEntry, SuspendReason, Suspension, TransitionError};
