//! Timing controller for quick-release bookings.

mod clock;
mod gate;
mod policy;

pub use clock::{AnchoredClock, Clock, SystemClock};
pub use gate::{GateOutcome, TimingController, TimingError};
pub use policy::{OpeningRule, QuickReleasePolicy};
