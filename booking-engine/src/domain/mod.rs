//! Domain types for the booking engine.
//!
//! All types enforce their invariants at construction time, so code that
//! receives these types can trust their validity.

mod fare_class;
mod request;
mod station;
mod train_number;

pub use fare_class::{ClassCategory, FareClass, InvalidFareClass, SeatStatus};
pub use request::{
    BerthPreference, BookingMode, BookingRequest, Gender, InvalidRequest, MAX_PASSENGERS,
    MAX_QUICK_RELEASE_PASSENGERS, Passenger, TimePreference,
};
pub use station::{InvalidStationCode, StationCode};
pub use train_number::{InvalidTrainNumber, TrainNumber};
