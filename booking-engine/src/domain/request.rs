//! The booking request handed to the engine by the language extractor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{FareClass, StationCode};

/// Maximum passengers on one standard booking.
pub const MAX_PASSENGERS: u8 = 6;

/// Maximum passengers on one quick-release booking.
pub const MAX_QUICK_RELEASE_PASSENGERS: u8 = 4;

/// Reasons a request is rejected before any browser work starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRequest {
    #[error("source and destination are both {0}")]
    SameStation(StationCode),

    #[error("fare-class priority list is empty")]
    EmptyClassPriority,

    #[error("fare class {0} appears more than once in the priority list")]
    DuplicateClass(FareClass),

    #[error("passenger count {count} is outside 1..={max}")]
    PassengerCount { count: u8, max: u8 },

    #[error("passenger count is {count} but the roster lists {roster}")]
    RosterMismatch { count: u8, roster: usize },

    #[error("passenger {index} has an empty name")]
    EmptyName { index: usize },

    #[error("passenger {index} has implausible age {age}")]
    Age { index: usize, age: u8 },

    #[error("journey date {0} is in the past")]
    DateInPast(NaiveDate),
}

/// Time-of-day preference for departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePreference {
    Morning,
    Afternoon,
    Evening,
    Night,
    #[default]
    Any,
}

/// Whether the booking targets the time-gated quick-release quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingMode {
    #[default]
    Standard,
    QuickRelease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Transgender,
}

impl Gender {
    /// Option label on the passenger form.
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Transgender => "Transgender",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BerthPreference {
    #[default]
    NoPreference,
    Lower,
    Middle,
    Upper,
    SideLower,
    SideUpper,
}

impl BerthPreference {
    /// Option label on the passenger form, `None` when the field is left alone.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            BerthPreference::NoPreference => None,
            BerthPreference::Lower => Some("Lower"),
            BerthPreference::Middle => Some("Middle"),
            BerthPreference::Upper => Some("Upper"),
            BerthPreference::SideLower => Some("Side Lower"),
            BerthPreference::SideUpper => Some("Side Upper"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    #[serde(default)]
    pub berth: BerthPreference,
}

/// A validated request to book tickets.
///
/// The engine wraps accepted requests in an `Arc` and never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub source: StationCode,
    pub destination: StationCode,
    pub journey_date: NaiveDate,
    /// Acceptable classes, most preferred first.
    pub class_priority: Vec<FareClass>,
    #[serde(default)]
    pub time_preference: TimePreference,
    #[serde(default)]
    pub mode: BookingMode,
    pub passenger_count: u8,
    pub passengers: Vec<Passenger>,
    /// Precomputed classes to try after the priority list is exhausted.
    #[serde(default)]
    pub fallback_classes: Vec<FareClass>,
}

impl BookingRequest {
    /// The most preferred class.
    ///
    /// Only meaningful on a validated request, where the list is non-empty.
    pub fn top_class(&self) -> Option<FareClass> {
        self.class_priority.first().copied()
    }

    /// Check the request against everything that can be known offline.
    pub fn validate(&self, today: NaiveDate) -> Result<(), InvalidRequest> {
        if self.source == self.destination {
            return Err(InvalidRequest::SameStation(self.source));
        }

        if self.class_priority.is_empty() {
            return Err(InvalidRequest::EmptyClassPriority);
        }

        for (i, class) in self.class_priority.iter().enumerate() {
            if self.class_priority[..i].contains(class) {
                return Err(InvalidRequest::DuplicateClass(*class));
            }
        }

        let max = match self.mode {
            BookingMode::Standard => MAX_PASSENGERS,
            BookingMode::QuickRelease => MAX_QUICK_RELEASE_PASSENGERS,
        };
        if self.passenger_count == 0 || self.passenger_count > max {
            return Err(InvalidRequest::PassengerCount {
                count: self.passenger_count,
                max,
            });
        }

        if self.passengers.len() != self.passenger_count as usize {
            return Err(InvalidRequest::RosterMismatch {
                count: self.passenger_count,
                roster: self.passengers.len(),
            });
        }

        for (index, passenger) in self.passengers.iter().enumerate() {
            if passenger.name.trim().is_empty() {
                return Err(InvalidRequest::EmptyName { index });
            }
            if passenger.age == 0 || passenger.age > 125 {
                return Err(InvalidRequest::Age {
                    index,
                    age: passenger.age,
                });
            }
        }

        if self.journey_date < today {
            return Err(InvalidRequest::DateInPast(self.journey_date));
        }

        Ok(())
    }
}
