//! Booking phases.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phases of a booking run, in their only permitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Search,
    Select,
    ClassConfigure,
    Authenticate,
    PassengerDetails,
    PaymentHandoff,
    Completed,
    Aborted,
}

impl Phase {
    /// Position in the forward sequence. Both terminal phases share the
    /// last position.
    pub fn ordinal(&self) -> u8 {
        match self {
            Phase::Search => 0,
            Phase::Select => 1,
            Phase::ClassConfigure => 2,
            Phase::Authenticate => 3,
            Phase::PassengerDetails => 4,
            Phase::PaymentHandoff => 5,
            Phase::Completed | Phase::Aborted => 6,
        }
    }

    /// The phase a successful step leads to.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Search => Some(Phase::Select),
            Phase::Select => Some(Phase::ClassConfigure),
            Phase::ClassConfigure => Some(Phase::Authenticate),
            Phase::Authenticate => Some(Phase::PassengerDetails),
            Phase::PassengerDetails => Some(Phase::PaymentHandoff),
            Phase::PaymentHandoff => Some(Phase::Completed),
            Phase::Completed | Phase::Aborted => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Search => "search",
            Phase::Select => "select",
            Phase::ClassConfigure => "class_configure",
            Phase::Authenticate => "authenticate",
            Phase::PassengerDetails => "passenger_details",
            Phase::PaymentHandoff => "payment_handoff",
            Phase::Completed => "completed",
            Phase::Aborted => "aborted",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
