//! Fare classes and per-class seat status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown fare class code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fare class code: {0:?}")]
pub struct InvalidFareClass(pub String);

/// Coarse fare-class grouping used for quick-release opening rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassCategory {
    /// Air-conditioned tiers and chair cars.
    Ac,
    /// Sleeper, second sitting and first class.
    NonAc,
}

/// A seating/amenity tier with independent availability.
///
/// Serialized as the site's short code (e.g. `"3A"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FareClass {
    FirstAc,
    SecondAc,
    ThirdAc,
    ThirdAcEconomy,
    ExecutiveAnubhuti,
    ExecutiveChair,
    ChairCar,
    FirstClass,
    Sleeper,
    SecondSitting,
}

impl FareClass {
    /// Every class the engine knows about.
    pub const ALL: [FareClass; 10] = [
        FareClass::FirstAc,
        FareClass::SecondAc,
        FareClass::ThirdAc,
        FareClass::ThirdAcEconomy,
        FareClass::ExecutiveAnubhuti,
        FareClass::ExecutiveChair,
        FareClass::ChairCar,
        FareClass::FirstClass,
        FareClass::Sleeper,
        FareClass::SecondSitting,
    ];

    /// Parse a class code such as `3A` or `SL`.
    ///
    /// Surrounding whitespace and lowercase input are accepted.
    pub fn parse(code: &str) -> Result<Self, InvalidFareClass> {
        let normalized = code.trim().to_ascii_uppercase();
        FareClass::ALL
            .into_iter()
            .find(|class| class.code() == normalized)
            .ok_or(InvalidFareClass(normalized))
    }

    /// The site's short code for this class.
    pub fn code(&self) -> &'static str {
        match self {
            FareClass::FirstAc => "1A",
            FareClass::SecondAc => "2A",
            FareClass::ThirdAc => "3A",
            FareClass::ThirdAcEconomy => "3E",
            FareClass::ExecutiveAnubhuti => "EA",
            FareClass::ExecutiveChair => "EC",
            FareClass::ChairCar => "CC",
            FareClass::FirstClass => "FC",
            FareClass::Sleeper => "SL",
            FareClass::SecondSitting => "2S",
        }
    }

    pub fn category(&self) -> ClassCategory {
        match self {
            FareClass::FirstClass | FareClass::Sleeper | FareClass::SecondSitting => {
                ClassCategory::NonAc
            }
            _ => ClassCategory::Ac,
        }
    }
}

impl TryFrom<String> for FareClass {
    type Error = InvalidFareClass;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FareClass> for String {
    fn from(class: FareClass) -> Self {
        class.code().to_string()
    }
}

impl fmt::Display for FareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Seat status for one class on one train, as shown on the results view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "count", rename_all = "snake_case")]
pub enum SeatStatus {
    /// Confirmed seats are on sale. The count is absent when the site
    /// just says "AVAILABLE".
    Available(Option<u32>),
    /// Reservation-against-cancellation.
    Rac(Option<u32>),
    /// Waitlisted, with position when shown.
    Waitlist(Option<u32>),
    /// Regret / not available / departed.
    NotAvailable,
    /// Text the parser does not recognise.
    Unknown,
}

impl SeatStatus {
    /// Interpret the site's free-form status text.
    ///
    /// ```
    /// use booking_engine::domain::SeatStatus;
    ///
    /// assert_eq!(SeatStatus::parse("AVAILABLE-0042"), SeatStatus::Available(Some(42)));
    /// assert_eq!(SeatStatus::parse("GNWL12/WL5"), SeatStatus::Waitlist(Some(12)));
    /// assert_eq!(SeatStatus::parse("REGRET"), SeatStatus::NotAvailable);
    /// ```
    pub fn parse(text: &str) -> Self {
        let upper = text.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return SeatStatus::Unknown;
        }

        const CLOSED: [&str; 5] = [
            "REGRET",
            "NOT AVAILABLE",
            "N.A.",
            "DEPARTED",
            "CANCELLED",
        ];
        if CLOSED.iter().any(|marker| upper.contains(marker)) {
            return SeatStatus::NotAvailable;
        }

        let count = first_number(&upper);
        if upper.starts_with("AVAILABLE") || upper.starts_with("AVL") || upper.starts_with("CURR_AVBL")
        {
            SeatStatus::Available(count)
        } else if upper.contains("RAC") {
            SeatStatus::Rac(count)
        } else if upper.contains("WL") {
            SeatStatus::Waitlist(count)
        } else {
            SeatStatus::Unknown
        }
    }

    /// Whether confirmed seats can be bought right now.
    pub fn is_open(&self) -> bool {
        matches!(self, SeatStatus::Available(count) if *count != Some(0))
    }
}

fn first_number(s: &str) -> Option<u32> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
