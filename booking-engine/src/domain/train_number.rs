//! Train number type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid train number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid train number: {reason}")]
pub struct InvalidTrainNumber {
    reason: &'static str,
}

/// A 4 or 5 digit train number (e.g. `12301`).
///
/// Train numbers identify candidates across one search cycle and order
/// them when every other tie-break is equal. Ordering is by numeric value
/// then width, so `02301` sorts before `12301`.
///
/// # Examples
///
/// ```
/// use booking_engine::domain::TrainNumber;
///
/// let rajdhani = TrainNumber::parse("12301").unwrap();
/// assert_eq!(rajdhani.as_str(), "12301");
/// assert!(TrainNumber::parse("123").is_err());
/// assert!(TrainNumber::parse("12A01").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrainNumber(String);

impl TrainNumber {
    pub fn parse(s: &str) -> Result<Self, InvalidTrainNumber> {
        let s = s.trim();
        if s.len() < 4 || s.len() > 5 {
            return Err(InvalidTrainNumber {
                reason: "must be 4 or 5 digits",
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidTrainNumber {
                reason: "must contain only digits",
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Find a train number inside display text such as
    /// `"RAJDHANI EXP (12301)"`.
    pub fn find_in(text: &str) -> Option<Self> {
        text.split(|c: char| !c.is_ascii_digit())
            .find(|run| run.len() == 4 || run.len() == 5)
            .and_then(|run| Self::parse(run).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> u32 {
        self.0.parse().unwrap_or(u32::MAX)
    }
}

impl Ord for TrainNumber {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.numeric()
            .cmp(&other.numeric())
            .then_with(|| self.0.len().cmp(&other.0.len()))
    }
}

impl PartialOrd for TrainNumber {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<String> for TrainNumber {
    type Error = InvalidTrainNumber;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrainNumber> for String {
    fn from(number: TrainNumber) -> Self {
        number.0
    }
}

impl fmt::Debug for TrainNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrainNumber({})", self.0)
    }
}

impl fmt::Display for TrainNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
