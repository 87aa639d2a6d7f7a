//! Station code types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid station code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station code: {reason}")]
pub struct InvalidStationCode {
    reason: &'static str,
}

const MAX_LEN: usize = 5;

/// A valid station code as used by the reservation site (e.g. `NDLS`, `HWH`).
///
/// Station codes are 2 to 5 uppercase ASCII letters. This type guarantees
/// that any `StationCode` value is valid by construction.
///
/// # Examples
///
/// ```
/// use booking_engine::domain::StationCode;
///
/// let ndls = StationCode::parse("NDLS").unwrap();
/// assert_eq!(ndls.as_str(), "NDLS");
///
/// // Lowercase is rejected unless normalized first
/// assert!(StationCode::parse("ndls").is_err());
/// assert!(StationCode::parse_normalized(" ndls ").is_ok());
///
/// // Wrong length is rejected
/// assert!(StationCode::parse("N").is_err());
/// assert!(StationCode::parse("NEWDEL").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationCode {
    bytes: [u8; MAX_LEN],
    len: u8,
}

impl StationCode {
    /// Parse a station code from a string.
    ///
    /// The input must be 2-5 uppercase ASCII letters (A-Z).
    pub fn parse(s: &str) -> Result<Self, InvalidStationCode> {
        let input = s.as_bytes();

        if input.len() < 2 || input.len() > MAX_LEN {
            return Err(InvalidStationCode {
                reason: "must be 2 to 5 characters",
            });
        }

        if !input.iter().all(u8::is_ascii_uppercase) {
            return Err(InvalidStationCode {
                reason: "must be uppercase ASCII letters A-Z",
            });
        }

        let mut bytes = [0u8; MAX_LEN];
        bytes[..input.len()].copy_from_slice(input);

        Ok(Self {
            bytes,
            len: input.len() as u8,
        })
    }

    /// Parse after trimming whitespace and uppercasing.
    pub fn parse_normalized(s: &str) -> Result<Self, InvalidStationCode> {
        Self::parse(&s.trim().to_ascii_uppercase())
    }

    /// Returns the station code as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII uppercase letters are ever stored.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl TryFrom<String> for StationCode {
    type Error = InvalidStationCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_normalized(&value)
    }
}

impl From<StationCode> for String {
    fn from(code: StationCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Debug for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationCode({})", self.as_str())
    }
}

impl fmt::Display for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Roundtrip: parse then as_str returns the original
        #[test]
        fn roundtrip(s in "[A-Z]{2,5}") {
            let code = StationCode::parse(&s).unwrap();
            prop_assert_eq!(code.as_str(), s.as_str());
        }

        #[test]
        fn lowercase_rejected(s in "[a-z]{2,5}") {
            prop_assert!(StationCode::parse(&s).is_err());
        }

        #[test]
        fn wrong_length_rejected(s in "[A-Z]{0,1}|[A-Z]{6,10}") {
            prop_assert!(StationCode::parse(&s).is_err());
        }

        #[test]
        fn ordering_matches_str(a in "[A-Z]{2,5}", b in "[A-Z]{2,5}") {
            let ca = StationCode::parse(&a).unwrap();
            let cb = StationCode::parse(&b).unwrap();
            prop_assert_eq!(ca == cb, a == b);
        }
    }
}
