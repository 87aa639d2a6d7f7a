//! Conversion from raw result entries to validated candidates.
//!
//! Pure functions: no page access, so the parsing rules are tested
//! without a browser.

use chrono::NaiveTime;
use tracing::debug;

use crate::domain::{FareClass, SeatStatus, TrainNumber};

use super::types::{Candidate, ClassAvailability, RawClassCell, RawEntry};

/// Why a raw entry could not become a candidate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("no train number in heading {0:?}")]
    NoTrainNumber(String),

    #[error("invalid time: {0:?}")]
    InvalidTime(String),
}

/// Convert one entry.
///
/// The heading, departure and arrival are required. Class cells with an
/// unrecognised code are dropped individually; an entry whose other
/// optional fields fail to parse keeps them as `None`.
pub fn convert_entry(raw: &RawEntry) -> Result<Candidate, ConversionError> {
    let heading = non_empty(raw.heading.as_deref()).ok_or(ConversionError::MissingField("heading"))?;
    let id = TrainNumber::find_in(heading)
        .ok_or_else(|| ConversionError::NoTrainNumber(heading.to_string()))?;

    let departure = non_empty(raw.departure.as_deref())
        .ok_or(ConversionError::MissingField("departure"))?;
    let departure =
        find_time(departure).ok_or_else(|| ConversionError::InvalidTime(departure.to_string()))?;

    let arrival =
        non_empty(raw.arrival.as_deref()).ok_or(ConversionError::MissingField("arrival"))?;
    let arrival =
        find_time(arrival).ok_or_else(|| ConversionError::InvalidTime(arrival.to_string()))?;

    let classes = raw.classes.iter().filter_map(convert_cell).collect();

    Ok(Candidate {
        name: display_name(heading, &id),
        id,
        departure,
        arrival,
        duration_mins: raw.duration.as_deref().and_then(parse_duration),
        distance_km: raw.distance.as_deref().and_then(first_number),
        classes,
        schedule_verified: None,
    })
}

fn convert_cell(cell: &RawClassCell) -> Option<ClassAvailability> {
    let code = cell.code.as_deref()?;
    let Some(class) = find_class(code) else {
        debug!(code, "skipping class cell with unknown code");
        return None;
    };
    let status = cell
        .status
        .as_deref()
        .map(SeatStatus::parse)
        .unwrap_or(SeatStatus::Unknown);
    Some(ClassAvailability { class, status })
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// The heading without its train number, e.g. `"RAJDHANI EXP"`.
fn display_name(heading: &str, id: &TrainNumber) -> String {
    let name = heading
        .replace(&format!("({id})"), "")
        .replace(id.as_str(), "");
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        heading.trim().to_string()
    } else {
        name
    }
}

/// A fare class code anywhere in the text: the whole text, a
/// parenthesised code, or any standalone token.
fn find_class(text: &str) -> Option<FareClass> {
    if let Ok(class) = FareClass::parse(text) {
        return Some(class);
    }
    text.split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '-' | '|'))
        .filter(|token| !token.is_empty())
        .find_map(|token| FareClass::parse(token).ok())
}

/// First `HH:MM` in the text.
fn find_time(text: &str) -> Option<NaiveTime> {
    text.char_indices().find_map(|(i, _)| {
        if text[..i].ends_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        let rest = &text[i..];
        let colon = rest.find(':')?;
        if colon == 0 || colon > 2 || !rest[..colon].bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let hours: u32 = rest[..colon].parse().ok()?;
        let mins = rest.get(colon + 1..colon + 3)?;
        if !mins.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveTime::from_hms_opt(hours, mins.parse().ok()?, 0)
    })
}

/// Durations appear as `"17:05"` or `"17h 05m"`.
fn parse_duration(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some((h, m)) = text.split_once(':') {
        let h: u32 = h.trim().parse().ok()?;
        let m: u32 = m.trim().get(..2).unwrap_or(m.trim()).parse().ok()?;
        return Some(h * 60 + m);
    }
    let lower = text.to_ascii_lowercase();
    let (h, rest) = match lower.split_once('h') {
        Some((h, rest)) => (h.trim().parse::<u32>().ok()?, rest),
        None => (0, lower.as_str()),
    };
    let m = rest
        .trim()
        .trim_end_matches("min")
        .trim_end_matches('m')
        .trim();
    let m = if m.is_empty() { 0 } else { m.parse::<u32>().ok()? };
    Some(h * 60 + m)
}

fn first_number(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()
}
