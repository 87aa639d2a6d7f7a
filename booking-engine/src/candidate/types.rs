//! Candidate types.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::{FareClass, SeatStatus, TrainNumber};

/// Fields read from one result entry, before validation.
///
/// Everything is optional: a half-rendered entry yields whatever it has,
/// and conversion decides whether that is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// Heading text, usually `"NAME (12301)"`.
    pub heading: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub duration: Option<String>,
    pub distance: Option<String>,
    pub classes: Vec<RawClassCell>,
}

/// One class cell of a result entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawClassCell {
    /// Cell code text, e.g. `"AC 3 Tier (3A)"` or just `"3A"`.
    pub code: Option<String>,
    pub status: Option<String>,
}

/// Seat status for one class offered by a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAvailability {
    pub class: FareClass,
    pub status: SeatStatus,
}

/// One offered trip parsed from the results view.
///
/// Lives for one search cycle only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: TrainNumber,
    pub name: String,
    pub departure: NaiveTime,
    pub arrival: NaiveTime,
    pub duration_mins: Option<u32>,
    pub distance_km: Option<u32>,
    /// Classes in display order.
    pub classes: Vec<ClassAvailability>,
    /// Whether the schedule source lists this train between the requested
    /// stations. `None` when no cross-check ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_verified: Option<bool>,
}

impl Candidate {
    pub fn status_of(&self, class: FareClass) -> Option<&SeatStatus> {
        self.classes
            .iter()
            .find(|c| c.class == class)
            .map(|c| &c.status)
    }

    /// Whether `class` is offered with confirmed seats on sale.
    pub fn has_open(&self, class: FareClass) -> bool {
        self.status_of(class).is_some_and(SeatStatus::is_open)
    }

    /// Offered classes with open seats, in display order.
    pub fn open_classes(&self) -> impl Iterator<Item = FareClass> + '_ {
        self.classes
            .iter()
            .filter(|c| c.status.is_open())
            .map(|c| c.class)
    }

    pub fn offers(&self, class: FareClass) -> bool {
        self.classes.iter().any(|c| c.class == class)
    }
}

#[cfg(test)]
pub(crate) fn test_candidate(
    id: &str,
    departure: &str,
    classes: &[(FareClass, SeatStatus)],
) -> Candidate {
    Candidate {
        id: TrainNumber::parse(id).unwrap(),
        name: format!("TRAIN {id}"),
        departure: NaiveTime::parse_from_str(departure, "%H:%M").unwrap(),
        arrival: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
        duration_mins: None,
        distance_km: None,
        classes: classes
            .iter()
            .map(|(class, status)| ClassAvailability {
                class: *class,
                status: status.clone(),
            })
            .collect(),
        schedule_verified: None,
    }
}
