//! Timetable API response DTOs and the domain view of them.

use chrono::NaiveTime;
use serde::Deserialize;
use tracing::debug;

use crate::domain::TrainNumber;

/// Envelope of every timetable API response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    /// Present when `success` is false.
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
}

/// One train in a `trains/between` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainBetween {
    pub train_number: String,
    pub train_name: Option<String>,
    pub from_station_schedule: Option<StopSchedule>,
    pub to_station_schedule: Option<StopSchedule>,
}

/// Times at one stop, in minutes after midnight of the first day.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSchedule {
    pub departure_minutes: Option<u32>,
    pub arrival_minutes: Option<u32>,
}

/// A timetabled train between two stations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTrain {
    pub number: TrainNumber,
    pub name: String,
    pub departure: Option<NaiveTime>,
    pub arrival: Option<NaiveTime>,
}

impl ScheduledTrain {
    /// Convert a wire entry. Entries without a usable train number are
    /// dropped.
    pub fn from_wire(train: &TrainBetween) -> Option<Self> {
        let number = match TrainNumber::parse(train.train_number.trim()) {
            Ok(number) => number,
            Err(e) => {
                debug!(raw = %train.train_number, error = %e, "dropping timetable entry");
                return None;
            }
        };
        Some(Self {
            number,
            name: train.train_name.clone().unwrap_or_default(),
            departure: train
                .from_station_schedule
                .as_ref()
                .and_then(|s| s.departure_minutes)
                .and_then(minutes_to_time),
            arrival: train
                .to_station_schedule
                .as_ref()
                .and_then(|s| s.arrival_minutes)
                .and_then(minutes_to_time),
        })
    }
}

/// Minutes after midnight, wrapping multi-day journeys onto the clock.
fn minutes_to_time(minutes: u32) -> Option<NaiveTime> {
    let minutes = minutes % (24 * 60);
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}
