//! Timetable cross-check.
//!
//! The results view on the reservation site is authoritative. A timetable
//! API is consulted only to flag candidates it does not know about, which
//! usually means a misread result entry.

mod cache;
mod client;
mod error;
mod mock;
mod types;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::candidate::Candidate;
use crate::domain::StationCode;

pub use cache::{CacheConfig, CachedScheduleClient};
pub use client::{RailRadarClient, ScheduleConfig};
pub use error::ScheduleError;
pub use mock::StaticSchedule;
pub use types::ScheduledTrain;

/// Anything that can list the trains running between two stations.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn trains_between(
        &self,
        from: StationCode,
        to: StationCode,
    ) -> Result<Vec<ScheduledTrain>, ScheduleError>;
}

/// Mark each candidate as known or unknown to the timetable.
///
/// Never removes a candidate. When the lookup fails the candidates are
/// left unmarked.
pub async fn cross_check(
    source: &dyn ScheduleSource,
    from: StationCode,
    to: StationCode,
    candidates: &mut [Candidate],
) {
    let scheduled = match source.trains_between(from, to).await {
        Ok(scheduled) => scheduled,
        Err(e) => {
            warn!(%from, %to, error = %e, "timetable cross-check unavailable");
            return;
        }
    };

    for candidate in candidates.iter_mut() {
        let entry = scheduled.iter().find(|t| t.number == candidate.id);
        candidate.schedule_verified = Some(entry.is_some());
        match entry {
            None => warn!(train = %candidate.id, "candidate not in timetable"),
            Some(t) if t.departure.is_some_and(|d| d != candidate.departure) => {
                debug!(
                    train = %candidate.id,
                    listed = %candidate.departure,
                    timetabled = ?t.departure,
                    "departure differs from timetable"
                );
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::test_candidate;
    use crate::domain::{FareClass, SeatStatus};

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    #[tokio::test]
    async fn marks_known_and_unknown_trains() {
        let source = StaticSchedule::new().with_route(code("NDLS"), code("HWH"), &["12301"]);
        let mut candidates = vec![
            test_candidate("12301", "16:55", &[(FareClass::ThirdAc, SeatStatus::Available(Some(5)))]),
            test_candidate("99999", "08:00", &[]),
        ];

        cross_check(&source, code("NDLS"), code("HWH"), &mut candidates).await;

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].schedule_verified, Some(true));
        assert_eq!(candidates[1].schedule_verified, Some(false));
    }

    #[tokio::test]
    async fn failed_lookup_leaves_candidates_unmarked() {
        let source = StaticSchedule::new().failing();
        let mut candidates = vec![test_candidate("12301", "16:55", &[])];

        cross_check(&source, code("NDLS"), code("HWH"), &mut candidates).await;

        assert_eq!(candidates[0].schedule_verified, None);
    }
}
