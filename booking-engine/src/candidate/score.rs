//! Candidate scoring and selection.
//!
//! Scores are a pure function of the candidate, the request and the
//! scoring configuration. The weights and time bands are heuristics, kept
//! in [`ScoringConfig`] so they can be tuned without touching the logic.

use std::cmp::Ordering;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::{BookingRequest, FareClass, SeatStatus, TimePreference, TrainNumber};

use super::types::Candidate;

/// A half-open time-of-day range `[start, end)`. Wraps past midnight when
/// `end <= start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBand {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeBand {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    fn hours(start: u32, end: u32) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(end, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start < self.end {
            self.start <= t && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }
}

/// Departure bands for each time-of-day preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBands {
    pub morning: TimeBand,
    pub afternoon: TimeBand,
    pub evening: TimeBand,
    pub night: TimeBand,
}

impl TimeBands {
    /// The band for a preference; `Any` has none.
    pub fn band(&self, preference: TimePreference) -> Option<TimeBand> {
        match preference {
            TimePreference::Morning => Some(self.morning),
            TimePreference::Afternoon => Some(self.afternoon),
            TimePreference::Evening => Some(self.evening),
            TimePreference::Night => Some(self.night),
            TimePreference::Any => None,
        }
    }
}

impl Default for TimeBands {
    fn default() -> Self {
        Self {
            morning: TimeBand::hours(4, 12),
            afternoon: TimeBand::hours(12, 17),
            evening: TimeBand::hours(17, 21),
            night: TimeBand::hours(21, 4),
        }
    }
}

/// Scoring weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    /// Top-priority class has open seats.
    pub top_class_points: u32,
    /// Some other listed class has open seats.
    pub listed_class_points: u32,
    /// Departure inside the preferred band.
    pub time_points: u32,
    /// Per open class beyond the first.
    pub breadth_points: u32,
    /// Maximum number of extra open classes rewarded.
    pub breadth_cap: u32,
    pub bands: TimeBands,
}

impl ScoringConfig {
    pub fn with_bands(mut self, bands: TimeBands) -> Self {
        self.bands = bands;
        self
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            top_class_points: 10,
            listed_class_points: 5,
            time_points: 5,
            breadth_points: 1,
            breadth_cap: 3,
            bands: TimeBands::default(),
        }
    }
}

/// Per-component scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub class_match: u32,
    pub time_match: u32,
    pub breadth: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.class_match + self.time_match + self.breadth
    }

    /// Whether the candidate matched the request on class or time, as
    /// opposed to scoring on breadth alone.
    pub fn is_match(&self) -> bool {
        self.class_match + self.time_match > 0
    }
}

/// Score for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub id: TrainNumber,
    pub total: u32,
    pub breakdown: ScoreBreakdown,
}

/// A candidate with its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub score: CandidateScore,
}

/// Outcome of automatic selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Confident(RankedCandidate),
    /// Nothing matched the request on class or time; the caller chooses.
    NoConfidentMatch(Vec<RankedCandidate>),
}

/// Score one candidate against a request.
pub fn score(
    candidate: &Candidate,
    request: &BookingRequest,
    config: &ScoringConfig,
) -> CandidateScore {
    let class_match = match request.top_class() {
        Some(top) if candidate.has_open(top) => config.top_class_points,
        _ if request
            .class_priority
            .iter()
            .any(|class| candidate.has_open(*class)) =>
        {
            config.listed_class_points
        }
        _ => 0,
    };

    let time_match = match config.bands.band(request.time_preference) {
        Some(band) if band.contains(candidate.departure) => config.time_points,
        _ => 0,
    };

    let open = candidate.open_classes().count() as u32;
    let breadth = open.saturating_sub(1).min(config.breadth_cap) * config.breadth_points;

    let breakdown = ScoreBreakdown {
        class_match,
        time_match,
        breadth,
    };
    CandidateScore {
        id: candidate.id.clone(),
        total: breakdown.total(),
        breakdown,
    }
}

/// Best first: higher score, then earlier departure, then lower train
/// number.
fn compare(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.score
        .total
        .cmp(&a.score.total)
        .then_with(|| a.candidate.departure.cmp(&b.candidate.departure))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

/// Score and order candidates, best first.
pub fn rank(
    candidates: &[Candidate],
    request: &BookingRequest,
    config: &ScoringConfig,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .map(|candidate| RankedCandidate {
            score: score(candidate, request, config),
            candidate: candidate.clone(),
        })
        .collect();
    ranked.sort_by(compare);
    ranked
}

/// Pick the best candidate, or hand the ranked list back when nothing
/// matched. `None` when there are no candidates at all.
pub fn select(
    candidates: &[Candidate],
    request: &BookingRequest,
    config: &ScoringConfig,
) -> Option<Selection> {
    let mut ranked = rank(candidates, request, config);
    let best = ranked.first()?;
    if best.score.breakdown.is_match() {
        Some(Selection::Confident(ranked.swap_remove(0)))
    } else {
        Some(Selection::NoConfidentMatch(ranked))
    }
}

/// Classes to try on a chosen candidate, most preferred first.
///
/// Open classes from the priority list come first, then open fallback
/// classes, then any other open class. Listed classes that are offered
/// but not confirmed (waitlist, RAC, unknown) come last.
pub fn class_plan(candidate: &Candidate, request: &BookingRequest) -> Vec<FareClass> {
    fn push(class: FareClass, plan: &mut Vec<FareClass>) {
        if !plan.contains(&class) {
            plan.push(class);
        }
    }

    let mut plan = Vec::new();

    for class in request.class_priority.iter().chain(&request.fallback_classes) {
        if candidate.has_open(*class) {
            push(*class, &mut plan);
        }
    }
    for class in candidate.open_classes() {
        push(class, &mut plan);
    }
    for class in request.class_priority.iter().chain(&request.fallback_classes) {
        if candidate
            .status_of(*class)
            .is_some_and(|status| *status != SeatStatus::NotAvailable)
        {
            push(*class, &mut plan);
        }
    }
    plan
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::{BookingMode, Gender, Passenger, StationCode};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn arb_status() -> impl Strategy<Value = SeatStatus> {
        prop_oneof![
            (0u32..50).prop_map(|n| SeatStatus::Available(Some(n))),
            Just(SeatStatus::Available(None)),
            (0u32..50).prop_map(|n| SeatStatus::Waitlist(Some(n))),
            Just(SeatStatus::NotAvailable),
            Just(SeatStatus::Unknown),
        ]
    }

    fn arb_candidate() -> impl Strategy<Value = Candidate> {
        (
            1000u32..99999,
            0u32..24,
            0u32..60,
            prop::collection::vec((prop::sample::select(FareClass::ALL.to_vec()), arb_status()), 0..5),
        )
            .prop_map(|(id, h, m, classes)| {
                let mut c = crate::candidate::types::test_candidate(
                    &id.to_string(),
                    &format!("{h:02}:{m:02}"),
                    &[],
                );
                for (class, status) in classes {
                    if !c.offers(class) {
                        c.classes.push(crate::candidate::ClassAvailability { class, status });
                    }
                }
                c
            })
    }

    fn arb_request() -> impl Strategy<Value = BookingRequest> {
        (
            prop::sample::subsequence(FareClass::ALL.to_vec(), 1..4),
            prop_oneof![
                Just(TimePreference::Morning),
                Just(TimePreference::Afternoon),
                Just(TimePreference::Evening),
                Just(TimePreference::Night),
                Just(TimePreference::Any),
            ],
        )
            .prop_map(|(classes, time)| BookingRequest {
                source: StationCode::parse("NDLS").unwrap(),
                destination: StationCode::parse("HWH").unwrap(),
                journey_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
                class_priority: classes,
                time_preference: time,
                mode: BookingMode::Standard,
                passenger_count: 1,
                passengers: vec![Passenger {
                    name: "A".into(),
                    age: 30,
                    gender: Gender::Female,
                    berth: Default::default(),
                }],
                fallback_classes: vec![],
            })
    }

    proptest! {
        #[test]
        fn scoring_is_deterministic(
            candidates in prop::collection::vec(arb_candidate(), 0..8),
            req in arb_request(),
        ) {
            let config = ScoringConfig::default();
            prop_assert_eq!(rank(&candidates, &req, &config), rank(&candidates, &req, &config));
            prop_assert_eq!(select(&candidates, &req, &config), select(&candidates, &req, &config));
        }

        #[test]
        fn ranking_ignores_input_order(
            candidates in prop::collection::vec(arb_candidate(), 0..8),
            req in arb_request(),
        ) {
            let config = ScoringConfig::default();
            let mut reversed = candidates.clone();
            reversed.reverse();
            let ids = |ranked: Vec<RankedCandidate>| -> Vec<_> {
                ranked.into_iter().map(|r| r.candidate.id).collect()
            };
            prop_assert_eq!(ids(rank(&candidates, &req, &config)), ids(rank(&reversed, &req, &config)));
        }

        #[test]
        fn total_is_sum_of_components(c in arb_candidate(), req in arb_request()) {
            let s = score(&c, &req, &ScoringConfig::default());
            prop_assert_eq!(s.total, s.breakdown.total());
            prop_assert!(s.total <= 10 + 5 + 3);
        }
    }
}
