//! Candidate extraction and scoring.
//!
//! Extraction turns a loaded results view into [`Candidate`]s; scoring
//! ranks them against a [`BookingRequest`](crate::domain::BookingRequest)
//! and decides whether one is a confident match.

mod convert;
mod extract;
mod score;
mod types;

pub use convert::{ConversionError, convert_entry};
pub use extract::{Extraction, extract_candidates};
pub use score::{
    CandidateScore, RankedCandidate, ScoreBreakdown, ScoringConfig, Selection, TimeBand,
    TimeBands, class_plan, rank, score, select,
};
pub use types::{Candidate, ClassAvailability, RawClassCell, RawEntry};

#[cfg(test)]
pub(crate) use types::test_candidate;
