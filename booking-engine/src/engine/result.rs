//! What the engine exposes to its callers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::RankedCandidate;
use crate::domain::{FareClass, TrainNumber};
use crate::recovery::ErrorRecord;

use super::phase::Phase;
use super::state::{HistoryEntry, SuspendReason};

/// Identifier of one booking run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-facing status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    AwaitingUserChoice,
    ManualInterventionRequired,
    /// The payment page is open and waiting for a human.
    PaymentReady,
    /// The site confirmed the booking.
    Completed,
    Aborted,
}

impl RunStatus {
    /// Whether the run is parked and will not progress on its own.
    pub fn is_parked(&self) -> bool {
        matches!(
            self,
            RunStatus::AwaitingUserChoice
                | RunStatus::ManualInterventionRequired
                | RunStatus::PaymentReady
        )
    }

    /// Whether the run is doing nothing and waiting on nobody but the
    /// caller (or has finished).
    pub fn is_settled(&self) -> bool {
        !matches!(self, RunStatus::InProgress)
    }
}

/// External input that lifts a suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// The caller picked a candidate from the surfaced list.
    SelectCandidate {
        train: TrainNumber,
        #[serde(default)]
        checkpoint: Option<u32>,
    },
    /// A human finished the manual step in the browser.
    ///
    /// Without a checkpoint this lifts only the first manual suspension
    /// of a run; later ones must be named.
    ChallengeCleared {
        #[serde(default)]
        checkpoint: Option<u32>,
    },
}

impl Resolution {
    pub fn checkpoint(&self) -> Option<u32> {
        match self {
            Resolution::SelectCandidate { checkpoint, .. }
            | Resolution::ChallengeCleared { checkpoint } => *checkpoint,
        }
    }

    /// Whether this resolution answers a suspension for `reason`.
    pub fn answers(&self, reason: &SuspendReason) -> bool {
        match self {
            Resolution::SelectCandidate { .. } => reason.needs_user_choice(),
            Resolution::ChallengeCleared { .. } => !reason.needs_user_choice(),
        }
    }
}

/// Train and class the run settled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub train: TrainNumber,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<FareClass>,
}

/// Snapshot of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingResult {
    pub run_id: RunId,
    pub status: RunStatus,
    pub phase: Phase,
    /// Ranked candidates, present only while awaiting a user choice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<RankedCandidate>,
    pub history: Vec<HistoryEntry>,
    /// The failure that ended the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    /// Every classified failure, including recovered ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspension: Option<SuspendReason>,
    /// Pass back in a [`Resolution`] to resume exactly this suspension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<Choice>,
    /// The quick-release window had already opened when the run reached
    /// it.
    #[serde(default)]
    pub post_window: bool,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_wire_format() {
        let r: Resolution =
            serde_json::from_str(r#"{"type": "select_candidate", "train": "12301"}"#).unwrap();
        assert_eq!(
            r,
            Resolution::SelectCandidate {
                train: TrainNumber::parse("12301").unwrap(),
                checkpoint: None
            }
        );

        let r: Resolution =
            serde_json::from_str(r#"{"type": "challenge_cleared", "checkpoint": 2}"#).unwrap();
        assert_eq!(r.checkpoint(), Some(2));
        assert!(r.answers(&SuspendReason::Challenge {
            target: "challenge".into()
        }));
        assert!(!r.answers(&SuspendReason::AwaitingUserChoice));
    }

    #[test]
    fn status_predicates() {
        assert!(RunStatus::PaymentReady.is_parked());
        assert!(!RunStatus::Aborted.is_parked());
        assert!(RunStatus::Aborted.is_settled());
        assert!(!RunStatus::InProgress.is_settled());
        assert_eq!(
            serde_json::to_string(&RunStatus::ManualInterventionRequired).unwrap(),
            "\"manual_intervention_required\""
        );
    }
}
