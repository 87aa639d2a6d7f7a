//! Per-run booking state and its append-only history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FareClass, SeatStatus, TrainNumber};
use crate::recovery::ErrorRecord;

use super::phase::Phase;

/// Why a run is parked waiting for its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SuspendReason {
    /// No candidate matched confidently; the caller picks one.
    AwaitingUserChoice,
    /// A human verification challenge must be solved in the browser.
    Challenge { target: String },
    /// Required form fields the engine cannot fill.
    ManualFields { fields: Vec<String> },
}

impl SuspendReason {
    pub fn needs_user_choice(&self) -> bool {
        matches!(self, SuspendReason::AwaitingUserChoice)
    }
}

/// Something that happened to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Entered {
        phase: Phase,
    },
    Failure {
        error: ErrorRecord,
    },
    Selected {
        train: TrainNumber,
        score: u32,
        by_user: bool,
    },
    ClassSubstituted {
        train: TrainNumber,
        from: FareClass,
        to: Option<FareClass>,
        observed: SeatStatus,
    },
    ClassConfigured {
        class: FareClass,
    },
    GateReleased {
        opening: DateTime<Utc>,
        waited_ms: u64,
    },
    PostWindow {
        opening: DateTime<Utc>,
    },
    Suspended {
        phase: Phase,
        #[serde(flatten)]
        reason: SuspendReason,
        checkpoint: u32,
    },
    Resumed {
        phase: Phase,
        checkpoint: u32,
    },
    Reauthenticated {
        phase: Phase,
    },
    FastForward {
        from: Phase,
        to: Phase,
    },
    Confirmed {
        url: String,
    },
    Aborted {
        from: Phase,
    },
    Closed,
}

/// A timestamped history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

/// An active suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suspension {
    pub reason: SuspendReason,
    pub checkpoint: u32,
    /// Phase the run continues in once resumed: the suspended phase
    /// itself or the one after it.
    pub resume_to: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move from {from} to {to}")]
    OutOfOrder { from: Phase, to: Phase },

    #[error("run is suspended in {0}")]
    Suspended(Phase),

    #[error("run already finished in {0}")]
    Finished(Phase),

    #[error("run is not suspended")]
    NotSuspended,
}

/// Everything the state machine knows about one run.
///
/// Only the run's own state machine mutates this. History is append-only.
#[derive(Debug, Clone)]
pub struct BookingState {
    phase: Phase,
    history: Vec<HistoryEntry>,
    errors: Vec<ErrorRecord>,
    attempts: u32,
    session_renewals: u32,
    started_at: DateTime<Utc>,
    phase_entered_at: DateTime<Utc>,
    suspension: Option<Suspension>,
    checkpoint: u32,
    final_error: Option<ErrorRecord>,
}

impl BookingState {
    /// A fresh run, entering `Search` at `at`.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Search,
            history: vec![HistoryEntry {
                at,
                event: Event::Entered {
                    phase: Phase::Search,
                },
            }],
            errors: Vec::new(),
            attempts: 0,
            session_renewals: 0,
            started_at: at,
            phase_entered_at: at,
            suspension: None,
            checkpoint: 0,
            final_error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Every classified failure, recovered or not.
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// The failure that aborted the run, if any.
    pub fn final_error(&self) -> Option<&ErrorRecord> {
        self.final_error.as_ref()
    }

    /// Retries made in the current phase.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn session_renewals(&self) -> u32 {
        self.session_renewals
    }

    pub fn suspension(&self) -> Option<&Suspension> {
        self.suspension.as_ref()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn phase_entered_at(&self) -> DateTime<Utc> {
        self.phase_entered_at
    }

    pub fn note(&mut self, event: Event, at: DateTime<Utc>) {
        self.history.push(HistoryEntry { at, event });
    }

    fn ensure_active(&self) -> Result<(), TransitionError> {
        if self.phase.is_terminal() {
            return Err(TransitionError::Finished(self.phase));
        }
        if self.suspension.is_some() {
            return Err(TransitionError::Suspended(self.phase));
        }
        Ok(())
    }

    fn enter(&mut self, phase: Phase, at: DateTime<Utc>) {
        self.phase = phase;
        self.attempts = 0;
        self.phase_entered_at = at;
        self.note(Event::Entered { phase }, at);
    }

    /// Move to the next phase in sequence.
    pub fn advance(&mut self, at: DateTime<Utc>) -> Result<Phase, TransitionError> {
        self.ensure_active()?;
        let next = self.phase.next().ok_or(TransitionError::Finished(self.phase))?;
        self.enter(next, at);
        Ok(next)
    }

    /// Jump ahead to `to`, skipping the phases in between.
    pub fn fast_forward(&mut self, to: Phase, at: DateTime<Utc>) -> Result<Phase, TransitionError> {
        self.ensure_active()?;
        if to.is_terminal() || to.ordinal() <= self.phase.ordinal() {
            return Err(TransitionError::OutOfOrder {
                from: self.phase,
                to,
            });
        }
        self.note(
            Event::FastForward {
                from: self.phase,
                to,
            },
            at,
        );
        self.enter(to, at);
        Ok(to)
    }

    pub fn record_failure(&mut self, error: ErrorRecord, at: DateTime<Utc>) {
        self.errors.push(error.clone());
        self.note(Event::Failure { error }, at);
    }

    /// Count a retry of the current phase. Re-entry is not a transition,
    /// so no `Entered` entry is added.
    pub fn retry(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Count an automatic re-authentication.
    pub fn renew_session(&mut self) -> u32 {
        self.session_renewals += 1;
        self.session_renewals
    }

    /// Park the run. Returns the new checkpoint.
    pub fn suspend(
        &mut self,
        reason: SuspendReason,
        resume_to: Phase,
        at: DateTime<Utc>,
    ) -> Result<u32, TransitionError> {
        self.ensure_active()?;
        if resume_to != self.phase && Some(resume_to) != self.phase.next() {
            return Err(TransitionError::OutOfOrder {
                from: self.phase,
                to: resume_to,
            });
        }
        self.checkpoint += 1;
        self.note(
            Event::Suspended {
                phase: self.phase,
                reason: reason.clone(),
                checkpoint: self.checkpoint,
            },
            at,
        );
        self.suspension = Some(Suspension {
            reason,
            checkpoint: self.checkpoint,
            resume_to,
        });
        Ok(self.checkpoint)
    }

    /// Lift the current suspension and continue in its `resume_to` phase.
    pub fn resume(&mut self, at: DateTime<Utc>) -> Result<Phase, TransitionError> {
        let suspension = self.suspension.take().ok_or(TransitionError::NotSuspended)?;
        self.note(
            Event::Resumed {
                phase: self.phase,
                checkpoint: suspension.checkpoint,
            },
            at,
        );
        if suspension.resume_to != self.phase {
            self.enter(suspension.resume_to, at);
        } else {
            self.attempts = 0;
        }
        Ok(self.phase)
    }

    /// End the run unsuccessfully. No-op on a finished run.
    pub fn abort(&mut self, error: Option<ErrorRecord>, at: DateTime<Utc>) {
        if self.phase.is_terminal() {
            return;
        }
        self.suspension = None;
        self.final_error = error;
        self.note(Event::Aborted { from: self.phase }, at);
        self.phase = Phase::Aborted;
        self.phase_entered_at = at;
    }

    /// Phases entered so far, in order.
    pub fn entered_phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.history.iter().filter_map(|entry| match entry.event {
            Event::Entered { phase } => Some(phase),
            _ => None,
        })
    }
}
