//! Blocking until a quick-release window opens.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{ClassCategory, FareClass};

use super::clock::{Clock, SystemClock};
use super::policy::QuickReleasePolicy;

/// How the gate let the caller through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Waited (possibly zero time) and released just before opening.
    Released {
        opening: DateTime<Utc>,
        waited: Duration,
    },
    /// The window had already opened when the gate was consulted.
    PostWindow { opening: DateTime<Utc> },
}

impl GateOutcome {
    pub fn opening(&self) -> DateTime<Utc> {
        match self {
            GateOutcome::Released { opening, .. } | GateOutcome::PostWindow { opening } => *opening,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimingError {
    #[error("no quick-release opening rule for {0:?} classes")]
    NoRule(ClassCategory),

    #[error("quick-release window opens at {opening}, {wait:?} away (limit {limit:?})")]
    TooEarly {
        opening: DateTime<Utc>,
        wait: Duration,
        limit: Duration,
    },

    #[error("wait for quick-release window cancelled")]
    Cancelled,
}

/// Computes opening instants and holds callers until them.
#[derive(Debug, Clone)]
pub struct TimingController {
    policy: QuickReleasePolicy,
    clock: Arc<dyn Clock>,
}

impl TimingController {
    pub fn new(policy: QuickReleasePolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: QuickReleasePolicy, clock: Arc<dyn Clock>) -> Self {
        Self { policy, clock }
    }

    pub fn policy(&self) -> &QuickReleasePolicy {
        &self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today's date in the site's local time.
    pub fn site_today(&self) -> NaiveDate {
        let now = self.clock.now();
        match FixedOffset::east_opt(self.policy.utc_offset_secs) {
            Some(offset) => now.with_timezone(&offset).date_naive(),
            None => now.date_naive(),
        }
    }

    /// Block until `lead` before the opening instant for `class` on
    /// `journey_date`, then return.
    ///
    /// Returns at once with [`GateOutcome::PostWindow`] if the window has
    /// already opened. The wait ends early with
    /// [`TimingError::Cancelled`] when `cancel` fires.
    pub async fn wait_for_opening(
        &self,
        journey_date: NaiveDate,
        class: FareClass,
        cancel: &CancellationToken,
    ) -> Result<GateOutcome, TimingError> {
        let category = class.category();
        let opening = self
            .policy
            .opening_instant(journey_date, category)
            .ok_or(TimingError::NoRule(category))?;
        let lead = chrono::Duration::from_std(self.policy.lead).unwrap_or(chrono::Duration::zero());
        let release_at = opening - lead;

        let now = self.clock.now();
        if now >= opening {
            info!(%opening, "quick-release window already open");
            return Ok(GateOutcome::PostWindow { opening });
        }

        let wait = (release_at - now).to_std().unwrap_or(Duration::ZERO);
        if let Some(limit) = self.policy.max_wait {
            if wait > limit {
                return Err(TimingError::TooEarly {
                    opening,
                    wait,
                    limit,
                });
            }
        }

        info!(%opening, ?wait, %class, "holding for quick-release window");
        let started = Instant::now();
        loop {
            // Re-read the wall clock each round so clock adjustments during
            // a long wait are honoured.
            let remaining = (release_at - self.clock.now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            if remaining.is_zero() {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(%opening, "quick-release wait cancelled");
                    return Err(TimingError::Cancelled);
                }
                _ = tokio::time::sleep(remaining) => {}
            }
        }

        let waited = started.elapsed();
        debug!(%opening, ?waited, "released");
        Ok(GateOutcome::Released { opening, waited })
    }
}
