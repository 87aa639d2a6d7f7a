//! Wall-clock sources.

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A wall clock pinned to `start` that advances with tokio's clock.
///
/// Under a paused tokio runtime this makes wall-clock waits
/// deterministic: sleeping advances both the runtime and this clock.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredClock {
    start: DateTime<Utc>,
    anchor: Instant,
}

impl AnchoredClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            anchor: Instant::now(),
        }
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().duration_since(self.anchor);
        self.start + chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero())
    }
}
