//! The engine: owns every run and exposes the caller-facing operations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::future::join_all;
use moka::sync::Cache;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span};

use crate::domain::BookingRequest;
use crate::page::{Page, PageFactory};
use crate::schedule::ScheduleSource;
use crate::selector::SelectorTable;
use crate::timing::{Clock, TimingController};

use super::config::EngineConfig;
use super::error::EngineError;
use super::result::{BookingResult, Resolution, RunId, RunStatus};
use super::run::{ResumeOutcome, Run, Shared};

/// Final snapshots of closed runs kept for status queries.
const CLOSED_CAPACITY: u64 = 1_000;
const CLOSED_TTL: Duration = Duration::from_secs(60 * 60);

/// One run's handles. The run itself is only touched under its lock;
/// status reads go through the watch channel and never wait.
struct Slot<P: Page> {
    run: Arc<Mutex<Run<P>>>,
    cancel: CancellationToken,
    status: watch::Receiver<BookingResult>,
}

impl<P: Page> Clone for Slot<P> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
            cancel: self.cancel.clone(),
            status: self.status.clone(),
        }
    }
}

/// Runs booking flows, one browser page each.
///
/// Runs share nothing mutable: each owns its page, state and history.
/// Phases within a run execute on a spawned task that parks whenever the
/// run needs its caller.
pub struct Engine<F: PageFactory> {
    factory: F,
    shared: Shared,
    runs: RwLock<HashMap<RunId, Slot<F::Page>>>,
    /// Closed runs, reduced to their last snapshot.
    closed: Cache<RunId, BookingResult>,
    next_id: AtomicU64,
}

impl<F: PageFactory> Engine<F> {
    pub fn new(factory: F, config: EngineConfig, table: SelectorTable) -> Self {
        let timing = TimingController::new(config.quick_release.clone());
        Self {
            factory,
            shared: Shared {
                config: Arc::new(config),
                table: Arc::new(table),
                timing,
                schedule: None,
            },
            runs: RwLock::new(HashMap::new()),
            closed: Cache::builder()
                .max_capacity(CLOSED_CAPACITY)
                .time_to_live(CLOSED_TTL)
                .build(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Cross-check candidates against a timetable.
    pub fn with_schedule(mut self, schedule: Arc<dyn ScheduleSource>) -> Self {
        self.shared.schedule = Some(schedule);
        self
    }

    /// Use `clock` for quick-release waits, date validation and history
    /// timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.shared.timing =
            TimingController::with_clock(self.shared.config.quick_release.clone(), clock);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    fn live(&self, id: RunId) -> Option<Slot<F::Page>> {
        self.runs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }

    fn archived(&self, id: RunId) -> Result<BookingResult, EngineError> {
        self.closed.get(&id).ok_or(EngineError::UnknownRun(id))
    }

    fn is_taken(&self, runs: &HashMap<RunId, Slot<F::Page>>, id: RunId) -> bool {
        runs.contains_key(&id) || self.closed.contains_key(&id)
    }

    fn allocate_id(&self) -> RunId {
        let runs = self.runs.read().unwrap_or_else(|e| e.into_inner());
        loop {
            let id = RunId(self.next_id.fetch_add(1, Ordering::Relaxed));
            if !self.is_taken(&runs, id) {
                return id;
            }
        }
    }

    /// Start a run under a fresh id.
    pub async fn start(&self, request: BookingRequest) -> Result<BookingResult, EngineError> {
        let id = self.allocate_id();
        self.start_with_id(id, request).await
    }

    /// Validate `request`, open a page for it and start walking phases.
    pub async fn start_with_id(
        &self,
        id: RunId,
        request: BookingRequest,
    ) -> Result<BookingResult, EngineError> {
        request.validate(self.shared.timing.site_today())?;
        if self.is_taken(&self.runs.read().unwrap_or_else(|e| e.into_inner()), id) {
            return Err(EngineError::DuplicateRun(id));
        }

        let page = self.factory.open().await.map_err(EngineError::Browser)?;
        let (run, status) = Run::new(id, page, self.shared.clone(), Arc::new(request));
        let slot = Slot {
            run: Arc::new(Mutex::new(run)),
            cancel: CancellationToken::new(),
            status,
        };

        let inserted = {
            let mut runs = self.runs.write().unwrap_or_else(|e| e.into_inner());
            if self.is_taken(&runs, id) {
                false
            } else {
                runs.insert(id, slot.clone());
                true
            }
        };
        if !inserted {
            slot.run.lock().await.close_page().await;
            return Err(EngineError::DuplicateRun(id));
        }

        info!(run_id = %id, "run started");
        let snapshot = slot.status.borrow().clone();
        self.spawn_drive(id, &slot);
        Ok(snapshot)
    }

    fn spawn_drive(&self, id: RunId, slot: &Slot<F::Page>) {
        let run = Arc::clone(&slot.run);
        let cancel = slot.cancel.clone();
        tokio::spawn(
            async move {
                let mut run = run.lock().await;
                run.drive(&cancel).await;
                debug!(status = ?run.status(), "drive finished");
            }
            .instrument(info_span!("run", run_id = %id)),
        );
    }

    /// Lift a suspension. Resolutions that do not apply to the run's
    /// current suspension are ignored, so repeating one is harmless.
    pub async fn resume(
        &self,
        id: RunId,
        resolution: Resolution,
    ) -> Result<BookingResult, EngineError> {
        let Some(slot) = self.live(id) else {
            debug!(run_id = %id, "run is closed, ignoring resolution");
            return self.archived(id);
        };
        if !slot.status.borrow().status.is_parked() {
            debug!(run_id = %id, "run is not parked, ignoring resolution");
            return Ok(slot.status.borrow().clone());
        }

        let outcome = {
            let mut run = slot.run.lock().await;
            run.resume(resolution)?
        };
        if outcome == ResumeOutcome::Applied {
            self.spawn_drive(id, &slot);
        }
        Ok(slot.status.borrow().clone())
    }

    /// Latest snapshot of a run. Never waits for the run.
    pub fn status(&self, id: RunId) -> Result<BookingResult, EngineError> {
        match self.live(id) {
            Some(slot) => Ok(slot.status.borrow().clone()),
            None => self.archived(id),
        }
    }

    /// Wait until the run parks or finishes.
    pub async fn settled(&self, id: RunId) -> Result<BookingResult, EngineError> {
        let Some(slot) = self.live(id) else {
            return self.archived(id);
        };
        let mut status = slot.status;
        let settled = status
            .wait_for(|r| r.status.is_settled())
            .await
            .map(|r| r.clone());
        Ok(settled.unwrap_or_else(|_| status.borrow().clone()))
    }

    /// Re-check a run waiting at the payment page for confirmation.
    pub async fn refresh(&self, id: RunId) -> Result<BookingResult, EngineError> {
        let Some(slot) = self.live(id) else {
            return self.archived(id);
        };
        if slot.status.borrow().status != RunStatus::PaymentReady {
            return Ok(slot.status.borrow().clone());
        }
        let mut run = slot.run.lock().await;
        Ok(run.refresh().await)
    }

    /// Touch the page of every parked run. Returns how many were reached.
    pub async fn keep_alive(&self) -> usize {
        let parked: Vec<Slot<F::Page>> = self
            .runs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|slot| slot.status.borrow().status.is_parked())
            .cloned()
            .collect();

        let touched = join_all(parked.iter().map(|slot| async move {
            match slot.run.try_lock() {
                Ok(run) => run.keep_alive().await,
                Err(_) => false,
            }
        }))
        .await;
        touched.into_iter().filter(|reached| *reached).count()
    }

    /// Stop a run, release its page and drop its state, keeping only the
    /// final snapshot for a while. Closing twice is harmless.
    pub async fn close(&self, id: RunId) -> Result<BookingResult, EngineError> {
        let Some(slot) = self.live(id) else {
            return self.archived(id);
        };
        slot.cancel.cancel();
        let snapshot = {
            let mut run = slot.run.lock().await;
            run.close_page().await;
            run.snapshot()
        };

        self.closed.insert(id, snapshot.clone());
        self.runs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        debug!(run_id = %id, "run state released");
        Ok(snapshot)
    }

    /// Ids of runs not yet closed, oldest first.
    pub fn runs(&self) -> Vec<RunId> {
        let mut ids: Vec<RunId> = self
            .runs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }
}
