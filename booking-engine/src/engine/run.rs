//! One booking run: a browser page walked through the booking phases.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::candidate::{self, Candidate, RankedCandidate, Selection, class_plan, extract_candidates};
use crate::domain::{BookingMode, BookingRequest, FareClass, SeatStatus};
use crate::page::{Page, PageError};
use crate::recovery::{ErrorRecord, Recovery, StepError};
use crate::schedule::{self, ScheduleSource};
use crate::selector::{ResolveError, Resolved, Resolver, SelectorTable, targets};
use crate::timing::{GateOutcome, TimingController};

use super::config::{EngineConfig, LocationMarkers};
use super::error::EngineError;
use super::phase::Phase;
use super::result::{BookingResult, Choice, Resolution, RunId, RunStatus};
use super::state::{BookingState, Event, SuspendReason, TransitionError};

/// Everything runs share. Read-only once the engine is built.
#[derive(Clone)]
pub(crate) struct Shared {
    pub config: Arc<EngineConfig>,
    pub table: Arc<SelectorTable>,
    pub timing: TimingController,
    pub schedule: Option<Arc<dyn ScheduleSource>>,
}

fn classify(error: &StepError, phase: Phase, retry_count: u32) -> ErrorRecord {
    ErrorRecord {
        kind: error.kind(),
        phase,
        target: error.target().map(str::to_string),
        detail: error.to_string(),
        retry_count,
    }
}

/// What a successful phase step asks for next.
#[derive(Debug)]
enum Step {
    Advance,
    /// Park until the caller picks one of these.
    AwaitChoice(Vec<RankedCandidate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResumeOutcome {
    Applied,
    /// The resolution did not apply to the current suspension.
    Noop,
}

pub(crate) struct Run<P: Page> {
    id: RunId,
    page: P,
    resolver: Resolver,
    shared: Shared,
    request: Arc<BookingRequest>,
    state: BookingState,
    /// Ranked candidates offered while awaiting a user choice.
    offered: Vec<RankedCandidate>,
    chosen: Option<Candidate>,
    class: Option<FareClass>,
    /// Classes seen to have lost availability on the chosen train.
    lost: Vec<FareClass>,
    gate: Option<GateOutcome>,
    /// Checkpoint lifted by an acknowledgment that named none. Later
    /// acknowledgments must name theirs.
    blind_ack: Option<u32>,
    confirmed: bool,
    page_closed: bool,
    status: watch::Sender<BookingResult>,
}

impl<P: Page> Run<P> {
    pub(crate) fn new(
        id: RunId,
        page: P,
        shared: Shared,
        request: Arc<BookingRequest>,
    ) -> (Self, watch::Receiver<BookingResult>) {
        let now = shared.timing.now();
        let resolver = Resolver::new(shared.config.resolver.clone());
        let state = BookingState::new(now);
        let initial = BookingResult {
            run_id: id,
            status: RunStatus::InProgress,
            phase: state.phase(),
            candidates: Vec::new(),
            history: state.history().to_vec(),
            error: None,
            errors: Vec::new(),
            suspension: None,
            checkpoint: None,
            choice: None,
            post_window: false,
            started_at: now,
            updated_at: now,
        };
        let (status, receiver) = watch::channel(initial);
        let run = Self {
            id,
            page,
            resolver,
            shared,
            request,
            state,
            offered: Vec::new(),
            chosen: None,
            class: None,
            lost: Vec::new(),
            gate: None,
            blind_ack: None,
            confirmed: false,
            page_closed: false,
            status,
        };
        (run, receiver)
    }

    fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.shared.timing.now()
    }

    pub(crate) fn status(&self) -> RunStatus {
        match self.state.phase() {
            Phase::Completed if self.confirmed => RunStatus::Completed,
            Phase::Completed => RunStatus::PaymentReady,
            Phase::Aborted => RunStatus::Aborted,
            _ => match self.state.suspension() {
                Some(s) if s.reason.needs_user_choice() => RunStatus::AwaitingUserChoice,
                Some(_) => RunStatus::ManualInterventionRequired,
                None => RunStatus::InProgress,
            },
        }
    }

    pub(crate) fn snapshot(&self) -> BookingResult {
        let status = self.status();
        let suspension = self.state.suspension();
        BookingResult {
            run_id: self.id,
            status,
            phase: self.state.phase(),
            candidates: if status == RunStatus::AwaitingUserChoice {
                self.offered.clone()
            } else {
                Vec::new()
            },
            history: self.state.history().to_vec(),
            error: self.state.final_error().cloned(),
            errors: self.state.errors().to_vec(),
            suspension: suspension.map(|s| s.reason.clone()),
            checkpoint: suspension.map(|s| s.checkpoint),
            choice: self.chosen.as_ref().map(|c| Choice {
                train: c.id.clone(),
                name: c.name.clone(),
                class: self.class,
            }),
            post_window: matches!(self.gate, Some(GateOutcome::PostWindow { .. })),
            started_at: self.state.started_at(),
            updated_at: self.now(),
        }
    }

    fn publish(&self) {
        self.status.send_replace(self.snapshot());
    }

    /// Walk phases until the run finishes, parks, or is cancelled.
    pub(crate) async fn drive(&mut self, cancel: &CancellationToken) {
        loop {
            let phase = self.state.phase();
            if phase.is_terminal() || self.state.is_suspended() || cancel.is_cancelled() {
                break;
            }

            self.dismiss_popups().await;
            debug!(run_id = %self.id, %phase, attempt = self.state.attempts(), "running phase");

            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(StepError::Cancelled),
                outcome = self.step(phase, cancel) => outcome,
            };

            match outcome {
                Ok(Step::Advance) => {
                    let now = self.now();
                    let result = self.state.advance(now);
                    self.settle(result);
                }
                Ok(Step::AwaitChoice(ranked)) => {
                    info!(run_id = %self.id, candidates = ranked.len(), "no confident match, awaiting choice");
                    self.offered = ranked;
                    self.park(SuspendReason::AwaitingUserChoice, Phase::ClassConfigure);
                }
                Err(e) if e.is_cancelled() => {
                    debug!(run_id = %self.id, %phase, "run cancelled");
                    break;
                }
                Err(e) => self.recover(e, cancel).await,
            }
            self.publish();
        }
        self.publish();
    }

    async fn step(&mut self, phase: Phase, cancel: &CancellationToken) -> Result<Step, StepError> {
        match phase {
            Phase::Search => self.search(cancel).await,
            Phase::Select => self.choose().await,
            Phase::ClassConfigure => self.configure_class().await,
            Phase::Authenticate => self.authenticate().await,
            Phase::PassengerDetails => self.fill_passengers().await,
            Phase::PaymentHandoff => self.hand_off_payment().await,
            Phase::Completed | Phase::Aborted => Ok(Step::Advance),
        }
    }

    fn settle(&mut self, result: Result<Phase, TransitionError>) {
        match result {
            Ok(phase) => info!(run_id = %self.id, %phase, "entered phase"),
            Err(e) => warn!(run_id = %self.id, error = %e, "transition refused"),
        }
    }

    fn park(&mut self, reason: SuspendReason, resume_to: Phase) {
        let now = self.now();
        match self.state.suspend(reason, resume_to, now) {
            Ok(checkpoint) => {
                info!(run_id = %self.id, phase = %self.state.phase(), checkpoint, "run suspended");
            }
            Err(e) => {
                error!(run_id = %self.id, error = %e, "could not suspend run");
                self.state.abort(None, now);
            }
        }
    }

    async fn recover(&mut self, error: StepError, cancel: &CancellationToken) {
        let phase = self.state.phase();
        let retries = self.state.attempts();
        let record = classify(&error, phase, retries);
        warn!(run_id = %self.id, %phase, kind = %record.kind, retries, error = %error, "step failed");
        let now = self.now();
        self.state.record_failure(record.clone(), now);

        let decision = self.config().recovery.decide(
            &error,
            phase,
            retries,
            self.state.session_renewals(),
            &self.config().redirects,
        );

        match decision {
            Recovery::Retry { backoff } => {
                let attempt = self.state.retry();
                info!(run_id = %self.id, %phase, attempt, ?backoff, "retrying phase");
                self.publish();
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
            Recovery::Suspend => match error {
                StepError::ManualInput { fields } => {
                    self.park(SuspendReason::ManualFields { fields }, phase.next().unwrap_or(phase));
                }
                StepError::Challenge { target } => {
                    // A cleared sign-in challenge leaves the human signed in.
                    let resume_to = if phase == Phase::Authenticate {
                        Phase::PassengerDetails
                    } else {
                        phase
                    };
                    self.park(SuspendReason::Challenge { target }, resume_to);
                }
                other => {
                    error!(run_id = %self.id, %phase, error = %other, "no human step resolves this failure, aborting");
                    self.state.abort(Some(record), now);
                }
            },
            Recovery::Reauthenticate => {
                let renewals = self.state.renew_session();
                info!(run_id = %self.id, %phase, renewals, "session expired, signing in again");
                match self.sign_in().await {
                    Ok(()) => {
                        let now = self.now();
                        self.state.note(Event::Reauthenticated { phase }, now);
                    }
                    Err(StepError::Challenge { target }) => {
                        self.park(SuspendReason::Challenge { target }, phase);
                    }
                    Err(e) => {
                        let record = classify(&e, phase, retries);
                        error!(run_id = %self.id, %phase, error = %e, "re-authentication failed");
                        let now = self.now();
                        self.state.record_failure(record.clone(), now);
                        self.state.abort(Some(record), now);
                    }
                }
            }
            Recovery::FastForward(to) => {
                info!(run_id = %self.id, from = %phase, %to, "recognised redirect, fast-forwarding");
                let result = self.state.fast_forward(to, now);
                self.settle(result);
            }
            Recovery::Abort => {
                error!(run_id = %self.id, %phase, error = %record, "aborting run");
                self.state.abort(Some(record), now);
            }
        }
    }

    /// Apply an external resolution to the current suspension.
    pub(crate) fn resume(&mut self, resolution: Resolution) -> Result<ResumeOutcome, EngineError> {
        let Some(suspension) = self.state.suspension().cloned() else {
            debug!(run_id = %self.id, "resume on a run that is not suspended");
            return Ok(ResumeOutcome::Noop);
        };

        match resolution.checkpoint() {
            Some(checkpoint) if checkpoint != suspension.checkpoint => {
                debug!(run_id = %self.id, checkpoint, current = suspension.checkpoint, "stale resolution");
                return Ok(ResumeOutcome::Noop);
            }
            Some(_) if !resolution.answers(&suspension.reason) => {
                return Err(EngineError::ResolutionMismatch {
                    run: self.id,
                    expected: if suspension.reason.needs_user_choice() {
                        "a candidate selection"
                    } else {
                        "a challenge-cleared acknowledgment"
                    },
                });
            }
            None if !resolution.answers(&suspension.reason) => {
                debug!(run_id = %self.id, "resolution does not answer current suspension");
                return Ok(ResumeOutcome::Noop);
            }
            None if matches!(resolution, Resolution::ChallengeCleared { .. }) => {
                if let Some(lifted) = self.blind_ack {
                    debug!(
                        run_id = %self.id,
                        lifted,
                        current = suspension.checkpoint,
                        "acknowledgment without checkpoint already applied"
                    );
                    return Ok(ResumeOutcome::Noop);
                }
                self.blind_ack = Some(suspension.checkpoint);
            }
            _ => {}
        }

        let now = self.now();
        if let Resolution::SelectCandidate { train, .. } = &resolution {
            let picked = self
                .offered
                .iter()
                .find(|r| &r.candidate.id == train)
                .cloned()
                .ok_or_else(|| EngineError::UnknownCandidate {
                    run: self.id,
                    train: train.clone(),
                })?;
            self.state.note(
                Event::Selected {
                    train: train.clone(),
                    score: picked.score.total,
                    by_user: true,
                },
                now,
            );
            self.chosen = Some(picked.candidate);
            self.offered.clear();
        }

        match self.state.resume(now) {
            Ok(phase) => info!(run_id = %self.id, %phase, "run resumed"),
            Err(e) => warn!(run_id = %self.id, error = %e, "resume refused"),
        }
        self.publish();
        Ok(ResumeOutcome::Applied)
    }

    /// Check whether a run waiting at the payment page has been confirmed.
    pub(crate) async fn refresh(&mut self) -> BookingResult {
        if self.status() == RunStatus::PaymentReady && !self.page_closed {
            match self.page.current_url().await {
                Ok(url) if LocationMarkers::matches(&self.config().markers.confirmation, &url) => {
                    info!(run_id = %self.id, %url, "booking confirmed");
                    self.confirmed = true;
                    let now = self.now();
                    self.state.note(Event::Confirmed { url }, now);
                    self.publish();
                }
                Ok(url) => debug!(run_id = %self.id, %url, "not confirmed yet"),
                Err(e) => warn!(run_id = %self.id, error = %e, "could not read page location"),
            }
        }
        self.snapshot()
    }

    /// Touch the page so the site session stays alive.
    pub(crate) async fn keep_alive(&self) -> bool {
        if self.page_closed {
            return false;
        }
        match self.page.current_url().await {
            Ok(url) => {
                debug!(run_id = %self.id, %url, "session kept alive");
                true
            }
            Err(e) => {
                warn!(run_id = %self.id, error = %e, "keep-alive failed");
                false
            }
        }
    }

    /// Release the page and end the run if it has not ended. Idempotent.
    pub(crate) async fn close_page(&mut self) {
        if self.page_closed {
            return;
        }
        if let Err(e) = self.page.close().await {
            warn!(run_id = %self.id, error = %e, "closing page failed");
        }
        self.page_closed = true;
        let now = self.now();
        self.state.abort(None, now);
        self.state.note(Event::Closed, now);
        info!(run_id = %self.id, "run closed");
        self.publish();
    }

    // Phase steps.

    async fn search(&mut self, cancel: &CancellationToken) -> Result<Step, StepError> {
        let config = Arc::clone(&self.shared.config);
        self.page.navigate(&config.home_url).await?;

        self.fill_station(targets::ORIGIN_INPUT, self.request.source.as_str())
            .await?;
        self.fill_station(targets::DESTINATION_INPUT, self.request.destination.as_str())
            .await?;
        let date = self
            .request
            .journey_date
            .format(&config.date_format)
            .to_string();
        self.fill(targets::DATE_INPUT, &date).await?;

        if self.request.mode == BookingMode::QuickRelease && self.gate.is_none() {
            self.pass_gate(cancel).await?;
        }

        self.click_and_await(targets::SEARCH_BUTTON, &config.markers.results)
            .await?;
        Ok(Step::Advance)
    }

    async fn pass_gate(&mut self, cancel: &CancellationToken) -> Result<(), StepError> {
        let class = self
            .request
            .top_class()
            .ok_or_else(|| StepError::Validation("no fare class requested".to_string()))?;
        let outcome = self
            .shared
            .timing
            .wait_for_opening(self.request.journey_date, class, cancel)
            .await?;
        self.gate = Some(outcome);

        let now = self.now();
        match outcome {
            GateOutcome::Released { opening, waited } => {
                self.state.note(
                    Event::GateReleased {
                        opening,
                        waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                    },
                    now,
                );
            }
            GateOutcome::PostWindow { opening } => {
                self.state.note(Event::PostWindow { opening }, now);
                if !self.config().proceed_after_window {
                    return Err(StepError::Validation(format!(
                        "quick-release window opened at {opening}"
                    )));
                }
                info!(run_id = %self.id, %opening, "window already open, continuing as a standard booking");
            }
        }
        Ok(())
    }

    async fn choose(&mut self) -> Result<Step, StepError> {
        let extraction =
            extract_candidates(&self.page, &self.resolver, &self.shared.table).await?;
        let mut candidates = extraction.candidates;
        if extraction.skipped > 0 {
            info!(run_id = %self.id, skipped = extraction.skipped, "some result entries were unusable");
        }
        if candidates.is_empty() {
            return Err(StepError::NoCandidates);
        }

        if let Some(source) = &self.shared.schedule {
            schedule::cross_check(
                source.as_ref(),
                self.request.source,
                self.request.destination,
                &mut candidates,
            )
            .await;
        }

        match candidate::select(&candidates, &self.request, &self.config().scoring) {
            None => Err(StepError::NoCandidates),
            Some(Selection::Confident(best)) => {
                info!(
                    run_id = %self.id,
                    train = %best.candidate.id,
                    score = best.score.total,
                    "selected candidate"
                );
                let now = self.now();
                self.state.note(
                    Event::Selected {
                        train: best.candidate.id.clone(),
                        score: best.score.total,
                        by_user: false,
                    },
                    now,
                );
                self.chosen = Some(best.candidate);
                Ok(Step::Advance)
            }
            Some(Selection::NoConfidentMatch(ranked)) => Ok(Step::AwaitChoice(ranked)),
        }
    }

    async fn configure_class(&mut self) -> Result<Step, StepError> {
        let chosen = self
            .chosen
            .clone()
            .ok_or_else(|| StepError::Validation("no train chosen".to_string()))?;
        let plan: Vec<FareClass> = class_plan(&chosen, &self.request)
            .into_iter()
            .filter(|class| !self.lost.contains(class))
            .collect();

        let mut configured = None;
        for (i, class) in plan.iter().copied().enumerate() {
            let spec = self
                .shared
                .table
                .get(targets::CLASS_OPTION)
                .bind(&[("train", chosen.id.as_str()), ("class", class.code())]);
            let option = self.resolver.resolve(&self.page, &spec).await?;
            self.page.click(&option.element).await?;

            let observed = self.observed_availability().await?;
            let lost = match &observed {
                SeatStatus::NotAvailable => true,
                SeatStatus::Unknown => false,
                status => chosen.has_open(class) && !status.is_open(),
            };
            if !lost {
                configured = Some(class);
                break;
            }

            let to = plan.get(i + 1).copied();
            info!(run_id = %self.id, train = %chosen.id, from = %class, ?to, ?observed, "class lost availability");
            self.lost.push(class);
            let now = self.now();
            self.state.note(
                Event::ClassSubstituted {
                    train: chosen.id.clone(),
                    from: class,
                    to,
                    observed,
                },
                now,
            );
        }

        let class = configured.ok_or_else(|| {
            StepError::Validation(format!("train {} has no bookable class left", chosen.id))
        })?;
        self.class = Some(class);
        let now = self.now();
        self.state.note(Event::ClassConfigured { class }, now);

        let config = Arc::clone(&self.shared.config);
        self.click_and_await(targets::BOOK_NOW, &config.markers.login)
            .await?;
        Ok(Step::Advance)
    }

    async fn observed_availability(&self) -> Result<SeatStatus, StepError> {
        match self.probe(targets::CLASS_AVAILABILITY).await? {
            Some(element) => Ok(SeatStatus::parse(&self.page.text(&element).await?)),
            None => Ok(SeatStatus::Unknown),
        }
    }

    async fn authenticate(&mut self) -> Result<Step, StepError> {
        self.sign_in().await?;
        let config = Arc::clone(&self.shared.config);
        self.await_location(&config.markers.passenger, None).await?;
        Ok(Step::Advance)
    }

    /// Fill the sign-in form and submit it, stopping at a challenge.
    async fn sign_in(&self) -> Result<(), StepError> {
        let credentials = self
            .config()
            .credentials
            .as_ref()
            .ok_or_else(|| StepError::Validation("no site credentials configured".to_string()))?;

        if self.probe(targets::USERNAME_INPUT).await?.is_none() {
            self.click(targets::LOGIN_BUTTON).await?;
        }
        self.fill(targets::USERNAME_INPUT, &credentials.username)
            .await?;
        self.fill(targets::PASSWORD_INPUT, &credentials.password)
            .await?;

        if self.probe(targets::CHALLENGE).await?.is_some() {
            return Err(StepError::Challenge {
                target: targets::CHALLENGE.to_string(),
            });
        }
        self.click(targets::SIGN_IN_BUTTON).await
    }

    async fn fill_passengers(&mut self) -> Result<Step, StepError> {
        let config = Arc::clone(&self.shared.config);
        self.await_location(&config.markers.passenger, None).await?;

        let request = Arc::clone(&self.request);
        for (i, passenger) in request.passengers.iter().enumerate() {
            if i > 0 {
                let rows = self
                    .resolver
                    .resolve_all(&self.page, &self.shared.table.get(targets::PASSENGER_NAME))
                    .await?;
                if rows.len() <= i {
                    self.click(targets::ADD_PASSENGER).await?;
                }
            }
            self.fill_nth(targets::PASSENGER_NAME, i, &passenger.name)
                .await?;
            self.fill_nth(targets::PASSENGER_AGE, i, &passenger.age.to_string())
                .await?;
            self.fill_nth(targets::PASSENGER_GENDER, i, passenger.gender.label())
                .await?;
            if let Some(berth) = passenger.berth.label() {
                match self.fill_nth(targets::PASSENGER_BERTH, i, berth).await {
                    Err(StepError::Resolve(ResolveError::ElementNotFound { .. })) => {
                        debug!(run_id = %self.id, passenger = i, "no berth choice offered");
                    }
                    other => other?,
                }
            }
        }

        let missing = self.unfillable_fields().await?;
        if !missing.is_empty() {
            return Err(StepError::ManualInput { fields: missing });
        }

        self.click(targets::PASSENGER_CONTINUE).await?;
        Ok(Step::Advance)
    }

    /// Required fields that are still empty and that the engine has no
    /// input for.
    async fn unfillable_fields(&self) -> Result<Vec<String>, StepError> {
        let required = match self
            .resolver
            .resolve_all(&self.page, &self.shared.table.get(targets::REQUIRED_FIELD))
            .await
        {
            Ok(found) => found,
            Err(ResolveError::ElementNotFound { .. } | ResolveError::Timeout { .. }) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut missing = Vec::new();
        for element in &required {
            let mut name = None;
            for attr in ["formcontrolname", "name", "id"] {
                if let Some(value) = self.page.attribute(element, attr).await? {
                    name = Some(value);
                    break;
                }
            }
            let name = name.unwrap_or_else(|| "unnamed".to_string());
            if self.config().is_automatable(&name) || missing.contains(&name) {
                continue;
            }
            let value = self.page.attribute(element, "value").await?.unwrap_or_default();
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        Ok(missing)
    }

    async fn hand_off_payment(&mut self) -> Result<Step, StepError> {
        let config = Arc::clone(&self.shared.config);
        let url = self.page.current_url().await?;
        if !LocationMarkers::matches(&config.markers.payment, &url) {
            self.click_and_await(targets::PAYMENT_BUTTON, &config.markers.payment)
                .await?;
        }
        info!(run_id = %self.id, "payment page ready");
        Ok(Step::Advance)
    }

    // Page helpers.

    async fn dismiss_popups(&self) {
        if !self.config().dismiss_popups {
            return;
        }
        match self.probe(targets::POPUP_CLOSE).await {
            Ok(Some(element)) => match self.page.click(&element).await {
                Ok(()) => debug!(run_id = %self.id, "dismissed popup"),
                Err(e) => debug!(run_id = %self.id, error = %e, "popup dismissal failed"),
            },
            Ok(None) => {}
            Err(e) => debug!(run_id = %self.id, error = %e, "popup probe failed"),
        }
    }

    async fn resolve(&self, target: &str) -> Result<Resolved<P::Element>, StepError> {
        Ok(self
            .resolver
            .resolve(&self.page, &self.shared.table.get(target))
            .await?)
    }

    async fn probe(&self, target: &str) -> Result<Option<P::Element>, StepError> {
        Ok(self
            .resolver
            .probe(
                &self.page,
                &self.shared.table.get(target),
                self.config().probe_timeout,
            )
            .await?)
    }

    async fn click(&self, target: &str) -> Result<(), StepError> {
        let found = self.resolve(target).await?;
        self.page.click(&found.element).await?;
        debug!(run_id = %self.id, selector = target, "clicked");
        Ok(())
    }

    async fn fill(&self, target: &str, value: &str) -> Result<(), StepError> {
        let found = self.resolve(target).await?;
        self.page.fill(&found.element, value).await?;
        debug!(run_id = %self.id, selector = target, "filled");
        Ok(())
    }

    async fn fill_nth(&self, target: &str, n: usize, value: &str) -> Result<(), StepError> {
        let found = self
            .resolver
            .resolve_nth(&self.page, &self.shared.table.get(target), n)
            .await?;
        self.page.fill(&found.element, value).await?;
        debug!(run_id = %self.id, selector = target, row = n, "filled");
        Ok(())
    }

    /// Type a station code and take the site's first suggestion, if it
    /// offers one.
    async fn fill_station(&self, target: &str, code: &str) -> Result<(), StepError> {
        self.fill(target, code).await?;
        if let Some(suggestion) = self.probe(targets::STATION_SUGGESTION).await? {
            self.page.click(&suggestion).await?;
        }
        Ok(())
    }

    async fn click_and_await(&self, target: &str, expected: &[String]) -> Result<String, StepError> {
        let before = self.page.current_url().await?;
        self.click(target).await?;
        self.await_location(expected, Some(before.as_str())).await
    }

    /// Poll the page location until it matches `expected`.
    ///
    /// Session-expiry pages and recognised redirects end the wait early.
    /// If the wait times out somewhere other than `before`, the browser
    /// was taken somewhere unexpected.
    async fn await_location(
        &self,
        expected: &[String],
        before: Option<&str>,
    ) -> Result<String, StepError> {
        let config = self.config();
        let phase = self.state.phase();
        let deadline = Instant::now() + config.navigation_timeout;
        loop {
            let url = self.page.current_url().await?;
            if LocationMarkers::matches(expected, &url) {
                return Ok(url);
            }
            if LocationMarkers::matches(&config.markers.session_expired, &url)
                || self.probe(targets::SESSION_EXPIRED).await?.is_some()
            {
                return Err(StepError::SessionExpired { url });
            }
            if config.redirects.recognize(&url, phase).is_some() {
                return Err(StepError::Redirect { url });
            }
            if Instant::now() >= deadline {
                return Err(match before {
                    Some(before) if before != url => StepError::Redirect { url },
                    _ => StepError::Page(PageError::Timeout(format!(
                        "still at {url}, expected {}",
                        expected.join(" or ")
                    ))),
                });
            }
            tokio::time::sleep(config.poll_interval).await;
        }
    }
}
