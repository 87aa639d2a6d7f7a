//! End-to-end booking runs against a scripted site.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use booking_engine::domain::{
    BerthPreference, BookingMode, BookingRequest, FareClass, Gender, Passenger, SeatStatus,
    StationCode, TimePreference, TrainNumber,
};
use booking_engine::engine::{
    BookingResult, Credentials, Engine, EngineConfig, EngineError, Event, Phase, Resolution,
    RunId, RunStatus, SuspendReason,
};
use booking_engine::page::{MockElement, MockPageFactory, MockSite, Page};
use booking_engine::recovery::ErrorKind;
use booking_engine::schedule::StaticSchedule;
use booking_engine::selector::SelectorTable;
use booking_engine::timing::AnchoredClock;

const HOME: &str = "https://site.test/nget/train-search";
const RESULTS: &str = "https://site.test/nget/booking/train-list";
const LOGIN: &str = "https://site.test/nget/login";
const PASSENGERS: &str = "https://site.test/nget/booking/psgninput";
const PAYMENT: &str = "https://site.test/nget/payment/bkgPaymentOptions";
const CONFIRMED: &str = "https://site.test/nget/booking/booking-confirm";
const EXPIRED: &str = "https://site.test/nget/session-expired";

// Screens

fn search_screen(with_button: bool) -> Vec<MockElement> {
    let mut elements = vec![
        MockElement::new("input").attr("aria-controls", "pr_id_1_list"),
        MockElement::new("input").attr("aria-controls", "pr_id_2_list"),
        MockElement::new("input").attr("placeholder", "DD/MM/YYYY"),
    ];
    if with_button {
        elements.push(
            MockElement::new("button")
                .attr("class", "search_btn train_Search")
                .text("Search")
                .navigates_to(RESULTS),
        );
    }
    elements
}

fn entry(heading: &str, dep: &str, arr: &str, cells: &[(&str, &str)]) -> MockElement {
    MockElement::new("div")
        .attr("class", "form-group bull-back")
        .child(MockElement::new("div").attr("class", "train-heading").text(heading))
        .child(MockElement::new("span").attr("class", "departure-time").text(dep))
        .child(MockElement::new("span").attr("class", "arrival-time").text(arr))
        .children(cells.iter().map(|(code, status)| {
            MockElement::new("div")
                .attr("class", "pre-avl")
                .child(MockElement::new("strong").attr("class", "class-code").text(code))
                .child(MockElement::new("span").attr("class", "avl-status").text(status))
        }))
}

fn class_option(train: &str, class: &str) -> MockElement {
    MockElement::new("div")
        .attr("id", &format!("{train}-{class}"))
        .text(class)
}

fn book_now(to: &str) -> MockElement {
    MockElement::new("button").text("Book Now").navigates_to(to)
}

/// NDLS to HWH: an evening Rajdhani, a morning Duronto and a morning
/// sleeper-only train.
fn results_screen(book_now_to: &str) -> Vec<MockElement> {
    vec![
        entry(
            "RAJDHANI EXP (12302)",
            "16:50",
            "09:55",
            &[("3A", "AVAILABLE-0042"), ("2A", "WL 3")],
        ),
        entry("DURONTO EXP (12274)", "06:35", "22:10", &[("3A", "AVAILABLE-0010")]),
        entry("POORVA EXP (12304)", "08:10", "06:00", &[("SL", "AVAILABLE-0100")]),
        class_option("12302", "3A"),
        class_option("12302", "2A"),
        class_option("12274", "3A"),
        class_option("12304", "SL"),
        book_now(book_now_to),
    ]
}

fn login_screen(extra: Vec<MockElement>, sign_in_to: &str) -> Vec<MockElement> {
    let mut elements = vec![
        MockElement::new("input").attr("formcontrolname", "userid"),
        MockElement::new("input").attr("formcontrolname", "password"),
        MockElement::new("button").text("SIGN IN").navigates_to(sign_in_to),
    ];
    elements.extend(extra);
    elements
}

fn passenger_screen(rows: usize, extra: Vec<MockElement>) -> Vec<MockElement> {
    let mut elements = Vec::new();
    for _ in 0..rows {
        elements.push(MockElement::new("input").attr("formcontrolname", "passengerName"));
        elements.push(MockElement::new("input").attr("formcontrolname", "passengerAge"));
        elements.push(MockElement::new("select").attr("formcontrolname", "passengerGender"));
        elements.push(MockElement::new("select").attr("formcontrolname", "passengerBerthChoice"));
    }
    elements.extend(extra);
    elements.push(MockElement::new("button").text("Continue").navigates_to(PAYMENT));
    elements
}

fn site() -> MockSite {
    MockSite::new()
        .screen(HOME, search_screen(true))
        .screen(RESULTS, results_screen(LOGIN))
        .screen(LOGIN, login_screen(Vec::new(), PASSENGERS))
        .screen(PASSENGERS, passenger_screen(2, Vec::new()))
        .screen(PAYMENT, vec![MockElement::new("div").text("Payment options")])
        .screen(CONFIRMED, vec![MockElement::new("div").text("Booking confirmed")])
}

// Requests and engines

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn passenger(name: &str, age: u8, gender: Gender) -> Passenger {
    Passenger {
        name: name.to_string(),
        age,
        gender,
        berth: BerthPreference::Lower,
    }
}

fn request(classes: &[FareClass], time_preference: TimePreference) -> BookingRequest {
    BookingRequest {
        source: StationCode::parse("NDLS").unwrap(),
        destination: StationCode::parse("HWH").unwrap(),
        journey_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
        class_priority: classes.to_vec(),
        time_preference,
        mode: BookingMode::Standard,
        passenger_count: 2,
        passengers: vec![
            passenger("Asha Rao", 34, Gender::Female),
            passenger("Vikram Rao", 36, Gender::Male),
        ],
        fallback_classes: Vec::new(),
    }
}

fn config() -> EngineConfig {
    EngineConfig::default()
        .with_home_url(HOME)
        .with_credentials(Credentials::new("asha", "secret"))
}

fn engine_at(
    factory: &MockPageFactory,
    config: EngineConfig,
    now: &str,
) -> Engine<MockPageFactory> {
    Engine::new(factory.clone(), config, SelectorTable::default())
        .with_clock(Arc::new(AnchoredClock::new(utc(now))))
}

fn engine(factory: &MockPageFactory, config: EngineConfig) -> Engine<MockPageFactory> {
    engine_at(factory, config, "2026-10-17T04:00:00Z")
}

fn entered(result: &BookingResult) -> Vec<Phase> {
    result
        .history
        .iter()
        .filter_map(|h| match h.event {
            Event::Entered { phase } => Some(phase),
            _ => None,
        })
        .collect()
}

fn train(n: &str) -> TrainNumber {
    TrainNumber::parse(n).unwrap()
}

async fn start(engine: &Engine<MockPageFactory>, req: BookingRequest) -> BookingResult {
    let started = engine.start(req).await.unwrap();
    engine.settled(started.run_id).await.unwrap()
}

// Scenarios

#[tokio::test(start_paused = true)]
async fn happy_path_reaches_payment() {
    let factory = MockPageFactory::new(site());
    let engine = engine(&factory, config());

    let result = start(
        &engine,
        request(&[FareClass::ThirdAc], TimePreference::Morning),
    )
    .await;

    assert_eq!(result.status, RunStatus::PaymentReady, "{result:#?}");
    assert_eq!(result.phase, Phase::Completed);
    assert_eq!(
        entered(&result),
        vec![
            Phase::Search,
            Phase::Select,
            Phase::ClassConfigure,
            Phase::Authenticate,
            Phase::PassengerDetails,
            Phase::PaymentHandoff,
            Phase::Completed,
        ]
    );
    assert!(result.errors.is_empty());

    // Morning departure with the top class open: 10 + 5.
    let selected = result
        .history
        .iter()
        .find_map(|h| match &h.event {
            Event::Selected {
                train,
                score,
                by_user,
            } => Some((train.clone(), *score, *by_user)),
            _ => None,
        })
        .unwrap();
    assert_eq!(selected, (train("12274"), 15, false));

    let choice = result.choice.unwrap();
    assert_eq!(choice.train, train("12274"));
    assert_eq!(choice.name, "DURONTO EXP");
    assert_eq!(choice.class, Some(FareClass::ThirdAc));

    let page = &factory.pages()[0];
    assert_eq!(page.url(), PAYMENT);
    let values: Vec<String> = page.fills().into_iter().map(|(_, v)| v).collect();
    for expected in ["NDLS", "HWH", "20/11/2026", "asha", "Asha Rao", "Vikram Rao", "36"] {
        assert!(values.iter().any(|v| v == expected), "{expected} not filled");
    }
}

#[tokio::test(start_paused = true)]
async fn ambiguous_results_wait_for_a_choice() {
    let factory = MockPageFactory::new(site());
    let schedule = StaticSchedule::new().with_route(
        StationCode::parse("NDLS").unwrap(),
        StationCode::parse("HWH").unwrap(),
        &["12302", "12274"],
    );
    let engine = engine(&factory, config()).with_schedule(Arc::new(schedule));

    // Nobody offers first AC and there is no time preference.
    let parked = start(&engine, request(&[FareClass::FirstAc], TimePreference::Any)).await;

    assert_eq!(parked.status, RunStatus::AwaitingUserChoice);
    assert_eq!(parked.suspension, Some(SuspendReason::AwaitingUserChoice));
    let order: Vec<&str> = parked
        .candidates
        .iter()
        .map(|r| r.candidate.id.as_str())
        .collect();
    assert_eq!(order, vec!["12274", "12304", "12302"]);
    let verified: Vec<Option<bool>> = parked
        .candidates
        .iter()
        .map(|r| r.candidate.schedule_verified)
        .collect();
    assert_eq!(verified, vec![Some(true), Some(false), Some(true)]);

    let id = parked.run_id;
    let checkpoint = parked.checkpoint;

    let err = engine
        .resume(
            id,
            Resolution::SelectCandidate {
                train: train("99999"),
                checkpoint,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownCandidate { .. }));

    let err = engine
        .resume(id, Resolution::ChallengeCleared { checkpoint })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ResolutionMismatch { .. }));

    engine
        .resume(
            id,
            Resolution::SelectCandidate {
                train: train("12302"),
                checkpoint,
            },
        )
        .await
        .unwrap();
    let done = engine.settled(id).await.unwrap();

    assert_eq!(done.status, RunStatus::PaymentReady, "{done:#?}");
    assert!(done.candidates.is_empty());
    let choice = done.choice.clone().unwrap();
    assert_eq!(choice.train, train("12302"));
    assert_eq!(choice.class, Some(FareClass::ThirdAc));
    assert!(done.history.iter().any(|h| matches!(
        &h.event,
        Event::Selected { by_user: true, train: t, .. } if *t == train("12302")
    )));

    // The same resolution again changes nothing.
    let again = engine
        .resume(
            id,
            Resolution::SelectCandidate {
                train: train("12302"),
                checkpoint,
            },
        )
        .await
        .unwrap();
    assert_eq!(again.status, RunStatus::PaymentReady);
    assert_eq!(again.history, done.history);
}

#[tokio::test(start_paused = true)]
async fn challenge_parks_until_cleared() {
    let site = site().screen(
        LOGIN,
        login_screen(
            vec![MockElement::new("input").attr("id", "captcha")],
            PASSENGERS,
        ),
    );
    let factory = MockPageFactory::new(site);
    let engine = engine(&factory, config());

    let parked = start(&engine, request(&[FareClass::ThirdAc], TimePreference::Morning)).await;

    assert_eq!(parked.status, RunStatus::ManualInterventionRequired);
    assert_eq!(parked.phase, Phase::Authenticate);
    assert_eq!(
        parked.suspension,
        Some(SuspendReason::Challenge {
            target: "challenge".to_string()
        })
    );
    assert_eq!(parked.errors[0].kind, ErrorKind::ManualChallengeDetected);

    // Stale checkpoint is ignored.
    let stale = engine
        .resume(
            parked.run_id,
            Resolution::ChallengeCleared {
                checkpoint: parked.checkpoint.map(|c| c + 7),
            },
        )
        .await
        .unwrap();
    assert_eq!(stale.status, RunStatus::ManualInterventionRequired);

    // The human solves the challenge and signs in.
    factory.pages()[0].navigate(PASSENGERS).await.unwrap();
    engine
        .resume(
            parked.run_id,
            Resolution::ChallengeCleared {
                checkpoint: parked.checkpoint,
            },
        )
        .await
        .unwrap();
    let done = engine.settled(parked.run_id).await.unwrap();

    assert_eq!(done.status, RunStatus::PaymentReady, "{done:#?}");
    let phases = entered(&done);
    assert_eq!(
        &phases[3..],
        &[
            Phase::Authenticate,
            Phase::PassengerDetails,
            Phase::PaymentHandoff,
            Phase::Completed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn lost_class_falls_back_to_next_choice() {
    const PICKED_3A: &str = "https://site.test/nget/booking/train-list?class=3A";
    const PICKED_2A: &str = "https://site.test/nget/booking/train-list?class=2A";

    let option = |class: &str, to: &str| class_option("12302", class).navigates_to(to);
    let site = site()
        .screen(
            RESULTS,
            vec![
                entry(
                    "RAJDHANI EXP (12302)",
                    "16:50",
                    "09:55",
                    &[("3A", "AVAILABLE-0042"), ("2A", "AVAILABLE-0004")],
                ),
                option("3A", PICKED_3A),
                option("2A", PICKED_2A),
            ],
        )
        .screen(
            PICKED_3A,
            vec![
                MockElement::new("div")
                    .attr("class", "selected-avl-status")
                    .text("REGRET"),
                option("2A", PICKED_2A),
            ],
        )
        .screen(
            PICKED_2A,
            vec![
                MockElement::new("div")
                    .attr("class", "selected-avl-status")
                    .text("AVAILABLE-0004"),
                book_now(LOGIN),
            ],
        );
    let factory = MockPageFactory::new(site);
    let engine = engine(&factory, config());

    let result = start(
        &engine,
        request(&[FareClass::ThirdAc, FareClass::SecondAc], TimePreference::Any),
    )
    .await;

    assert_eq!(result.status, RunStatus::PaymentReady, "{result:#?}");
    assert_eq!(result.choice.unwrap().class, Some(FareClass::SecondAc));
    let substituted = result
        .history
        .iter()
        .find_map(|h| match &h.event {
            Event::ClassSubstituted {
                from, to, observed, ..
            } => Some((*from, *to, observed.clone())),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        substituted,
        (
            FareClass::ThirdAc,
            Some(FareClass::SecondAc),
            SeatStatus::NotAvailable
        )
    );
}

#[tokio::test(start_paused = true)]
async fn known_redirect_fast_forwards() {
    // Already signed in: Book Now lands straight on the passenger form.
    let site = site().screen(RESULTS, results_screen(PASSENGERS));
    let factory = MockPageFactory::new(site);
    let engine = engine(&factory, config());

    let result = start(&engine, request(&[FareClass::ThirdAc], TimePreference::Morning)).await;

    assert_eq!(result.status, RunStatus::PaymentReady, "{result:#?}");
    assert!(!entered(&result).contains(&Phase::Authenticate));
    assert!(result.history.iter().any(|h| matches!(
        h.event,
        Event::FastForward {
            from: Phase::ClassConfigure,
            to: Phase::PassengerDetails
        }
    )));
    assert_eq!(result.errors[0].kind, ErrorKind::UnexpectedRedirect);
}

#[tokio::test(start_paused = true)]
async fn session_renewed_once_then_aborts() {
    let site = site()
        .screen(LOGIN, login_screen(Vec::new(), EXPIRED))
        .screen(
            EXPIRED,
            vec![
                MockElement::new("div")
                    .attr("class", "session-expired")
                    .text("Session Expired"),
                MockElement::new("a").text("LOGIN").navigates_to(LOGIN),
            ],
        );
    let factory = MockPageFactory::new(site);
    let engine = engine(&factory, config());

    let result = start(&engine, request(&[FareClass::ThirdAc], TimePreference::Morning)).await;

    assert_eq!(result.status, RunStatus::Aborted, "{result:#?}");
    let renewals = result
        .history
        .iter()
        .filter(|h| matches!(h.event, Event::Reauthenticated { .. }))
        .count();
    assert_eq!(renewals, 1);
    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::SessionExpired);
    assert_eq!(error.phase, Phase::Authenticate);
}

#[tokio::test(start_paused = true)]
async fn search_retries_then_aborts() {
    let site = site().screen(HOME, search_screen(false));
    let factory = MockPageFactory::new(site);
    let engine = engine(&factory, config());

    let result = start(&engine, request(&[FareClass::ThirdAc], TimePreference::Any)).await;

    assert_eq!(result.status, RunStatus::Aborted);
    assert_eq!(result.errors.len(), 2);
    let error = result.error.clone().unwrap();
    assert_eq!(error.kind, ErrorKind::ElementNotFound);
    assert_eq!(error.phase, Phase::Search);
    assert_eq!(error.target.as_deref(), Some("search_button"));
    assert_eq!(error.retry_count, 1);
    assert_eq!(result.phase, Phase::Aborted);
    assert_eq!(entered(&result), vec![Phase::Search]);
}

#[tokio::test(start_paused = true)]
async fn quick_release_waits_for_opening() {
    let factory = MockPageFactory::new(site());
    // AC quota for 20 Nov opens 04:30 UTC on 19 Nov.
    let engine = engine_at(&factory, config(), "2026-11-19T04:29:50Z");
    let mut req = request(&[FareClass::ThirdAc], TimePreference::Morning);
    req.mode = BookingMode::QuickRelease;

    let result = start(&engine, req).await;

    assert_eq!(result.status, RunStatus::PaymentReady, "{result:#?}");
    assert!(!result.post_window);
    let waited = result
        .history
        .iter()
        .find_map(|h| match h.event {
            Event::GateReleased { waited_ms, .. } => Some(waited_ms),
            _ => None,
        })
        .unwrap();
    // Released 300ms ahead of 04:30:00.
    assert!((9_000..=9_700).contains(&waited), "waited {waited}ms");
}

#[tokio::test(start_paused = true)]
async fn quick_release_waits_an_hour_ahead() {
    let factory = MockPageFactory::new(site());
    let engine = engine_at(&factory, config(), "2026-11-19T03:30:00Z");
    let mut req = request(&[FareClass::ThirdAc], TimePreference::Morning);
    req.mode = BookingMode::QuickRelease;

    let result = start(&engine, req).await;

    assert_eq!(result.status, RunStatus::PaymentReady, "{result:#?}");
    assert!(!result.post_window);
    assert!(result.errors.is_empty());
    let waited = result
        .history
        .iter()
        .find_map(|h| match h.event {
            Event::GateReleased { waited_ms, .. } => Some(waited_ms),
            _ => None,
        })
        .unwrap();
    assert!((3_599_000..=3_599_700).contains(&waited), "waited {waited}ms");
}

#[tokio::test(start_paused = true)]
async fn quick_release_after_window() {
    let mut req = request(&[FareClass::ThirdAc], TimePreference::Morning);
    req.mode = BookingMode::QuickRelease;

    let factory = MockPageFactory::new(site());
    let engine = engine_at(&factory, config(), "2026-11-19T06:00:00Z");
    let proceeded = start(&engine, req.clone()).await;
    assert_eq!(proceeded.status, RunStatus::PaymentReady);
    assert!(proceeded.post_window);

    let factory = MockPageFactory::new(site());
    let engine = engine_at(
        &factory,
        config().with_proceed_after_window(false),
        "2026-11-19T06:00:00Z",
    );
    let stopped = start(&engine, req).await;
    assert_eq!(stopped.status, RunStatus::Aborted);
    assert!(stopped.post_window);
    assert_eq!(stopped.error.unwrap().kind, ErrorKind::ValidationError);
}

#[tokio::test(start_paused = true)]
async fn unfillable_required_field_needs_a_human() {
    let site = site().screen(
        PASSENGERS,
        passenger_screen(
            2,
            vec![
                MockElement::new("input")
                    .attr("formcontrolname", "psgnIdCardNumber")
                    .attr("required", ""),
            ],
        ),
    );
    let factory = MockPageFactory::new(site);
    let engine = engine(&factory, config());

    let parked = start(&engine, request(&[FareClass::ThirdAc], TimePreference::Morning)).await;

    assert_eq!(parked.status, RunStatus::ManualInterventionRequired);
    assert_eq!(parked.phase, Phase::PassengerDetails);
    assert_eq!(
        parked.suspension,
        Some(SuspendReason::ManualFields {
            fields: vec!["psgnIdCardNumber".to_string()]
        })
    );

    engine
        .resume(
            parked.run_id,
            Resolution::ChallengeCleared {
                checkpoint: parked.checkpoint,
            },
        )
        .await
        .unwrap();
    let done = engine.settled(parked.run_id).await.unwrap();
    assert_eq!(done.status, RunStatus::PaymentReady, "{done:#?}");
    assert_eq!(factory.pages()[0].url(), PAYMENT);
}

#[tokio::test(start_paused = true)]
async fn repeated_acknowledgment_does_not_lift_later_suspension() {
    let site = site()
        .screen(
            LOGIN,
            login_screen(
                vec![MockElement::new("input").attr("id", "captcha")],
                PASSENGERS,
            ),
        )
        .screen(
            PASSENGERS,
            passenger_screen(
                2,
                vec![
                    MockElement::new("input")
                        .attr("formcontrolname", "psgnIdCardNumber")
                        .attr("required", ""),
                ],
            ),
        );
    let factory = MockPageFactory::new(site);
    let engine = engine(&factory, config());

    let challenged = start(&engine, request(&[FareClass::ThirdAc], TimePreference::Morning)).await;
    assert_eq!(challenged.phase, Phase::Authenticate);
    let id = challenged.run_id;

    factory.pages()[0].navigate(PASSENGERS).await.unwrap();
    engine
        .resume(id, Resolution::ChallengeCleared { checkpoint: None })
        .await
        .unwrap();
    let fields = engine.settled(id).await.unwrap();
    assert_eq!(fields.status, RunStatus::ManualInterventionRequired);
    assert_eq!(fields.phase, Phase::PassengerDetails);
    assert!(matches!(
        fields.suspension,
        Some(SuspendReason::ManualFields { .. })
    ));

    // The first acknowledgment delivered twice.
    let repeated = engine
        .resume(id, Resolution::ChallengeCleared { checkpoint: None })
        .await
        .unwrap();
    assert_eq!(repeated.status, RunStatus::ManualInterventionRequired);
    assert_eq!(repeated.phase, Phase::PassengerDetails);
    assert_eq!(engine.settled(id).await.unwrap().history, fields.history);

    // Naming the checkpoint lifts the field suspension.
    engine
        .resume(
            id,
            Resolution::ChallengeCleared {
                checkpoint: fields.checkpoint,
            },
        )
        .await
        .unwrap();
    let done = engine.settled(id).await.unwrap();
    assert_eq!(done.status, RunStatus::PaymentReady, "{done:#?}");
    assert_eq!(factory.pages()[0].url(), PAYMENT);
}

#[tokio::test(start_paused = true)]
async fn refresh_detects_confirmation() {
    let factory = MockPageFactory::new(site());
    let engine = engine(&factory, config());

    let ready = start(&engine, request(&[FareClass::ThirdAc], TimePreference::Morning)).await;
    assert_eq!(ready.status, RunStatus::PaymentReady);

    let still = engine.refresh(ready.run_id).await.unwrap();
    assert_eq!(still.status, RunStatus::PaymentReady);

    factory.pages()[0].navigate(CONFIRMED).await.unwrap();
    let done = engine.refresh(ready.run_id).await.unwrap();
    assert_eq!(done.status, RunStatus::Completed);
    assert!(
        done.history
            .iter()
            .any(|h| matches!(&h.event, Event::Confirmed { url } if url == CONFIRMED))
    );
    assert_eq!(engine.status(ready.run_id).unwrap().status, RunStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn close_is_idempotent() {
    let factory = MockPageFactory::new(site());
    let engine = engine(&factory, config());

    let parked = start(&engine, request(&[FareClass::FirstAc], TimePreference::Any)).await;
    assert_eq!(parked.status, RunStatus::AwaitingUserChoice);
    assert_eq!(engine.keep_alive().await, 1);

    let closed = engine.close(parked.run_id).await.unwrap();
    assert_eq!(closed.status, RunStatus::Aborted);
    assert!(matches!(closed.history.last().unwrap().event, Event::Closed));

    let again = engine.close(parked.run_id).await.unwrap();
    assert_eq!(again.history, closed.history);
    assert_eq!(factory.pages()[0].close_calls(), 1);
    assert!(factory.pages()[0].is_closed());
    assert_eq!(engine.keep_alive().await, 0);

    // Closed runs leave the registry but stay queryable.
    assert!(engine.runs().is_empty());
    assert_eq!(engine.status(parked.run_id).unwrap().history, closed.history);
    let resumed = engine
        .resume(
            parked.run_id,
            Resolution::SelectCandidate {
                train: train("12274"),
                checkpoint: parked.checkpoint,
            },
        )
        .await
        .unwrap();
    assert_eq!(resumed.status, RunStatus::Aborted);
    assert_eq!(factory.pages().len(), 1);

    // Its id is not handed out again.
    let reused = engine
        .start_with_id(
            parked.run_id,
            request(&[FareClass::ThirdAc], TimePreference::Any),
        )
        .await
        .unwrap_err();
    assert_eq!(reused, EngineError::DuplicateRun(parked.run_id));
}

#[tokio::test(start_paused = true)]
async fn runs_are_isolated() {
    let factory = MockPageFactory::new(site());
    let engine = engine(&factory, config());

    let first = engine
        .start(request(&[FareClass::ThirdAc], TimePreference::Morning))
        .await
        .unwrap();
    let second = engine
        .start_with_id(
            RunId(40),
            request(&[FareClass::FirstAc], TimePreference::Any),
        )
        .await
        .unwrap();
    let dup = engine
        .start_with_id(
            RunId(40),
            request(&[FareClass::ThirdAc], TimePreference::Any),
        )
        .await
        .unwrap_err();
    assert_eq!(dup, EngineError::DuplicateRun(RunId(40)));

    let first = engine.settled(first.run_id).await.unwrap();
    let second = engine.settled(second.run_id).await.unwrap();
    assert_eq!(first.status, RunStatus::PaymentReady);
    assert_eq!(second.status, RunStatus::AwaitingUserChoice);
    assert_eq!(engine.runs(), vec![first.run_id, RunId(40)]);
    assert_eq!(factory.pages().len(), 2);

    let invalid = engine
        .start(BookingRequest {
            passenger_count: 0,
            ..request(&[FareClass::ThirdAc], TimePreference::Any)
        })
        .await
        .unwrap_err();
    assert!(matches!(invalid, EngineError::InvalidRequest(_)));
    assert_eq!(factory.pages().len(), 2);

    assert!(matches!(
        engine.status(RunId(999)),
        Err(EngineError::UnknownRun(RunId(999)))
    ));
}
