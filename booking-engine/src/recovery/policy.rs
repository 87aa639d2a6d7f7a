//! Per-kind recovery decisions.

use std::time::Duration;

use crate::engine::Phase;

use super::kind::ErrorKind;
use super::step::StepError;

/// Bounds for automatic recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPolicy {
    /// Retries of a failing phase before the run aborts.
    pub max_retries: u32,
    /// Retries for the search phase, which refills the form each time.
    pub search_retries: u32,
    pub base_backoff: Duration,
    pub backoff_factor: f64,
    pub max_backoff: Duration,
    /// Automatic re-authentications per run.
    pub max_session_renewals: u32,
}

impl RecoveryPolicy {
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_search_retries(mut self, n: u32) -> Self {
        self.search_retries = n;
        self
    }

    pub fn with_backoff(mut self, base: Duration, factor: f64, max: Duration) -> Self {
        self.base_backoff = base;
        self.backoff_factor = factor;
        self.max_backoff = max;
        self
    }

    /// Delay before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(attempt.min(30) as i32);
        self.base_backoff
            .mul_f64(factor)
            .min(self.max_backoff)
    }

    fn retry_limit(&self, phase: Phase) -> u32 {
        if phase == Phase::Search {
            self.search_retries
        } else {
            self.max_retries
        }
    }

    /// Decide what to do about `error` raised in `phase`.
    pub fn decide(
        &self,
        error: &StepError,
        phase: Phase,
        retries: u32,
        session_renewals: u32,
        redirects: &RedirectRules,
    ) -> Recovery {
        if error.is_permanent() {
            return Recovery::Abort;
        }
        match error.kind() {
            ErrorKind::ElementNotFound | ErrorKind::Timeout => {
                if retries < self.retry_limit(phase) {
                    Recovery::Retry {
                        backoff: self.backoff(retries),
                    }
                } else {
                    Recovery::Abort
                }
            }
            ErrorKind::ManualChallengeDetected => Recovery::Suspend,
            ErrorKind::SessionExpired => {
                if session_renewals < self.max_session_renewals {
                    Recovery::Reauthenticate
                } else {
                    Recovery::Abort
                }
            }
            ErrorKind::UnexpectedRedirect => match error {
                StepError::Redirect { url } => redirects
                    .recognize(url, phase)
                    .map_or(Recovery::Abort, Recovery::FastForward),
                _ => Recovery::Abort,
            },
            ErrorKind::ValidationError => Recovery::Abort,
        }
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            search_retries: 1,
            base_backoff: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_backoff: Duration::from_secs(8),
            max_session_renewals: 1,
        }
    }
}

/// What the state machine does next after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Re-enter the same phase after a pause.
    Retry { backoff: Duration },
    /// Park the run until an external resume.
    Suspend,
    /// Sign in again, then re-enter the phase.
    Reauthenticate,
    /// Jump ahead to a recognised alternate success path.
    FastForward(Phase),
    Abort,
}

/// Known alternate success paths, keyed by URL fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRules {
    rules: Vec<(String, Phase)>,
}

impl RedirectRules {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with(mut self, marker: impl Into<String>, phase: Phase) -> Self {
        self.rules.push((marker.into(), phase));
        self
    }

    /// The phase `url` lands in, if it is a known path strictly ahead of
    /// `current`.
    pub fn recognize(&self, url: &str, current: Phase) -> Option<Phase> {
        self.rules
            .iter()
            .find(|(marker, _)| url.contains(marker.as_str()))
            .map(|(_, phase)| *phase)
            .filter(|phase| phase.ordinal() > current.ordinal() && !phase.is_terminal())
    }
}

impl Default for RedirectRules {
    /// Payment, passenger-input and login pages of the reservation site.
    fn default() -> Self {
        Self::empty()
            .with("/payment", Phase::PaymentHandoff)
            .with("psgninput", Phase::PassengerDetails)
            .with("reviewBooking", Phase::PaymentHandoff)
            .with("login", Phase::Authenticate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageError;
    use crate::selector::ResolveError;

    fn not_found() -> StepError {
        StepError::Resolve(ResolveError::ElementNotFound {
            target: "book_now".into(),
            attempted: vec![],
        })
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RecoveryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(10), Duration::from_secs(8));
    }

    #[test]
    fn transient_kinds_retry_then_abort() {
        let policy = RecoveryPolicy::default();
        let rules = RedirectRules::default();
        let err = not_found();

        assert_eq!(
            policy.decide(&err, Phase::ClassConfigure, 0, 0, &rules),
            Recovery::Retry {
                backoff: Duration::from_millis(500)
            }
        );
        assert!(matches!(
            policy.decide(&err, Phase::ClassConfigure, 2, 0, &rules),
            Recovery::Retry { .. }
        ));
        assert_eq!(
            policy.decide(&err, Phase::ClassConfigure, 3, 0, &rules),
            Recovery::Abort
        );

        // Search retries the fill once.
        assert!(matches!(
            policy.decide(&err, Phase::Search, 0, 0, &rules),
            Recovery::Retry { .. }
        ));
        assert_eq!(policy.decide(&err, Phase::Search, 1, 0, &rules), Recovery::Abort);
    }

    #[test]
    fn challenges_always_suspend() {
        let policy = RecoveryPolicy::default();
        let err = StepError::Challenge {
            target: "challenge".into(),
        };
        for retries in 0..5 {
            assert_eq!(
                policy.decide(&err, Phase::Authenticate, retries, 0, &RedirectRules::default()),
                Recovery::Suspend
            );
        }
    }

    #[test]
    fn only_human_steps_suspend() {
        let policy = RecoveryPolicy::default();
        let rules = RedirectRules::default();
        let manual = StepError::ManualInput {
            fields: vec!["psgnIdCardNumber".into()],
        };
        assert_eq!(
            policy.decide(&manual, Phase::PassengerDetails, 0, 0, &rules),
            Recovery::Suspend
        );

        let others = [
            not_found(),
            StepError::Validation("no bookable class".into()),
            StepError::NoCandidates,
            StepError::Page(PageError::Driver("socket closed".into())),
            StepError::SessionExpired {
                url: "https://site.test/session-expired".into(),
            },
            StepError::Redirect {
                url: "https://site.test/maintenance".into(),
            },
        ];
        for phase in [Phase::Search, Phase::Authenticate, Phase::PassengerDetails] {
            for err in &others {
                for retries in 0..4 {
                    assert_ne!(
                        policy.decide(err, phase, retries, 0, &rules),
                        Recovery::Suspend,
                        "{err} in {phase}"
                    );
                }
            }
        }
    }

    #[test]
    fn one_session_renewal_per_run() {
        let policy = RecoveryPolicy::default();
        let err = StepError::SessionExpired {
            url: "https://site.test/session-expired".into(),
        };
        let rules = RedirectRules::default();
        assert_eq!(
            policy.decide(&err, Phase::PassengerDetails, 0, 0, &rules),
            Recovery::Reauthenticate
        );
        assert_eq!(
            policy.decide(&err, Phase::PassengerDetails, 0, 1, &rules),
            Recovery::Abort
        );
    }

    #[test]
    fn redirects_fast_forward_only_when_recognised_and_ahead() {
        let policy = RecoveryPolicy::default();
        let rules = RedirectRules::default();
        let redirect = |url: &str| StepError::Redirect { url: url.into() };

        assert_eq!(
            policy.decide(
                &redirect("https://site.test/payment/bankSelection"),
                Phase::Authenticate,
                0,
                0,
                &rules
            ),
            Recovery::FastForward(Phase::PaymentHandoff)
        );
        assert_eq!(
            policy.decide(&redirect("https://site.test/login"), Phase::PassengerDetails, 0, 0, &rules),
            Recovery::Abort
        );
        assert_eq!(
            policy.decide(&redirect("https://elsewhere.test/"), Phase::Select, 0, 0, &rules),
            Recovery::Abort
        );
    }

    #[test]
    fn validation_and_permanent_failures_abort() {
        let policy = RecoveryPolicy::default();
        let rules = RedirectRules::default();
        assert_eq!(
            policy.decide(&StepError::Validation("bad".into()), Phase::Select, 0, 0, &rules),
            Recovery::Abort
        );
        assert_eq!(
            policy.decide(
                &StepError::Resolve(ResolveError::EmptySpec { target: "x".into() }),
                Phase::Search,
                0,
                0,
                &rules
            ),
            Recovery::Abort
        );
    }
}
