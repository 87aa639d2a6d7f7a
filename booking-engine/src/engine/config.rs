//! Engine configuration.

use std::fmt;
use std::time::Duration;

use crate::candidate::ScoringConfig;
use crate::recovery::{RecoveryPolicy, RedirectRules};
use crate::selector::ResolverConfig;
use crate::timing::QuickReleasePolicy;

/// Default landing page of the reservation site.
const DEFAULT_HOME_URL: &str = "https://www.irctc.co.in/nget/train-search";

/// Site account used for sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// URL fragments identifying where the browser is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationMarkers {
    pub results: Vec<String>,
    pub login: Vec<String>,
    pub passenger: Vec<String>,
    pub payment: Vec<String>,
    pub confirmation: Vec<String>,
    pub session_expired: Vec<String>,
}

impl LocationMarkers {
    pub fn matches(markers: &[String], url: &str) -> bool {
        let url = url.to_ascii_lowercase();
        markers
            .iter()
            .any(|marker| url.contains(&marker.to_ascii_lowercase()))
    }
}

impl Default for LocationMarkers {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            results: list(&["train-list"]),
            login: list(&["login"]),
            passenger: list(&["psgninput", "passenger"]),
            payment: list(&["/payment", "bkgpayment"]),
            confirmation: list(&["booking-confirm", "success", "confirmed"]),
            session_expired: list(&["session-expired", "sessionexpired"]),
        }
    }
}

/// Everything a booking run needs besides its request and page.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub home_url: String,
    pub credentials: Option<Credentials>,
    pub markers: LocationMarkers,
    pub redirects: RedirectRules,
    pub resolver: ResolverConfig,
    pub scoring: ScoringConfig,
    pub recovery: RecoveryPolicy,
    pub quick_release: QuickReleasePolicy,
    /// Continue as a standard booking when a quick-release run arrives
    /// after its window opened.
    pub proceed_after_window: bool,
    pub dismiss_popups: bool,
    /// How long to look for a popup or other optional element.
    pub probe_timeout: Duration,
    /// How long to wait for the browser to land on an expected page.
    pub navigation_timeout: Duration,
    pub poll_interval: Duration,
    /// Form control names the engine fills itself. A required field
    /// outside this list needs a human.
    pub automatable_fields: Vec<String>,
    /// Format of the journey date on the search form.
    pub date_format: String,
}

impl EngineConfig {
    pub fn with_home_url(mut self, url: impl Into<String>) -> Self {
        self.home_url = url.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_quick_release(mut self, policy: QuickReleasePolicy) -> Self {
        self.quick_release = policy;
        self
    }

    pub fn with_proceed_after_window(mut self, proceed: bool) -> Self {
        self.proceed_after_window = proceed;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn is_automatable(&self, field: &str) -> bool {
        self.automatable_fields.iter().any(|f| f == field)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home_url: DEFAULT_HOME_URL.to_string(),
            credentials: None,
            markers: LocationMarkers::default(),
            redirects: RedirectRules::default(),
            resolver: ResolverConfig::default(),
            scoring: ScoringConfig::default(),
            recovery: RecoveryPolicy::default(),
            quick_release: QuickReleasePolicy::default(),
            proceed_after_window: true,
            dismiss_popups: true,
            probe_timeout: Duration::from_millis(500),
            navigation_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(250),
            automatable_fields: [
                "origin",
                "destination",
                "jDate",
                "userid",
                "password",
                "passengerName",
                "passengerAge",
                "passengerGender",
                "passengerBerthChoice",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            date_format: "%d/%m/%Y".to_string(),
        }
    }
}
