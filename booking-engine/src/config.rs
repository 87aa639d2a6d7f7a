//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::engine::{Credentials, EngineConfig};
use crate::page::WebDriverConfig;
use crate::schedule::ScheduleConfig;
use crate::selector::{SelectorTable, SelectorTableError};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is set but {missing} is not")]
    PartialCredentials {
        name: &'static str,
        missing: &'static str,
    },

    #[error("invalid BIND_ADDR {value:?}: {source}")]
    BindAddr {
        value: String,
        source: std::net::AddrParseError,
    },

    #[error(transparent)]
    Selectors(#[from] SelectorTableError),
}

/// Settings for the server binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub webdriver: WebDriverConfig,
    pub credentials: Option<Credentials>,
    /// Timetable cross-check is enabled when a key is present.
    pub schedule: Option<ScheduleConfig>,
    /// JSON selector overrides merged over the built-in table.
    pub selectors: Option<PathBuf>,
}

impl AppConfig {
    /// Read `IRCTC_USERNAME`, `IRCTC_PASSWORD`, `WEBDRIVER_URL`,
    /// `WEBDRIVER_HEADLESS`, `RAILRADAR_API_KEY`, `BOOKING_SELECTORS` and
    /// `BIND_ADDR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let credentials = match (var("IRCTC_USERNAME"), var("IRCTC_PASSWORD")) {
            (Some(user), Some(pass)) => Some(Credentials::new(user, pass)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::PartialCredentials {
                    name: "IRCTC_USERNAME",
                    missing: "IRCTC_PASSWORD",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::PartialCredentials {
                    name: "IRCTC_PASSWORD",
                    missing: "IRCTC_USERNAME",
                });
            }
        };

        let bind = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|source| ConfigError::BindAddr { value: bind, source })?;

        let mut webdriver = match var("WEBDRIVER_URL") {
            Some(url) => WebDriverConfig::new(url),
            None => WebDriverConfig::default(),
        };
        if let Some(headless) = var("WEBDRIVER_HEADLESS") {
            webdriver = webdriver.with_headless(matches!(
                headless.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ));
        }

        Ok(Self {
            bind_addr,
            webdriver,
            credentials,
            schedule: var("RAILRADAR_API_KEY").map(ScheduleConfig::new),
            selectors: var("BOOKING_SELECTORS").map(PathBuf::from),
        })
    }

    /// The built-in selector table with any configured overrides applied.
    pub fn selector_table(&self) -> Result<SelectorTable, ConfigError> {
        let table = SelectorTable::default();
        match &self.selectors {
            Some(path) => Ok(table.merged(SelectorTable::load(path)?)),
            None => Ok(table),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default();
        match &self.credentials {
            Some(credentials) => config.with_credentials(credentials.clone()),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::selector::targets;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert!(config.credentials.is_none());
        assert!(config.schedule.is_none());
        assert!(config.engine_config().credentials.is_none());
        assert_eq!(config.selector_table().unwrap(), SelectorTable::default());
    }

    #[test]
    fn reads_credentials_and_key() {
        let config = AppConfig::from_lookup(lookup(&[
            ("IRCTC_USERNAME", "asha"),
            ("IRCTC_PASSWORD", "hunter2"),
            ("RAILRADAR_API_KEY", "rr-key"),
            ("WEBDRIVER_URL", "http://grid:4444"),
            ("WEBDRIVER_HEADLESS", "true"),
            ("BIND_ADDR", "0.0.0.0:8080"),
        ]))
        .unwrap();
        assert_eq!(
            config.engine_config().credentials,
            Some(Credentials::new("asha", "hunter2"))
        );
        assert!(config.schedule.is_some());
        assert_eq!(config.webdriver.url, "http://grid:4444");
        assert!(config.webdriver.headless);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn half_credentials_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("IRCTC_USERNAME", "asha")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PartialCredentials {
                missing: "IRCTC_PASSWORD",
                ..
            }
        ));
    }

    #[test]
    fn bad_bind_addr_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("BIND_ADDR", "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::BindAddr { .. }));
    }

    #[test]
    fn selector_overrides_merge() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"book_now": [{{"by": "text", "tag": "button", "text": "Reserve"}}]}}"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let config = AppConfig::from_lookup(lookup(&[("BOOKING_SELECTORS", &path)])).unwrap();
        let table = config.selector_table().unwrap();

        assert_eq!(table.get(targets::BOOK_NOW).strategies.len(), 1);
        assert_eq!(
            table.get(targets::SEARCH_BUTTON),
            SelectorTable::default().get(targets::SEARCH_BUTTON)
        );
    }
}
