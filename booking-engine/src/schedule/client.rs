//! RailRadar timetable HTTP client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::StationCode;

use super::ScheduleSource;
use super::error::ScheduleError;
use super::types::{Envelope, ScheduledTrain, TrainBetween};

const DEFAULT_BASE_URL: &str = "https://railradar.in/api/v1";

const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Configuration for the timetable client.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_concurrent: usize,
    pub timeout: Duration,
}

impl ScheduleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// RailRadar API client.
///
/// A semaphore bounds concurrent requests so a burst of runs does not
/// trip the API's rate limit.
#[derive(Debug, Clone)]
pub struct RailRadarClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl RailRadarClient {
    pub fn new(config: ScheduleConfig) -> Result<Self, ScheduleError> {
        let mut headers = HeaderMap::new();
        let api_key =
            HeaderValue::from_str(&config.api_key).map_err(|_| ScheduleError::InvalidKey)?;
        headers.insert("x-api-key", api_key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }
}

#[async_trait]
impl ScheduleSource for RailRadarClient {
    async fn trains_between(
        &self,
        from: StationCode,
        to: StationCode,
    ) -> Result<Vec<ScheduledTrain>, ScheduleError> {
        let _permit = self.semaphore.acquire().await.map_err(|_| ScheduleError::Api {
            status: 0,
            message: "Semaphore closed".to_string(),
        })?;

        let url = format!("{}/trains/between", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("from", from.as_str()), ("to", to.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ScheduleError::Unauthorized);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScheduleError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScheduleError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        parse_trains_between(&body)
    }
}

fn parse_trains_between(body: &str) -> Result<Vec<ScheduledTrain>, ScheduleError> {
    let envelope: Envelope<Vec<TrainBetween>> =
        serde_json::from_str(body).map_err(|e| ScheduleError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })?;

    if !envelope.success {
        return Err(ScheduleError::Api {
            status: 200,
            message: envelope
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "request unsuccessful".to_string()),
        });
    }

    let trains: Vec<ScheduledTrain> = envelope
        .data
        .unwrap_or_default()
        .iter()
        .filter_map(ScheduledTrain::from_wire)
        .collect();
    debug!(trains = trains.len(), "timetable lookup");
    Ok(trains)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders() {
        let config = ScheduleConfig::new("key")
            .with_base_url("http://localhost:9000/")
            .with_max_concurrent(2)
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.max_concurrent, 2);
        let client = RailRadarClient::new(config).unwrap();
        assert_eq!(client.base_url, "http://localhost:9000");
    }

    #[test]
    fn rejects_unprintable_key() {
        assert!(matches!(
            RailRadarClient::new(ScheduleConfig::new("bad\nkey")),
            Err(ScheduleError::InvalidKey)
        ));
    }

    #[test]
    fn unsuccessful_envelope_is_an_api_error() {
        let err =
            parse_trains_between(r#"{"success": false, "error": {"message": "Invalid station"}}"#)
                .unwrap_err();
        assert!(err.to_string().contains("Invalid station"));
    }

    #[test]
    fn garbage_body_is_a_json_error() {
        assert!(matches!(
            parse_trains_between("<html>"),
            Err(ScheduleError::Json { .. })
        ));
    }
}
