//! Caching layer for timetable lookups.
//!
//! Timetables change rarely, so an entry per station pair is kept for a
//! long TTL. Failed lookups are not cached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::domain::StationCode;

use super::ScheduleSource;
use super::error::ScheduleError;
use super::types::ScheduledTrain;

type PairKey = (StationCode, StationCode);

type PairEntry = Arc<Vec<ScheduledTrain>>;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(6 * 60 * 60),
            max_capacity: 1000,
        }
    }
}

/// A [`ScheduleSource`] that remembers answers per station pair.
pub struct CachedScheduleClient<S> {
    inner: S,
    pairs: MokaCache<PairKey, PairEntry>,
}

impl<S: ScheduleSource> CachedScheduleClient<S> {
    pub fn new(inner: S, config: &CacheConfig) -> Self {
        let pairs = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();
        Self { inner, pairs }
    }

    /// Access the underlying source for lookups that bypass the cache.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn entry_count(&self) -> u64 {
        self.pairs.entry_count()
    }

    pub fn invalidate_all(&self) {
        self.pairs.invalidate_all();
    }
}

#[async_trait]
impl<S: ScheduleSource> ScheduleSource for CachedScheduleClient<S> {
    async fn trains_between(
        &self,
        from: StationCode,
        to: StationCode,
    ) -> Result<Vec<ScheduledTrain>, ScheduleError> {
        let key = (from, to);
        if let Some(cached) = self.pairs.get(&key).await {
            debug!(%from, %to, "timetable cache hit");
            return Ok(cached.as_ref().clone());
        }

        let trains = self.inner.trains_between(from, to).await?;
        self.pairs.insert(key, Arc::new(trains.clone())).await;
        Ok(trains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::StaticSchedule;

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let source = StaticSchedule::new().with_route(code("NDLS"), code("HWH"), &["12301", "12303"]);
        let cached = CachedScheduleClient::new(source, &CacheConfig::default());

        let first = cached.trains_between(code("NDLS"), code("HWH")).await.unwrap();
        let second = cached.trains_between(code("NDLS"), code("HWH")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.inner().calls(), 1);
    }

    #[tokio::test]
    async fn pairs_are_directional() {
        let source = StaticSchedule::new().with_route(code("NDLS"), code("HWH"), &["12301"]);
        let cached = CachedScheduleClient::new(source, &CacheConfig::default());

        assert_eq!(cached.trains_between(code("NDLS"), code("HWH")).await.unwrap().len(), 1);
        assert!(cached.trains_between(code("HWH"), code("NDLS")).await.unwrap().is_empty());
        assert_eq!(cached.inner().calls(), 2);
    }
}
