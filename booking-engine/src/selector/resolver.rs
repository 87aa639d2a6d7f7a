//! Strategy interpreter: resolves a [`SelectorSpec`] against a live page.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::page::{Locator, Page, PageError};

use super::error::ResolveError;
use super::table::SelectorSpec;

/// Timing and retry bounds for resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Overall budget for one resolution across all strategies.
    pub timeout: Duration,
    /// Budget for a single strategy (capped by what remains overall).
    pub strategy_timeout: Duration,
    /// How many times a still-loading strategy is re-queried before it
    /// counts as absent.
    pub transient_retries: u32,
    /// Pause between transient retries.
    pub poll_interval: Duration,
}

impl ResolverConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_strategy_timeout(mut self, timeout: Duration) -> Self {
        self.strategy_timeout = timeout;
        self
    }

    pub fn with_transient_retries(mut self, retries: u32) -> Self {
        self.transient_retries = retries;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            strategy_timeout: Duration::from_secs(3),
            transient_retries: 2,
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// An element together with how it was found.
#[derive(Debug, Clone)]
pub struct Resolved<E> {
    pub element: E,
    pub target: String,
    /// Position of the winning strategy in the spec.
    pub strategy_index: usize,
    pub locator: Locator,
}

/// What a strategy must produce to count as a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Want {
    /// Exactly one visible, interactable element.
    Unique,
    /// At least one visible element.
    Visible,
    /// At least one element, visible or not.
    Present,
}

/// Resolves logical targets by trying locator strategies in order.
///
/// Resolution is read-only: it queries the page but never clicks, fills
/// or navigates.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `spec` to exactly one interactable element within the
    /// configured overall timeout.
    pub async fn resolve<P: Page>(
        &self,
        page: &P,
        spec: &SelectorSpec,
    ) -> Result<Resolved<P::Element>, ResolveError> {
        self.resolve_with_timeout(page, spec, self.config.timeout)
            .await
    }

    pub async fn resolve_with_timeout<P: Page>(
        &self,
        page: &P,
        spec: &SelectorSpec,
        timeout: Duration,
    ) -> Result<Resolved<P::Element>, ResolveError> {
        let (index, mut found) = self.run(page, None, spec, timeout, Want::Unique).await?;
        Ok(Resolved {
            element: found.remove(0),
            target: spec.target.clone(),
            strategy_index: index,
            locator: spec.strategies[index].clone(),
        })
    }

    /// Every visible element matched by the first strategy that matches
    /// anything, in document order.
    pub async fn resolve_all<P: Page>(
        &self,
        page: &P,
        spec: &SelectorSpec,
    ) -> Result<Vec<P::Element>, ResolveError> {
        let (_, found) = self
            .run(page, None, spec, self.config.timeout, Want::Visible)
            .await?;
        Ok(found)
    }

    /// The `n`-th (0-based) visible match, for repeated form rows such as
    /// one field per passenger.
    pub async fn resolve_nth<P: Page>(
        &self,
        page: &P,
        spec: &SelectorSpec,
        n: usize,
    ) -> Result<Resolved<P::Element>, ResolveError> {
        let attempted = || spec.strategies.iter().map(ToString::to_string).collect();
        let (index, found) = self
            .run(page, None, spec, self.config.timeout, Want::Visible)
            .await?;
        let element = found
            .into_iter()
            .nth(n)
            .ok_or_else(|| ResolveError::ElementNotFound {
                target: format!("{}[{n}]", spec.target),
                attempted: attempted(),
            })?;
        Ok(Resolved {
            element,
            target: spec.target.clone(),
            strategy_index: index,
            locator: spec.strategies[index].clone(),
        })
    }

    /// Look for an optional visible element without waiting the full
    /// timeout. Absence is `Ok(None)`.
    pub async fn probe<P: Page>(
        &self,
        page: &P,
        spec: &SelectorSpec,
        timeout: Duration,
    ) -> Result<Option<P::Element>, ResolveError> {
        match self.run(page, None, spec, timeout, Want::Visible).await {
            Ok((_, mut found)) => Ok(Some(found.remove(0))),
            Err(ResolveError::ElementNotFound { .. } | ResolveError::Timeout { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Text of the first element below `scope` matching `spec`, if any.
    ///
    /// Used for reading fields out of a result entry, where hidden
    /// elements still carry useful text.
    pub async fn read_within<P: Page>(
        &self,
        page: &P,
        scope: &P::Element,
        spec: &SelectorSpec,
    ) -> Result<Option<String>, ResolveError> {
        let found = match self
            .run(page, Some(scope), spec, self.config.strategy_timeout, Want::Present)
            .await
        {
            Ok((_, found)) => found,
            Err(ResolveError::ElementNotFound { .. } | ResolveError::Timeout { .. }) => {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let text = page.text(&found[0]).await.map_err(|source| ResolveError::Page {
            target: spec.target.clone(),
            source,
        })?;
        Ok(Some(text))
    }

    /// Every element below `scope` matching `spec`. Absence is empty.
    pub async fn all_within<P: Page>(
        &self,
        page: &P,
        scope: &P::Element,
        spec: &SelectorSpec,
    ) -> Result<Vec<P::Element>, ResolveError> {
        match self
            .run(page, Some(scope), spec, self.config.strategy_timeout, Want::Present)
            .await
        {
            Ok((_, found)) => Ok(found),
            Err(ResolveError::ElementNotFound { .. } | ResolveError::Timeout { .. }) => {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn run<P: Page>(
        &self,
        page: &P,
        scope: Option<&P::Element>,
        spec: &SelectorSpec,
        timeout: Duration,
        want: Want,
    ) -> Result<(usize, Vec<P::Element>), ResolveError> {
        if spec.strategies.is_empty() {
            return Err(ResolveError::EmptySpec {
                target: spec.target.clone(),
            });
        }

        let deadline = Instant::now() + timeout;
        let mut attempted = Vec::with_capacity(spec.strategies.len());

        for (index, locator) in spec.strategies.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            attempted.push(locator.to_string());
            let budget = remaining.min(self.config.strategy_timeout);

            match tokio::time::timeout(budget, self.attempt(page, scope, locator, want)).await {
                Ok(Ok(Some(found))) => {
                    if index > 0 {
                        info!(
                            selector = %spec.target,
                            strategy = %locator,
                            index,
                            "resolved via fallback strategy"
                        );
                    } else {
                        debug!(selector = %spec.target, strategy = %locator, "resolved");
                    }
                    return Ok((index, found));
                }
                Ok(Ok(None)) => {
                    debug!(selector = %spec.target, strategy = %locator, "strategy found nothing");
                }
                Ok(Err(source)) => {
                    return Err(ResolveError::Page {
                        target: spec.target.clone(),
                        source,
                    });
                }
                Err(_) => {
                    debug!(selector = %spec.target, strategy = %locator, ?budget, "strategy timed out");
                }
            }
        }

        if Instant::now() >= deadline {
            Err(ResolveError::Timeout {
                target: spec.target.clone(),
                attempted,
            })
        } else {
            Err(ResolveError::ElementNotFound {
                target: spec.target.clone(),
                attempted,
            })
        }
    }

    /// One strategy. `Ok(None)` means definitively absent (or ambiguous,
    /// for [`Want::Unique`]); the caller moves on and never comes back.
    async fn attempt<P: Page>(
        &self,
        page: &P,
        scope: Option<&P::Element>,
        locator: &Locator,
        want: Want,
    ) -> Result<Option<Vec<P::Element>>, PageError> {
        let mut retries = 0;
        loop {
            match query(page, scope, locator, want).await {
                Ok(found) => return Ok(found),
                Err(PageError::NoSuchElement(_)) => return Ok(None),
                Err(e) if e.is_transient() => {
                    if retries >= self.config.transient_retries {
                        debug!(strategy = %locator, error = %e, "giving up on loading strategy");
                        return Ok(None);
                    }
                    retries += 1;
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn query<P: Page>(
    page: &P,
    scope: Option<&P::Element>,
    locator: &Locator,
    want: Want,
) -> Result<Option<Vec<P::Element>>, PageError> {
    let matched = match scope {
        Some(scope) => page.find_all_within(scope, locator).await?,
        None => page.find_all(locator).await?,
    };

    let mut kept = Vec::with_capacity(matched.len());
    for element in matched {
        let keep = match want {
            Want::Unique => page.is_interactable(&element).await?,
            Want::Visible => page.is_visible(&element).await?,
            Want::Present => true,
        };
        if keep {
            kept.push(element);
        }
    }

    match (want, kept.len()) {
        (_, 0) => Ok(None),
        (Want::Unique, 1) => Ok(Some(kept)),
        (Want::Unique, n) => {
            debug!(strategy = %locator, matches = n, "ambiguous strategy");
            Ok(None)
        }
        _ => Ok(Some(kept)),
    }
}
