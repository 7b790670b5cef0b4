//! Cache-wide defaults and per-query overrides.

use std::time::Duration;

/// Default retention window for entries without subscribers.
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(5 * 60);

/// Upper bound for exponential retry delays.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// How failed fetches are retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub delay: Duration,
    /// Double the delay after every retry, capped at 30 seconds.
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Never retry.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
            exponential: false,
        }
    }

    /// Retry up to `max_retries` times with a fixed delay.
    #[must_use]
    pub const fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            exponential: false,
        }
    }

    /// Retry up to `max_retries` times, doubling the delay each time.
    #[must_use]
    pub const fn exponential(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            delay: initial_delay,
            exponential: true,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential || attempt <= 1 {
            return self.delay;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }
}

/// Defaults applied to every query created by a [`QueryCache`](crate::QueryCache).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age after which cached data is refetched on a new subscription.
    pub stale_time: Duration,
    /// Retention window for entries without subscribers.
    pub gc_time: Duration,
    /// Retry policy for failed fetches.
    pub retry: RetryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            gc_time: DEFAULT_GC_TIME,
            retry: RetryPolicy::none(),
        }
    }
}

impl CacheConfig {
    /// Sets the default stale time.
    #[must_use]
    pub const fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Sets the default retention window.
    #[must_use]
    pub const fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    /// Sets the default retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Per-query overrides.
///
/// Unset fields fall back to the cache's [`CacheConfig`].
///
/// `enabled` is the caller's switch and can be flipped later with
/// [`Query::set_enabled`](crate::Query::set_enabled). `active` is the
/// parameter gate: an inactive query never fetches, whatever `enabled` says.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    /// Whether the query may fetch.
    pub enabled: bool,
    /// Whether the query's parameters allow a request at all.
    pub active: bool,
    /// Stale time override.
    pub stale_time: Option<Duration>,
    /// Retention window override.
    pub gc_time: Option<Duration>,
    /// Retry policy override.
    pub retry: Option<RetryPolicy>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            active: true,
            stale_time: None,
            gc_time: None,
            retry: None,
        }
    }
}

impl QueryOptions {
    /// Options with every field unset and fetching enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the query may fetch.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets whether the query's parameters allow a request.
    ///
    /// Unlike [`enabled`](Self::enabled), this cannot be overridden once the
    /// query exists.
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Returns true if the query may fetch right now.
    #[must_use]
    pub const fn can_fetch(&self) -> bool {
        self.enabled && self.active
    }

    /// Overrides the stale time.
    #[must_use]
    pub const fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Overrides the retention window.
    #[must_use]
    pub const fn gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = Some(gc_time);
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Resolves the overrides against cache defaults.
    pub(crate) fn resolve(&self, defaults: &CacheConfig) -> CacheConfig {
        CacheConfig {
            stale_time: self.stale_time.unwrap_or(defaults.stale_time),
            gc_time: self.gc_time.unwrap_or(defaults.gc_time),
            retry: self.retry.unwrap_or(defaults.retry),
        }
    }
}
