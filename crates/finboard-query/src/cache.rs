//! The process-wide query cache.

use finboard_core::{FinanceError, ResourceKey, ResourceKind, Result};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::entry::{Entry, Fetcher, Payload, type_mismatch, typed};
use crate::options::{CacheConfig, QueryOptions};
use crate::query::Query;
use crate::state::{QueryState, SharedError};

/// Shared storage behind every clone of a [`QueryCache`].
pub(crate) struct Store {
    pub(crate) entries: Mutex<HashMap<ResourceKey, Arc<Entry>>>,
    config: CacheConfig,
}

/// Keyed store of query results.
///
/// Entries are created on first subscription, shared by every subscriber of
/// the same [`ResourceKey`], and evicted once they have had no subscribers for
/// their retention window. Cloning the cache is cheap; clones share entries.
///
/// Queries spawn their fetches on the current tokio runtime, so
/// [`query`](Self::query) must be called from within one.
///
/// # Example
///
/// ```rust,ignore
/// use finboard_query::{QueryCache, QueryOptions};
/// use finboard_core::{ResourceKey, ResourceKind};
///
/// let cache = QueryCache::new();
/// let key = ResourceKey::new(ResourceKind::StockQuote).with("AAPL");
/// let mut query = cache.query(key, QueryOptions::new(), move || {
///     let api = api.clone();
///     async move { api.stock_quote(&"AAPL".into()).await }
/// });
/// let state = query.settled().await;
/// ```
#[derive(Clone)]
pub struct QueryCache {
    store: Arc<Store>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_config(CacheConfig::default())
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("config", &self.store.config)
            .finish()
    }
}

impl QueryCache {
    /// Create an empty cache with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache with the given defaults.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            store: Arc::new(Store {
                entries: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Returns the cache-wide defaults.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.store.config
    }

    /// Subscribes to `key`, fetching with `fetcher` when needed.
    ///
    /// When `options.enabled` and `options.active` are both true and the entry
    /// has no fresh data, a fetch starts unless one is already in flight for
    /// the key. Otherwise nothing is fetched and the state stays whatever the
    /// entry holds (`Idle` for a new entry).
    ///
    /// Fetches run on the current tokio runtime. Outside one, the entry moves
    /// to an error state instead of fetching.
    #[instrument(
        skip_all,
        fields(key = %key, enabled = options.enabled, active = options.active)
    )]
    pub fn query<T, F, Fut>(&self, key: ResourceKey, options: QueryOptions, fetcher: F) -> Query<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let resolved = options.resolve(&self.store.config);
        let fetcher: Fetcher = Arc::new(move || {
            let fut = fetcher();
            async move { fut.await.map(|value| Arc::new(value) as Payload) }.boxed()
        });

        let entry = {
            let mut entries = self.store.entries.lock();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| {
                    debug!("creating entry");
                    Entry::new(key, Arc::downgrade(&self.store), &self.store.config)
                })
                .clone();
            entry.attach(fetcher, &resolved, options.can_fetch());
            entry
        };

        if options.can_fetch() {
            entry.fetch_if_needed(resolved.stale_time);
        }
        Query::new(entry, options.enabled, options.active, resolved.stale_time)
    }

    /// Resolves `key` once, sharing an in-flight request and returning fresh
    /// cached data without fetching.
    ///
    /// `options.enabled` is ignored. An inactive query fails with
    /// [`FinanceError::InvalidParameter`] without subscribing or fetching.
    pub async fn fetch_query<T, F, Fut>(
        &self,
        key: ResourceKey,
        options: QueryOptions,
        fetcher: F,
    ) -> std::result::Result<Arc<T>, SharedError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let label = key.to_string();
        if !options.active {
            debug!(key = %label, "refusing to resolve inactive query");
            return Err(Arc::new(FinanceError::InvalidParameter(format!(
                "query {label} is not active"
            ))));
        }
        let mut query = self.query(key, options.enabled(true), fetcher);
        match query.settled().await {
            QueryState::Success(data) => Ok(data),
            QueryState::Error(err) => Err(err),
            QueryState::Idle | QueryState::Pending => Err(Arc::new(FinanceError::Cache(format!(
                "entry {label} was removed before it settled"
            )))),
        }
    }

    /// Returns the last successful payload cached for `key`.
    #[must_use]
    pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &ResourceKey) -> Option<Arc<T>> {
        let entry = self.store.entries.lock().get(key).cloned()?;
        entry.data()?.downcast::<T>().ok()
    }

    /// Returns the current state of `key`, if the cache holds it.
    #[must_use]
    pub fn get_query_state<T: Send + Sync + 'static>(
        &self,
        key: &ResourceKey,
    ) -> Option<QueryState<T>> {
        let entry = self.store.entries.lock().get(key).cloned()?;
        Some(typed(key, &entry.status()))
    }

    /// Stores `value` as fresh data for `key`, notifying subscribers.
    ///
    /// Fails if the entry already holds data of a different type.
    #[instrument(skip_all, fields(key = %key))]
    pub fn set_query_data<T: Send + Sync + 'static>(
        &self,
        key: ResourceKey,
        value: T,
    ) -> Result<()> {
        let entry = {
            let mut entries = self.store.entries.lock();
            entries
                .entry(key.clone())
                .or_insert_with(|| {
                    Entry::new(key.clone(), Arc::downgrade(&self.store), &self.store.config)
                })
                .clone()
        };
        if entry.data().is_some_and(|data| !data.is::<T>()) {
            return Err(type_mismatch::<T>(&key));
        }
        entry.set_data(Arc::new(value));
        Ok(())
    }

    /// Marks `key` stale and refetches it if it has enabled subscribers.
    ///
    /// Returns true if a fetch was started or queued behind an in-flight one.
    #[instrument(skip_all, fields(key = %key))]
    pub fn invalidate(&self, key: &ResourceKey) -> bool {
        let entry = self.store.entries.lock().get(key).cloned();
        entry.is_some_and(|entry| entry.invalidate())
    }

    /// Invalidates every entry of `kind`. Returns the number of entries marked.
    #[instrument(skip(self))]
    pub fn invalidate_kind(&self, kind: ResourceKind) -> usize {
        self.invalidate_where(|key| key.kind() == kind)
    }

    /// Invalidates every entry whose key matches `predicate`.
    ///
    /// Returns the number of entries marked.
    pub fn invalidate_where(&self, predicate: impl Fn(&ResourceKey) -> bool) -> usize {
        let entries: Vec<Arc<Entry>> = self
            .store
            .entries
            .lock()
            .values()
            .filter(|entry| predicate(entry.key()))
            .cloned()
            .collect();
        for entry in &entries {
            entry.invalidate();
        }
        debug!(count = entries.len(), "invalidated entries");
        entries.len()
    }

    /// Removes `key` from the cache.
    ///
    /// A response still in flight for the removed entry is discarded. Existing
    /// handles stay attached to the detached entry and see `Idle`.
    #[instrument(skip_all, fields(key = %key))]
    pub fn remove(&self, key: &ResourceKey) -> bool {
        let mut entries = self.store.entries.lock();
        match entries.remove(key) {
            Some(entry) => {
                entry.retire();
                true
            }
            None => false,
        }
    }

    /// Removes every entry.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        let mut entries = self.store.entries.lock();
        for (_, entry) in entries.drain() {
            entry.retire();
        }
        debug!("cleared all entries");
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.entries.lock().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the cache holds an entry for `key`.
    #[must_use]
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.store.entries.lock().contains_key(key)
    }

    /// Returns the number of live handles subscribed to `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &ResourceKey) -> usize {
        self.store
            .entries
            .lock()
            .get(key)
            .map_or(0, |entry| entry.subscriber_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RetryPolicy;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    type TestFetcher<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

    fn quote_key(symbol: &str) -> ResourceKey {
        ResourceKey::new(ResourceKind::StockQuote).with(symbol)
    }

    /// Counts calls and resolves to `value` after `delay`.
    fn counting(calls: Arc<AtomicUsize>, value: u32, delay: Duration) -> TestFetcher<u32> {
        Box::new(move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(delay).await;
                Ok::<_, FinanceError>(value)
            }
            .boxed()
        })
    }

    /// Fails the first `failures` calls, then resolves to `value`.
    fn flaky(calls: Arc<AtomicUsize>, failures: usize, value: u32) -> TestFetcher<u32> {
        Box::new(move || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    Err(FinanceError::Network(format!("attempt {n} failed")))
                } else {
                    Ok(value)
                }
            }
            .boxed()
        })
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_query_stays_idle() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let query = cache.query(
            quote_key(""),
            QueryOptions::new().enabled(false),
            counting(calls.clone(), 1, ms(10)),
        );

        sleep(ms(100)).await;
        assert!(query.state().is_idle());
        assert!(!query.view().is_loading);
        assert!(!query.refetch());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_subscribers_share_one_request() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = quote_key("AAPL");

        let mut first = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 42, ms(50)),
        );
        let mut second = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 42, ms(50)),
        );
        let third = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 42, ms(50)),
        );
        assert_eq!(cache.subscriber_count(&key), 3);
        assert!(third.state().is_pending());

        assert_eq!(first.settled().await.data().map(|d| **d), Some(42));
        assert_eq!(second.settled().await.data().map(|d| **d), Some(42));
        assert_eq!(third.view().data.as_deref(), Some(&42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_carries_exact_payload() {
        let cache = QueryCache::new();
        let key = ResourceKey::new(ResourceKind::Search).with("ap");
        let mut query = cache.query(key.clone(), QueryOptions::new(), || async {
            Ok::<_, FinanceError>(vec!["AAPL".to_string(), "APP".to_string()])
        });

        assert!(query.state().is_pending());
        let state = query.settled().await;
        assert_eq!(
            state.data().map(|d| d.as_slice()),
            Some(&["AAPL".to_string(), "APP".to_string()][..]),
        );
        assert_eq!(
            cache.get_query_data::<Vec<String>>(&key).map(|d| d.len()),
            Some(2)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_preserves_reason() {
        let cache = QueryCache::new();
        let mut query = cache.query(quote_key("ZZZZ"), QueryOptions::new(), || async {
            Err::<u32, _>(FinanceError::Http {
                status: 500,
                body: "boom".to_string(),
            })
        });

        let state = query.settled().await;
        let err = state.error().expect("query should fail");
        assert!(matches!(&**err, FinanceError::Http { status: 500, body } if body == "boom"));
        assert_eq!(query.view().error.map(|e| e.to_string()), Some("HTTP 500: boom".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabling_triggers_fetch() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut query = cache.query(
            quote_key("AAPL"),
            QueryOptions::new().enabled(false),
            counting(calls.clone(), 7, ms(10)),
        );
        assert!(query.state().is_idle());

        query.set_enabled(true);
        assert!(query.state().is_pending());
        assert!(query.settled().await.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_does_not_cancel_in_flight_request() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut query = cache.query(
            quote_key("AAPL"),
            QueryOptions::new(),
            counting(calls.clone(), 7, ms(10)),
        );

        query.set_enabled(false);
        assert!(query.settled().await.is_success());
        assert!(!query.refetch());
        sleep(ms(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_data_is_served_without_fetching() {
        let cache = QueryCache::with_config(
            CacheConfig::default().with_stale_time(Duration::from_secs(60)),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let key = quote_key("AAPL");

        let mut first = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 1, ms(10)),
        );
        first.settled().await;
        drop(first);

        let second = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 1, ms(10)),
        );
        assert!(second.state().is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(61)).await;
        let mut third = cache.query(key, QueryOptions::new(), counting(calls.clone(), 2, ms(10)));
        assert!(third.state().is_pending());
        assert_eq!(third.settled().await.data().map(|d| **d), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parameter_change_is_an_independent_entry() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut apple = cache.query(
            quote_key("AAPL"),
            QueryOptions::new(),
            counting(calls.clone(), 1, ms(10)),
        );
        apple.settled().await;
        let mut msft = cache.query(
            quote_key("MSFT"),
            QueryOptions::new(),
            counting(calls.clone(), 2, ms(10)),
        );
        msft.settled().await;
        drop(apple);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_query_data::<u32>(&quote_key("AAPL")).as_deref(), Some(&1));
        assert_eq!(cache.get_query_data::<u32>(&quote_key("MSFT")).as_deref(), Some(&2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unused_entry_is_evicted_after_gc_time() {
        let cache = QueryCache::with_config(
            CacheConfig::default().with_gc_time(Duration::from_secs(10)),
        );
        let key = quote_key("AAPL");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut query = cache.query(key.clone(), QueryOptions::new(), counting(calls, 1, ms(10)));
        query.settled().await;
        drop(query);
        assert!(cache.contains(&key));

        sleep(Duration::from_secs(11)).await;
        assert!(!cache.contains(&key));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_keeps_entry_alive() {
        let cache = QueryCache::with_config(
            CacheConfig::default()
                .with_gc_time(Duration::from_secs(10))
                .with_stale_time(Duration::from_secs(3600)),
        );
        let key = quote_key("AAPL");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut query = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 1, ms(10)),
        );
        query.settled().await;
        drop(query);

        sleep(Duration::from_secs(5)).await;
        let again = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 1, ms(10)),
        );
        sleep(Duration::from_secs(20)).await;
        assert!(cache.contains(&key));
        assert!(again.state().is_success());

        drop(again);
        sleep(Duration::from_secs(11)).await;
        assert!(!cache.contains(&key));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_retries_exactly_n_times() {
        let cache = QueryCache::new();

        let calls = Arc::new(AtomicUsize::new(0));
        let mut query = cache.query(
            quote_key("AAPL"),
            QueryOptions::new().retry(RetryPolicy::fixed(2, ms(100))),
            flaky(calls.clone(), 2, 9),
        );
        assert_eq!(query.settled().await.data().map(|d| **d), Some(9));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let calls = Arc::new(AtomicUsize::new(0));
        let mut query = cache.query(
            quote_key("MSFT"),
            QueryOptions::new().retry(RetryPolicy::fixed(1, ms(100))),
            flaky(calls.clone(), 5, 9),
        );
        assert!(query.settled().await.is_error());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_does_not_retry() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut query = cache.query(
            quote_key("AAPL"),
            QueryOptions::new(),
            flaky(calls.clone(), 1, 9),
        );
        assert!(query.settled().await.is_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(query.refetch());
        assert!(query.settled().await.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_refetches() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = quote_key("AAPL");
        let mut query = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 1, ms(10)),
        );
        query.settled().await;

        assert!(cache.invalidate(&key));
        assert!(query.state().is_pending());
        query.settled().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_while_in_flight_queues_one_refetch() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = quote_key("AAPL");
        let mut query = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 1, ms(10)),
        );

        assert!(cache.invalidate(&key));
        assert!(cache.invalidate(&key));
        assert!(query.state().is_pending());

        assert!(query.settled().await.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_kind_marks_matching_entries() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let _a = cache.query(
            quote_key("AAPL"),
            QueryOptions::new().enabled(false),
            counting(calls.clone(), 1, ms(1)),
        );
        let _b = cache.query(
            quote_key("MSFT"),
            QueryOptions::new().enabled(false),
            counting(calls.clone(), 1, ms(1)),
        );
        let _c = cache.query(
            ResourceKey::new(ResourceKind::CompanyData).with("AAPL"),
            QueryOptions::new().enabled(false),
            counting(calls.clone(), 1, ms(1)),
        );

        assert_eq!(cache.invalidate_kind(ResourceKind::StockQuote), 2);
        assert_eq!(cache.invalidate_kind(ResourceKind::MarketNews), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_discards_late_response() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = quote_key("AAPL");
        let query = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 1, Duration::from_secs(1)),
        );

        assert!(cache.remove(&key));
        assert!(!cache.remove(&key));
        sleep(Duration::from_secs(2)).await;

        assert!(query.state().is_idle());
        assert!(cache.get_query_data::<u32>(&key).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_everything() {
        let cache = QueryCache::new();
        cache.set_query_data(quote_key("AAPL"), 1u32).unwrap();
        cache.set_query_data(quote_key("MSFT"), 2u32).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_query_data_notifies_and_checks_type() {
        let cache = QueryCache::new();
        let key = quote_key("AAPL");
        let mut query = cache.query(
            key.clone(),
            QueryOptions::new().enabled(false),
            || async { Ok::<_, FinanceError>(0u32) },
        );

        cache.set_query_data(key.clone(), 5u32).unwrap();
        assert_eq!(query.changed().await.data().map(|d| **d), Some(5));
        assert!(matches!(
            cache.get_query_state::<u32>(&key),
            Some(QueryState::Success(_))
        ));

        let err = cache.set_query_data(key, "five".to_string()).unwrap_err();
        assert!(matches!(err, FinanceError::Cache(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_mismatch_surfaces_as_error_state() {
        let cache = QueryCache::new();
        let key = quote_key("AAPL");
        cache.set_query_data(key.clone(), 5u32).unwrap();

        let query = cache.query(
            key,
            QueryOptions::new().enabled(false),
            || async { Ok::<_, FinanceError>(String::new()) },
        );
        assert!(matches!(
            query.state().error().map(|e| &**e),
            Some(FinanceError::Cache(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_query_shares_in_flight_request() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = quote_key("AAPL");
        let _live = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 3, ms(50)),
        );

        let value = cache
            .fetch_query(
                key,
                QueryOptions::new().enabled(false),
                counting(calls.clone(), 3, ms(50)),
            )
            .await
            .unwrap();
        assert_eq!(*value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_query_returns_shared_error() {
        let cache = QueryCache::new();
        let err = cache
            .fetch_query(quote_key("AAPL"), QueryOptions::new(), || async {
                Err::<u32, _>(FinanceError::Parse("bad json".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(&*err, FinanceError::Parse(msg) if msg == "bad json"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_query_ignores_set_enabled() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut query = cache.query(
            quote_key(""),
            QueryOptions::new().active(false),
            counting(calls.clone(), 1, ms(10)),
        );
        assert!(!query.is_active());
        assert!(!query.is_enabled());

        query.set_enabled(true);
        assert!(!query.is_enabled());
        assert!(!query.refetch());
        sleep(ms(100)).await;
        assert!(query.state().is_idle());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_query_refuses_inactive_query() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let err = cache
            .fetch_query(
                quote_key(""),
                QueryOptions::new().active(false),
                counting(calls.clone(), 1, ms(10)),
            )
            .await
            .unwrap_err();

        assert!(matches!(&*err, FinanceError::InvalidParameter(_)));
        assert!(cache.is_empty());
        sleep(ms(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_query_outside_runtime_reports_error() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = quote_key("AAPL");
        let query = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 1, ms(10)),
        );

        assert!(matches!(
            query.state().error().map(|e| &**e),
            Some(FinanceError::Cache(_))
        ));
        assert!(!query.view().is_loading);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        drop(query);
        assert!(!cache.contains(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_after_resubscribe_restarts_eviction_timer() {
        let cache = QueryCache::with_config(
            CacheConfig::default()
                .with_gc_time(Duration::from_secs(10))
                .with_stale_time(Duration::from_secs(3600)),
        );
        let key = quote_key("AAPL");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut query = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 1, ms(10)),
        );
        query.settled().await;
        drop(query);

        sleep(Duration::from_secs(5)).await;
        let again = cache.query(
            key.clone(),
            QueryOptions::new(),
            counting(calls.clone(), 1, ms(10)),
        );
        sleep(Duration::from_secs(1)).await;
        drop(again);

        // The first timer would have fired at 10s.
        sleep(Duration::from_secs(6)).await;
        assert!(cache.contains(&key));

        sleep(Duration::from_secs(5)).await;
        assert!(!cache.contains(&key));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryCache>();
        assert_send_sync::<Query<u32>>();
    }
}
