//! Cache entries and the fetch driver.
//!
//! Lock order: the store's entry map is always locked before an entry's state.
//! No entry lock is held while acquiring the map.

use finboard_core::{FinanceError, ResourceKey, Result};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::cache::Store;
use crate::options::{CacheConfig, RetryPolicy};
use crate::state::SharedError;

/// Type-erased payload shared by all subscribers of an entry.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

/// Type-erased fetch function.
pub(crate) type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Payload>> + Send + Sync>;

/// Published state of an entry.
#[derive(Clone)]
pub(crate) enum Status {
    Idle,
    Pending,
    Success(Payload),
    Error(SharedError),
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Pending => f.write_str("Pending"),
            Self::Success(_) => f.write_str("Success(..)"),
            Self::Error(err) => f.debug_tuple("Error").field(err).finish(),
        }
    }
}

struct EntryState {
    /// Bumped when the entry is retired; responses from older generations are dropped.
    generation: u64,
    in_flight: bool,
    invalidated: bool,
    refetch_queued: bool,
    retired: bool,
    failed: bool,
    data: Option<Payload>,
    updated_at: Option<Instant>,
    subscribers: usize,
    enabled_subscribers: usize,
    fetcher: Option<Fetcher>,
    retry: RetryPolicy,
    gc_time: Duration,
    gc_task: Option<JoinHandle<()>>,
}

impl EntryState {
    fn is_stale(&self, stale_time: Duration) -> bool {
        self.invalidated
            || self.failed
            || self.data.is_none()
            || self.updated_at.is_none_or(|at| at.elapsed() >= stale_time)
    }
}

/// A single keyed cache entry.
pub(crate) struct Entry {
    key: ResourceKey,
    state: Mutex<EntryState>,
    tx: watch::Sender<Status>,
    store: Weak<Store>,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.lock();
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("generation", &st.generation)
            .field("in_flight", &st.in_flight)
            .field("subscribers", &st.subscribers)
            .finish_non_exhaustive()
    }
}

impl Entry {
    pub(crate) fn new(key: ResourceKey, store: Weak<Store>, config: &CacheConfig) -> Arc<Self> {
        let (tx, _) = watch::channel(Status::Idle);
        Arc::new(Self {
            key,
            state: Mutex::new(EntryState {
                generation: 0,
                in_flight: false,
                invalidated: false,
                refetch_queued: false,
                retired: false,
                failed: false,
                data: None,
                updated_at: None,
                subscribers: 0,
                enabled_subscribers: 0,
                fetcher: None,
                retry: config.retry,
                gc_time: config.gc_time,
                gc_task: None,
            }),
            tx,
            store,
        })
    }

    pub(crate) const fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub(crate) fn receiver(&self) -> watch::Receiver<Status> {
        self.tx.subscribe()
    }

    /// Installs the latest fetcher and settings, and registers a subscriber.
    pub(crate) fn attach(&self, fetcher: Fetcher, config: &CacheConfig, enabled: bool) {
        let mut st = self.state.lock();
        st.fetcher = Some(fetcher);
        st.retry = config.retry;
        st.gc_time = config.gc_time;
        st.subscribers += 1;
        if enabled {
            st.enabled_subscribers += 1;
        }
        if let Some(task) = st.gc_task.take() {
            trace!(key = %self.key, "cancelled pending eviction");
            task.abort();
        }
    }

    /// Unregisters a subscriber, starting the retention window on the last one.
    pub(crate) fn detach(self: &Arc<Self>, enabled: bool) {
        let unused = {
            let mut st = self.state.lock();
            st.subscribers = st.subscribers.saturating_sub(1);
            if enabled {
                st.enabled_subscribers = st.enabled_subscribers.saturating_sub(1);
            }
            st.subscribers == 0
        };
        if unused {
            self.schedule_gc();
        }
    }

    /// Moves one subscriber between the enabled and disabled sets.
    pub(crate) fn toggle_enabled(self: &Arc<Self>, enabled: bool, stale_time: Duration) {
        {
            let mut st = self.state.lock();
            if enabled {
                st.enabled_subscribers += 1;
            } else {
                st.enabled_subscribers = st.enabled_subscribers.saturating_sub(1);
            }
        }
        if enabled {
            self.fetch_if_needed(stale_time);
        }
    }

    /// Starts a fetch unless one is in flight or the cached data is fresh.
    pub(crate) fn fetch_if_needed(self: &Arc<Self>, stale_time: Duration) -> bool {
        let mut st = self.state.lock();
        if st.retired || st.in_flight || !st.is_stale(stale_time) {
            return false;
        }
        self.start_fetch_locked(&mut st)
    }

    /// Starts a fetch unless one is already in flight.
    pub(crate) fn refetch(self: &Arc<Self>) -> bool {
        let mut st = self.state.lock();
        if st.retired || st.in_flight {
            return false;
        }
        self.start_fetch_locked(&mut st)
    }

    /// Marks the data stale and refetches for enabled subscribers.
    ///
    /// An in-flight request is not duplicated; the refetch is queued behind it.
    pub(crate) fn invalidate(self: &Arc<Self>) -> bool {
        let mut st = self.state.lock();
        if st.retired {
            return false;
        }
        st.invalidated = true;
        if st.enabled_subscribers == 0 {
            return false;
        }
        if st.in_flight {
            st.refetch_queued = true;
            return true;
        }
        self.start_fetch_locked(&mut st)
    }

    /// Detaches the entry from the store. Late responses are discarded.
    pub(crate) fn retire(&self) {
        let mut st = self.state.lock();
        st.retired = true;
        st.generation += 1;
        st.in_flight = false;
        st.refetch_queued = false;
        st.data = None;
        st.updated_at = None;
        if let Some(task) = st.gc_task.take() {
            task.abort();
        }
        self.tx.send_replace(Status::Idle);
    }

    pub(crate) fn data(&self) -> Option<Payload> {
        self.state.lock().data.clone()
    }

    pub(crate) fn set_data(self: &Arc<Self>, payload: Payload) {
        let unused = {
            let mut st = self.state.lock();
            st.data = Some(Arc::clone(&payload));
            st.updated_at = Some(Instant::now());
            st.failed = false;
            st.invalidated = false;
            self.tx.send_replace(Status::Success(payload));
            st.subscribers == 0
        };
        if unused {
            self.schedule_gc();
        }
    }

    pub(crate) fn status(&self) -> Status {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers
    }

    fn start_fetch_locked(self: &Arc<Self>, st: &mut EntryState) -> bool {
        let Some(fetcher) = st.fetcher.clone() else {
            return false;
        };
        let Ok(handle) = Handle::try_current() else {
            warn!(key = %self.key, "no tokio runtime, fetch not started");
            st.failed = true;
            st.refetch_queued = false;
            self.tx.send_replace(Status::Error(Arc::new(FinanceError::Cache(
                "no tokio runtime to run the fetch".to_string(),
            ))));
            return false;
        };
        st.in_flight = true;
        st.invalidated = false;
        st.refetch_queued = false;
        let generation = st.generation;
        let retry = st.retry;
        self.tx.send_replace(Status::Pending);
        debug!(key = %self.key, generation, "fetch started");

        let entry = Arc::clone(self);
        handle.spawn(async move {
            let result = fetch_with_retry(&entry.key, &fetcher, retry).await;
            entry.complete(generation, result);
        });
        true
    }

    fn complete(self: &Arc<Self>, generation: u64, result: Result<Payload>) {
        let unused = {
            let mut st = self.state.lock();
            if st.retired || st.generation != generation {
                debug!(key = %self.key, generation, "discarding superseded response");
                return;
            }
            st.in_flight = false;
            match result {
                Ok(payload) => {
                    debug!(key = %self.key, "fetch succeeded");
                    st.data = Some(Arc::clone(&payload));
                    st.updated_at = Some(Instant::now());
                    st.failed = false;
                    self.tx.send_replace(Status::Success(payload));
                }
                Err(err) => {
                    warn!(key = %self.key, error = %err, "fetch failed");
                    st.failed = true;
                    self.tx.send_replace(Status::Error(Arc::new(err)));
                }
            }
            if st.refetch_queued && st.enabled_subscribers > 0 {
                self.start_fetch_locked(&mut st);
            }
            st.subscribers == 0
        };
        if unused {
            self.schedule_gc();
        }
    }

    fn schedule_gc(self: &Arc<Self>) {
        let Ok(handle) = Handle::try_current() else {
            self.evict_if_unused();
            return;
        };

        let mut st = self.state.lock();
        if st.retired || st.in_flight || st.subscribers > 0 {
            return;
        }
        let gc_time = st.gc_time;
        trace!(key = %self.key, ?gc_time, "scheduling eviction");
        let entry = Arc::downgrade(self);
        let task = handle.spawn(async move {
            tokio::time::sleep(gc_time).await;
            if let Some(entry) = entry.upgrade() {
                entry.evict_if_unused();
            }
        });
        if let Some(previous) = st.gc_task.replace(task) {
            previous.abort();
        }
    }

    fn evict_if_unused(self: &Arc<Self>) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let mut entries = store.entries.lock();
        let mut st = self.state.lock();
        if st.retired || st.in_flight || st.subscribers > 0 {
            return;
        }
        if entries.get(&self.key).is_some_and(|e| Arc::ptr_eq(e, self)) {
            entries.remove(&self.key);
            st.retired = true;
            st.generation += 1;
            st.gc_task = None;
            debug!(key = %self.key, "evicted unused entry");
        }
    }
}

async fn fetch_with_retry(
    key: &ResourceKey,
    fetcher: &Fetcher,
    retry: RetryPolicy,
) -> Result<Payload> {
    let mut attempt = 0u32;
    loop {
        match fetcher().await {
            Ok(payload) => return Ok(payload),
            Err(err) if attempt < retry.max_retries => {
                attempt += 1;
                let delay = retry.delay_for(attempt);
                warn!(key = %key, attempt, ?delay, error = %err, "fetch failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Converts an erased status into a typed query state.
pub(crate) fn typed<T: Send + Sync + 'static>(
    key: &ResourceKey,
    status: &Status,
) -> crate::state::QueryState<T> {
    use crate::state::QueryState;

    match status {
        Status::Idle => QueryState::Idle,
        Status::Pending => QueryState::Pending,
        Status::Success(payload) => match Arc::clone(payload).downcast::<T>() {
            Ok(data) => QueryState::Success(data),
            Err(_) => QueryState::Error(Arc::new(type_mismatch::<T>(key))),
        },
        Status::Error(err) => QueryState::Error(Arc::clone(err)),
    }
}

pub(crate) fn type_mismatch<T>(key: &ResourceKey) -> FinanceError {
    FinanceError::Cache(format!(
        "entry {key} does not hold a {}",
        std::any::type_name::<T>()
    ))
}
