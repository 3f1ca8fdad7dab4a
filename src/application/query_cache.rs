// Keyed query cache - dedupes in-flight fetches, tracks staleness, retries with backoff
use crate::domain::coordinate::Coordinate;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Realtime,
    Historical,
    Events,
    Imagery,
    Measurements,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub kind: QueryKind,
    pub params: String,
}

impl QueryKey {
    pub fn new(kind: QueryKind, params: impl Into<String>) -> Self {
        Self {
            kind,
            params: params.into(),
        }
    }

    /// Coordinates are keyed to four decimals (about 11 m).
    pub fn for_coordinate(kind: QueryKind, coord: Option<&Coordinate>) -> Self {
        let params = match coord {
            Some(c) => format!("{:.4},{:.4}", c.lat, c.lon),
            None => "default".to_string(),
        };
        Self::new(kind, params)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[{}]", self.kind, self.params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryPolicy {
    pub stale_time: Duration,
    pub refetch_interval: Option<Duration>,
    pub gc_time: Duration,
    pub retries: u32,
    pub retry_base: Duration,
    pub retry_cap: Duration,
}

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

impl QueryPolicy {
    pub fn for_kind(kind: QueryKind) -> Self {
        let base = QueryPolicy {
            stale_time: Duration::ZERO,
            refetch_interval: None,
            gc_time: 5 * MINUTE,
            retries: 2,
            retry_base: Duration::from_millis(1000),
            retry_cap: Duration::from_millis(30_000),
        };

        match kind {
            QueryKind::Realtime => QueryPolicy {
                stale_time: Duration::from_secs(10),
                refetch_interval: Some(Duration::from_secs(30)),
                ..base
            },
            QueryKind::Historical => QueryPolicy {
                stale_time: 5 * MINUTE,
                gc_time: 30 * MINUTE,
                ..base
            },
            QueryKind::Events => QueryPolicy {
                stale_time: 2 * MINUTE,
                refetch_interval: Some(5 * MINUTE),
                retries: 3,
                ..base
            },
            QueryKind::Imagery => QueryPolicy {
                stale_time: 2 * HOUR,
                gc_time: 24 * HOUR,
                ..base
            },
            // Demonstration data covers for a missing upstream, so fail fast
            QueryKind::Measurements => QueryPolicy {
                stale_time: 5 * MINUTE,
                gc_time: 30 * MINUTE,
                retries: 0,
                ..base
            },
        }
    }

    /// min(base * 2^attempt, cap)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.retry_base
            .checked_mul(factor)
            .unwrap_or(self.retry_cap)
            .min(self.retry_cap)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    #[error("query {key} failed after {attempts} attempt(s): {message}")]
    Exhausted {
        key: String,
        attempts: u32,
        message: String,
    },
}

/// A cached value and whether it had to be served past a failed refresh.
#[derive(Debug, Clone)]
pub struct Cached<V> {
    pub value: V,
    pub stale: bool,
}

struct Entry<V> {
    value: V,
    fetched_at: Instant,
    last_access: Instant,
}

type InFlight<V> = Shared<BoxFuture<'static, Result<V, QueryError>>>;

struct Inner<V> {
    entries: Mutex<HashMap<QueryKey, Entry<V>>>,
    inflight: Mutex<HashMap<QueryKey, InFlight<V>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct QueryCache<V> {
    inner: Arc<Inner<V>>,
    policy: QueryPolicy,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            policy: self.policy,
        }
    }
}

/// Aborts the background task when dropped.
pub struct TaskGuard(JoinHandle<()>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(policy: QueryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                inflight: Mutex::new(HashMap::new()),
            }),
            policy,
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    /// Serve a fresh entry, otherwise fetch (sharing any fetch already running).
    /// When every attempt fails, the last good value is returned marked stale.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Cached<V>, QueryError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        if let Some(fresh) = self.fresh(&key) {
            return Ok(fresh);
        }
        self.refresh(key, fetcher).await
    }

    /// Like [`fetch`](Self::fetch) but ignores freshness.
    pub async fn refresh<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Cached<V>, QueryError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let inflight = self.join_or_start(key.clone(), fetcher);

        match inflight.await {
            Ok(value) => Ok(Cached {
                value,
                stale: false,
            }),
            Err(err) => {
                let mut entries = lock(&self.inner.entries);
                match entries.get_mut(&key) {
                    Some(entry) => {
                        tracing::warn!(%key, "Serving cached value after failed refresh: {}", err);
                        entry.last_access = Instant::now();
                        Ok(Cached {
                            value: entry.value.clone(),
                            stale: true,
                        })
                    }
                    None => Err(err),
                }
            }
        }
    }

    fn fresh(&self, key: &QueryKey) -> Option<Cached<V>> {
        let mut entries = lock(&self.inner.entries);
        let entry = entries.get_mut(key)?;
        entry.last_access = Instant::now();
        if entry.fetched_at.elapsed() < self.policy.stale_time {
            Some(Cached {
                value: entry.value.clone(),
                stale: false,
            })
        } else {
            None
        }
    }

    fn join_or_start<F, Fut>(&self, key: QueryKey, fetcher: F) -> InFlight<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let mut inflight = lock(&self.inner.inflight);
        if let Some(running) = inflight.get(&key) {
            tracing::debug!(%key, "Joining in-flight query");
            return running.clone();
        }

        let inner = Arc::downgrade(&self.inner);
        let policy = self.policy;
        let task_key = key.clone();
        let future = async move {
            let result = fetch_with_retry(&task_key, &policy, &fetcher).await;
            if let Some(inner) = inner.upgrade() {
                if let Ok(value) = &result {
                    let now = Instant::now();
                    lock(&inner.entries).insert(
                        task_key.clone(),
                        Entry {
                            value: value.clone(),
                            fetched_at: now,
                            last_access: now,
                        },
                    );
                }
                lock(&inner.inflight).remove(&task_key);
            }
            result
        }
        .boxed()
        .shared();

        inflight.insert(key, future.clone());
        future
    }

    /// Drop entries nobody has read within the policy's gc window.
    pub fn collect_garbage(&self) -> usize {
        let inflight = lock(&self.inner.inflight);
        let mut entries = lock(&self.inner.entries);
        let before = entries.len();
        let gc_time = self.policy.gc_time;
        entries.retain(|key, entry| {
            inflight.contains_key(key) || entry.last_access.elapsed() < gc_time
        });
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "Collected idle query cache entries");
        }
        removed
    }

    pub fn spawn_gc_sweeper(&self, every: Duration) -> TaskGuard {
        let weak: Weak<Inner<V>> = Arc::downgrade(&self.inner);
        let policy = self.policy;
        TaskGuard(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                QueryCache { inner, policy }.collect_garbage();
            }
        }))
    }

    /// Keep `key` warm on the policy's refetch interval. `None` when the
    /// policy has no interval.
    pub fn spawn_refetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Option<TaskGuard>
    where
        F: Fn() -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let every = self.policy.refetch_interval?;
        let weak = Arc::downgrade(&self.inner);
        let policy = self.policy;
        Some(TaskGuard(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let cache = QueryCache { inner, policy };
                if let Err(e) = cache.refresh(key.clone(), fetcher.clone()).await {
                    tracing::warn!(%key, "Background refetch failed: {}", e);
                }
            }
        })))
    }
}

async fn fetch_with_retry<V, F, Fut>(key: &QueryKey, policy: &QueryPolicy, fetcher: &F) -> Result<V, QueryError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<V>>,
{
    let mut attempt = 0;
    loop {
        match fetcher().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.retries => {
                let delay = policy.retry_delay(attempt);
                tracing::debug!(%key, attempt, ?delay, "Query failed, retrying: {:#}", e);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(QueryError::Exhausted {
                    key: key.to_string(),
                    attempts: attempt + 1,
                    message: format!("{:#}", e),
                });
            }
        }
    }
}
