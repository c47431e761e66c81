//! Query cache with stale-while-revalidate freshness.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::retry::{BackoffPolicy, retry_with_backoff};
use crate::domain::entities::QueryKey;
use crate::domain::errors::QueryError;

/// Per-query freshness and refetch behaviour.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Whether automatic fetching is allowed at all.
    pub enabled: bool,
    /// Background polling interval. `None` disables polling.
    pub refetch_interval: Option<Duration>,
    /// Refetch when the window regains focus.
    pub refetch_on_window_focus: bool,
    /// Refetch when connectivity returns.
    pub refetch_on_reconnect: bool,
    /// How long fetched data is considered fresh.
    pub stale_time: Duration,
    /// How long unused data stays cached.
    pub gc_time: Duration,
    /// Retries after a failed fetch.
    pub retry: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            refetch_interval: None,
            refetch_on_window_focus: false,
            refetch_on_reconnect: true,
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(10 * 60),
            retry: 3,
        }
    }
}

impl QueryOptions {
    /// Sets the polling interval.
    #[must_use]
    pub const fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    /// Sets the stale time.
    #[must_use]
    pub const fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Sets focus refetching.
    #[must_use]
    pub const fn with_refetch_on_window_focus(mut self, enabled: bool) -> Self {
        self.refetch_on_window_focus = enabled;
        self
    }

    /// Sets the retry count.
    #[must_use]
    pub const fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }
}

struct CacheEntry {
    data: Arc<dyn Any + Send + Sync>,
    updated_at: Instant,
    last_accessed: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn is_stale(&self, stale_time: Duration, now: Instant) -> bool {
        self.invalidated || now.duration_since(self.updated_at) >= stale_time
    }
}

/// Shared query cache. Construct once and pass around behind an `Arc`.
pub struct QueryClient {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    defaults: QueryOptions,
    backoff: BackoffPolicy,
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("defaults", &self.defaults)
            .field("entries", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}

impl QueryClient {
    /// Creates a client with the given default options.
    #[must_use]
    pub fn new(defaults: QueryOptions) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            backoff: BackoffPolicy::QUERIES.with_max_retries(defaults.retry),
            defaults,
        }
    }

    /// Overrides the retry delays.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Default options applied to queries.
    #[must_use]
    pub const fn defaults(&self) -> &QueryOptions {
        &self.defaults
    }

    /// Returns cached data if it is still fresh, otherwise fetches it.
    ///
    /// # Errors
    /// Returns error if every fetch attempt fails or the cached type differs.
    pub async fn fetch_query<T, E, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<T, QueryError>
    where
        T: Clone + Send + Sync + 'static,
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.fetch_query_with(key, &self.defaults.clone(), fetcher).await
    }

    /// Like [`fetch_query`](Self::fetch_query) with explicit options.
    ///
    /// # Errors
    /// Returns error if every fetch attempt fails or the cached type differs.
    pub async fn fetch_query_with<T, E, F, Fut>(
        &self,
        key: &QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> Result<T, QueryError>
    where
        T: Clone + Send + Sync + 'static,
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(data) = self.fresh_data::<T>(key, options.stale_time)? {
            trace!(key = %key, "Query cache hit");
            return Ok(data);
        }

        self.fetch_fresh(key, options.retry, fetcher).await
    }

    /// Fetches unconditionally and stores the result.
    ///
    /// # Errors
    /// Returns error if every fetch attempt fails.
    pub async fn fetch_fresh<T, E, F, Fut>(
        &self,
        key: &QueryKey,
        retry: u32,
        fetcher: F,
    ) -> Result<T, QueryError>
    where
        T: Clone + Send + Sync + 'static,
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        debug!(key = %key, "Fetching query");
        let policy = self.backoff.with_max_retries(retry);
        let label = key.to_string();

        match retry_with_backoff(&policy, &label, |_| true, fetcher).await {
            Ok(data) => {
                self.set_query_data(key.clone(), data.clone());
                Ok(data)
            }
            Err((e, attempts)) => Err(QueryError::FetchFailed {
                key: label,
                attempts,
                message: e.to_string(),
            }),
        }
    }

    fn fresh_data<T: Clone + 'static>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
    ) -> Result<Option<T>, QueryError> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(key) else {
            return Ok(None);
        };
        entry.last_accessed = now;
        if entry.is_stale(stale_time, now) {
            return Ok(None);
        }
        entry
            .data
            .downcast_ref::<T>()
            .cloned()
            .map(Some)
            .ok_or_else(|| QueryError::TypeMismatch {
                key: key.to_string(),
            })
    }

    /// Returns cached data regardless of freshness.
    #[must_use]
    pub fn get_query_data<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.read();
        entries
            .get(key)
            .and_then(|entry| entry.data.downcast_ref::<T>().cloned())
    }

    /// Stores data for `key`, marking it fresh.
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: QueryKey, data: T) {
        let now = Instant::now();
        self.entries.write().insert(
            key,
            CacheEntry {
                data: Arc::new(data),
                updated_at: now,
                last_accessed: now,
                invalidated: false,
            },
        );
    }

    /// Returns true if `key` is missing or stale under the default stale time.
    #[must_use]
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .is_none_or(|entry| entry.is_stale(self.defaults.stale_time, now))
    }

    /// Marks every query under `prefix` stale. Returns how many were marked.
    pub fn invalidate_queries(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.write();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        debug!(prefix = %prefix, count, "Invalidated queries");
        count
    }

    /// Drops every query under `prefix`. Returns how many were removed.
    pub fn remove_queries(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Drops entries that have not been read within the gc time.
    pub fn gc(&self) -> usize {
        let now = Instant::now();
        let gc_time = self.defaults.gc_time;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_accessed) < gc_time);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Garbage collected idle queries");
        }
        removed
    }

    /// Number of cached queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_key;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_fresh_data_is_served_from_cache() {
        let client = QueryClient::default();
        let key = query_key!["blog", "posts"];
        let calls = AtomicU32::new(0);
        let calls = &calls;

        for _ in 0..3 {
            let posts: Vec<String> = client
                .fetch_query(&key, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(vec!["hello".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(posts, vec!["hello".to_string()]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_data_is_refetched() {
        let client = QueryClient::default();
        let key = query_key!["services"];
        client.set_query_data(key.clone(), 1_u32);

        tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;
        assert!(client.is_stale(&key));

        let value: u32 = client
            .fetch_query(&key, || async { Ok::<_, String>(2_u32) })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_by_prefix() {
        let client = QueryClient::default();
        client.set_query_data(query_key!["blog", 1_i64], "a");
        client.set_query_data(query_key!["blog", 2_i64], "b");
        client.set_query_data(query_key!["case-studies", 1_i64], "c");

        assert_eq!(client.invalidate_queries(&query_key!["blog"]), 2);
        assert!(client.is_stale(&query_key!["blog", 1_i64]));
        assert!(!client.is_stale(&query_key!["case-studies", 1_i64]));

        assert_eq!(client.remove_queries(&query_key!["blog"]), 2);
        assert_eq!(client.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_reports_attempts() {
        let client = QueryClient::new(QueryOptions::default().with_retry(2));

        let result: Result<u32, QueryError> = client
            .fetch_query(&query_key!["health"], || async { Err::<u32, _>("offline") })
            .await;

        assert_eq!(
            result,
            Err(QueryError::FetchFailed {
                key: "[health]".to_string(),
                attempts: 3,
                message: "offline".to_string(),
            })
        );
        assert!(client.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_mismatch() {
        let client = QueryClient::default();
        let key = query_key!["x"];
        client.set_query_data(key.clone(), "text");

        let result: Result<u32, QueryError> = client
            .fetch_query(&key, || async { Ok::<_, String>(1_u32) })
            .await;

        assert!(matches!(result, Err(QueryError::TypeMismatch { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gc_drops_idle_entries() {
        let client = QueryClient::default();
        client.set_query_data(query_key!["old"], 1_u32);

        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        client.set_query_data(query_key!["new"], 2_u32);

        assert_eq!(client.gc(), 1);
        assert_eq!(client.get_query_data::<u32>(&query_key!["new"]), Some(2));
    }
}
