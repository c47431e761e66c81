//! Delete-aware query wrapper.
//!
//! A `SmartQuery` owns no data. It derives the effective refetch behaviour of
//! a query from its configured options and the [`DeletionRegistry`]: while any
//! in-flight deletion id starts with the query's tracking prefix, every kind of
//! background refetch is switched off.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace, warn};

use super::deletion_registry::{ActiveDeletions, DeletionRegistry, matches_prefix};
use super::query_client::{QueryClient, QueryOptions};
use crate::domain::entities::QueryKey;
use crate::domain::errors::QueryError;

/// Query descriptor whose background refetching yields to in-flight deletes.
#[derive(Debug, Clone)]
pub struct SmartQuery {
    key: QueryKey,
    options: QueryOptions,
    delete_tracking_prefix: Option<String>,
    deletions: watch::Receiver<ActiveDeletions>,
}

impl SmartQuery {
    /// Creates a query that is not tied to any deletion prefix.
    #[must_use]
    pub fn new(key: QueryKey, options: QueryOptions, registry: &DeletionRegistry) -> Self {
        Self {
            key,
            options,
            delete_tracking_prefix: None,
            deletions: registry.subscribe(),
        }
    }

    /// Pauses background refetching while a deletion id starting with `prefix`
    /// is active. Include a type discriminator (`"blog-"`) so unrelated
    /// resources never share a prefix.
    #[must_use]
    pub fn with_delete_tracking(mut self, prefix: impl Into<String>) -> Self {
        self.delete_tracking_prefix = Some(prefix.into());
        self
    }

    /// The query key.
    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Options as configured by the caller.
    #[must_use]
    pub const fn configured_options(&self) -> &QueryOptions {
        &self.options
    }

    /// Returns true while a matching deletion is in flight.
    #[must_use]
    pub fn should_pause(&self) -> bool {
        self.delete_tracking_prefix
            .as_deref()
            .is_some_and(|prefix| matches_prefix(&self.deletions.borrow(), prefix))
    }

    /// Options to hand to the query cache right now. `enabled` is passed
    /// through untouched so callers can still force a fetch.
    #[must_use]
    pub fn effective_options(&self) -> QueryOptions {
        if !self.should_pause() {
            return self.options.clone();
        }
        QueryOptions {
            refetch_interval: None,
            refetch_on_window_focus: false,
            refetch_on_reconnect: false,
            ..self.options.clone()
        }
    }

    /// Current polling interval, `None` when polling is off or paused.
    #[must_use]
    pub fn refetch_interval(&self) -> Option<std::time::Duration> {
        self.effective_options().refetch_interval
    }

    /// Whether a window-focus event should trigger a refetch now.
    #[must_use]
    pub fn should_refetch_on_focus(&self) -> bool {
        let options = self.effective_options();
        options.enabled && options.refetch_on_window_focus
    }

    /// Whether regaining connectivity should trigger a refetch now.
    #[must_use]
    pub fn should_refetch_on_reconnect(&self) -> bool {
        let options = self.effective_options();
        options.enabled && options.refetch_on_reconnect
    }

    /// Waits for the next registry change and returns the new pause state.
    /// Returns `None` once the registry is gone.
    pub async fn changed(&mut self) -> Option<bool> {
        self.deletions.changed().await.ok()?;
        self.deletions.borrow_and_update();
        Some(self.should_pause())
    }

    /// Reads through the cache, honouring stale time.
    ///
    /// # Errors
    /// Returns error if the fetch fails.
    pub async fn fetch<T, E, F, Fut>(&self, client: &QueryClient, fetcher: F) -> Result<T, QueryError>
    where
        T: Clone + Send + Sync + 'static,
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        client
            .fetch_query_with(&self.key, &self.effective_options(), fetcher)
            .await
    }

    /// Caller-initiated refetch. Runs even while paused.
    ///
    /// # Errors
    /// Returns error if the fetch fails.
    pub async fn refetch<T, E, F, Fut>(&self, client: &QueryClient, fetcher: F) -> Result<T, QueryError>
    where
        T: Clone + Send + Sync + 'static,
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.should_pause() {
            debug!(key = %self.key, "Explicit refetch while deletion in flight");
        }
        client.fetch_fresh(&self.key, self.options.retry, fetcher).await
    }

    /// Starts background polling at the effective interval. The poller reacts
    /// to registry changes immediately and stops when the handle is dropped.
    pub fn spawn_polling<T, E, F, Fut>(self, client: Arc<QueryClient>, fetcher: F) -> PollingHandle
    where
        T: Clone + Send + Sync + 'static,
        E: Display + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let task = tokio::spawn(run_poller(self, client, fetcher));
        PollingHandle { task }
    }
}

async fn run_poller<T, E, F, Fut>(mut query: SmartQuery, client: Arc<QueryClient>, mut fetcher: F)
where
    T: Clone + Send + Sync + 'static,
    E: Display + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let mut next_due = query.options.refetch_interval.map(|interval| Instant::now() + interval);

    loop {
        let interval = query
            .refetch_interval()
            .filter(|_| query.options.enabled);

        let tick = async move {
            match (interval, next_due) {
                (Some(_), Some(due)) => sleep_until(due).await,
                _ => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            changed = query.changed() => {
                let Some(paused) = changed else {
                    debug!(key = %query.key, "Deletion registry dropped, stopping poller");
                    break;
                };
                trace!(key = %query.key, paused, "Deletion registry changed");
            }
            () = tick => {
                trace!(key = %query.key, "Polling");
                let result: Result<T, QueryError> = client
                    .fetch_fresh(&query.key, query.options.retry, &mut fetcher)
                    .await;
                if let Err(e) = result {
                    warn!(key = %query.key, error = %e, "Background refetch failed");
                }
                next_due = interval.map(|interval| Instant::now() + interval);
            }
        }
    }
}

/// Stops the background poller when dropped.
#[derive(Debug)]
pub struct PollingHandle {
    task: JoinHandle<()>,
}

impl PollingHandle {
    /// Stops polling.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Returns true once the poller has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
