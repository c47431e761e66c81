//! Registry of in-flight delete operations.
//!
//! Queries consult the registry before trusting cached reads: while an id
//! sharing a query's tracking prefix is active, background refetching is
//! paused so a stale response cannot resurrect a row that is being deleted.
//! Changes are published over a `watch` channel; subscribers recompute their
//! pause state as soon as `start`/`finish` is called.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Snapshot of active deletion ids.
pub type ActiveDeletions = BTreeSet<String>;

/// Builds a tracking id such as `blog-42`. The kind acts as the prefix queries
/// match on, so kinds must not be prefixes of each other.
#[must_use]
pub fn deletion_id(kind: &str, id: impl Display) -> String {
    format!("{kind}-{id}")
}

/// Builds a unique tracking id for `kind`.
#[must_use]
pub fn new_deletion_id(kind: &str) -> String {
    deletion_id(kind, uuid::Uuid::new_v4())
}

/// Returns true if any active id starts with `prefix`.
#[must_use]
pub fn matches_prefix(active: &ActiveDeletions, prefix: &str) -> bool {
    active.iter().any(|id| id.starts_with(prefix))
}

/// Shared handle to the set of in-flight deletions. Cloning is cheap and all
/// clones observe the same set.
#[derive(Debug, Clone)]
pub struct DeletionRegistry {
    tx: Arc<watch::Sender<ActiveDeletions>>,
}

impl DeletionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ActiveDeletions::new());
        Self { tx: Arc::new(tx) }
    }

    /// Marks `id` as being deleted.
    pub fn start(&self, id: impl Into<String>) {
        let id = id.into();
        let inserted = self.tx.send_if_modified(|active| active.insert(id.clone()));
        if inserted {
            debug!(id = %id, "Deletion started");
        }
    }

    /// Clears `id`. Returns false if it was not active.
    pub fn finish(&self, id: &str) -> bool {
        let removed = self.tx.send_if_modified(|active| active.remove(id));
        if removed {
            debug!(id = %id, "Deletion finished");
        }
        removed
    }

    /// Marks `id` as being deleted until the returned guard drops.
    #[must_use = "the deletion finishes as soon as the guard is dropped"]
    pub fn track(&self, id: impl Into<String>) -> DeletionGuard {
        let id = id.into();
        self.start(id.clone());
        DeletionGuard {
            registry: self.clone(),
            id,
        }
    }

    /// Runs a delete operation with `id` active for its whole duration,
    /// including when it fails.
    pub async fn run_tracked<F, T>(&self, id: impl Into<String>, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        let _guard = self.track(id);
        operation.await
    }

    /// Returns true if `id` is active.
    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.tx.borrow().contains(id)
    }

    /// Returns true if any active id starts with `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        matches_prefix(&self.tx.borrow(), prefix)
    }

    /// Returns a snapshot of active ids.
    #[must_use]
    pub fn active(&self) -> ActiveDeletions {
        self.tx.borrow().clone()
    }

    /// Number of active deletions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    /// Returns true if no deletion is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Subscribes to changes. The receiver sees the current set immediately.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ActiveDeletions> {
        self.tx.subscribe()
    }
}

impl Default for DeletionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a deletion id active until dropped.
#[derive(Debug)]
pub struct DeletionGuard {
    registry: DeletionRegistry,
    id: String,
}

impl DeletionGuard {
    /// The tracked id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for DeletionGuard {
    fn drop(&mut self) {
        self.registry.finish(&self.id);
    }
}
