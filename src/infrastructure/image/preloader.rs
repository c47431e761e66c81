//! Image cache warming for a known set of URLs.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::optimizer::ImageOptimizationService;
use crate::domain::entities::{ImageFormat, OptimizationOptions, PreloadReport};
use crate::domain::errors::ImageFetchError;

/// Preloads images and remembers which sources have loaded, so repeated
/// batches only request what is still missing.
#[derive(Debug)]
pub struct ImagePreloader {
    optimizer: Arc<ImageOptimizationService>,
    preloaded: RwLock<HashSet<String>>,
}

impl ImagePreloader {
    /// Creates a preloader with an empty preload set.
    #[must_use]
    pub fn new(optimizer: Arc<ImageOptimizationService>) -> Self {
        Self {
            optimizer,
            preloaded: RwLock::new(HashSet::new()),
        }
    }

    /// Options used for above-the-fold images.
    #[must_use]
    pub const fn critical_options() -> OptimizationOptions {
        OptimizationOptions::new()
            .with_quality(85)
            .with_format(ImageFormat::Auto)
    }

    /// Preloads every source not yet loaded. Failures are reported per URL
    /// and never abort the batch.
    pub async fn preload_batch<S: AsRef<str>>(
        &self,
        sources: &[S],
        options: &OptimizationOptions,
    ) -> PreloadReport {
        let mut pending = Vec::new();
        let mut skipped = Vec::new();
        {
            let preloaded = self.preloaded.read();
            for source in sources {
                let source = source.as_ref();
                if preloaded.contains(source) || pending.iter().any(|p| p == source) {
                    skipped.push(source.to_string());
                } else {
                    pending.push(source.to_string());
                }
            }
        }

        let outcomes = self.optimizer.preload(pending.as_slice(), options).await;

        {
            let mut preloaded = self.preloaded.write();
            for outcome in outcomes.iter().filter(|o| o.is_loaded()) {
                preloaded.insert(outcome.source.clone());
            }
        }

        let report = PreloadReport { outcomes, skipped };
        let failed = report.failures().count();
        if failed > 0 {
            warn!(failed, loaded = report.loaded(), "Some images failed to preload");
        } else {
            debug!(
                loaded = report.loaded(),
                skipped = report.skipped.len(),
                "Preload batch complete"
            );
        }
        report
    }

    /// Preloads a single source.
    ///
    /// # Errors
    /// Returns the fetch error if the image could not be loaded.
    pub async fn preload_one(
        &self,
        source: &str,
        options: &OptimizationOptions,
    ) -> Result<(), ImageFetchError> {
        let report = self.preload_batch(&[source], options).await;
        report
            .outcomes
            .into_iter()
            .next()
            .map_or(Ok(()), |outcome| outcome.result)
    }

    /// Preloads above-the-fold images with [`critical_options`](Self::critical_options).
    pub async fn preload_critical<S: AsRef<str>>(&self, sources: &[S]) -> PreloadReport {
        let report = self
            .preload_batch(sources, &Self::critical_options())
            .await;
        info!(
            requested = sources.len(),
            loaded = report.loaded(),
            "Critical images preloaded"
        );
        report
    }

    /// Returns true if `source` has loaded successfully.
    #[must_use]
    pub fn is_preloaded(&self, source: &str) -> bool {
        self.preloaded.read().contains(source)
    }

    /// Number of sources known to be loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.preloaded.read().len()
    }

    /// Returns true if nothing has loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.preloaded.read().is_empty()
    }

    /// Forgets every loaded source.
    pub fn clear(&self) {
        self.preloaded.write().clear();
    }
}
