//! Lazily loaded image view.
//!
//! The view stays idle until its bounds come near the viewport, then issues a
//! single load for the optimized source. Unmounting at any point disconnects
//! the observer and aborts the load, so no callback fires afterwards.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::domain::entities::{LoadedImage, OptimizationOptions};
use crate::domain::errors::ImageFetchError;
use crate::domain::ports::ImageFetchPort;
use crate::infrastructure::image::ImageOptimizationService;
use crate::presentation::viewport::{IntersectionEntry, IntersectionObserver, ObserverOptions, Rect};

/// Loading state of a lazy image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Not near the viewport yet.
    #[default]
    Idle,
    /// Load in flight.
    InView,
    /// Image loaded.
    Loaded,
    /// Load failed.
    Errored,
}

impl LoadState {
    /// Returns true once the load has settled.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Loaded | Self::Errored)
    }
}

type LoadCallback = Arc<dyn Fn(&LoadedImage) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&ImageFetchError) + Send + Sync>;

/// Properties of a lazy image.
#[derive(Clone, Default)]
pub struct LazyImageProps {
    /// Image source.
    pub src: String,
    /// Alternative text.
    pub alt: String,
    /// Rendering options passed to the optimizer.
    pub options: OptimizationOptions,
    /// Source shown until the image has loaded.
    pub placeholder: Option<String>,
    /// Load on mount instead of waiting for the viewport.
    pub priority: bool,
    /// Intersection parameters.
    pub observer: Option<ObserverOptions>,
    on_load: Option<LoadCallback>,
    on_error: Option<ErrorCallback>,
}

impl std::fmt::Debug for LazyImageProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyImageProps")
            .field("src", &self.src)
            .field("alt", &self.alt)
            .field("options", &self.options)
            .field("placeholder", &self.placeholder)
            .field("priority", &self.priority)
            .field("observer", &self.observer)
            .finish_non_exhaustive()
    }
}

impl LazyImageProps {
    /// Creates props for `src`.
    #[must_use]
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
            ..Self::default()
        }
    }

    /// Sets the optimization options.
    #[must_use]
    pub fn with_options(mut self, options: OptimizationOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the placeholder source.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Marks the image as above the fold.
    #[must_use]
    pub const fn priority(mut self) -> Self {
        self.priority = true;
        self
    }

    /// Overrides the intersection parameters.
    #[must_use]
    pub const fn with_observer(mut self, observer: ObserverOptions) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Called once when the image loads.
    #[must_use]
    pub fn on_load(mut self, callback: impl Fn(&LoadedImage) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Arc::new(callback));
        self
    }

    /// Called once when the image fails to load.
    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(&ImageFetchError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

/// A mounted lazy image.
pub struct LazyImage {
    props: LazyImageProps,
    resolved_src: String,
    fetcher: Arc<dyn ImageFetchPort>,
    observer: IntersectionObserver,
    state: Arc<watch::Sender<LoadState>>,
    /// Held across the settle step so unmount cannot interleave with a callback.
    disposed: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for LazyImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyImage")
            .field("src", &self.props.src)
            .field("resolved_src", &self.resolved_src)
            .field("state", &self.state())
            .field("observing", &self.observer.is_connected())
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

impl LazyImage {
    /// Mounts the view. Priority images start loading immediately; others
    /// wait for [`handle_intersection`](Self::handle_intersection).
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn mount(
        props: LazyImageProps,
        optimizer: &ImageOptimizationService,
        fetcher: Arc<dyn ImageFetchPort>,
    ) -> Self {
        let resolved_src = optimizer.optimize(&props.src, &props.options);
        let observer = IntersectionObserver::new(props.observer.unwrap_or_default());
        let (state, _) = watch::channel(LoadState::Idle);

        let mut view = Self {
            props,
            resolved_src,
            fetcher,
            observer,
            state: Arc::new(state),
            disposed: Arc::new(Mutex::new(false)),
            task: None,
        };

        if view.props.priority {
            trace!(src = %view.props.src, "Priority image, loading on mount");
            view.observer.disconnect();
            view.start_load();
        }

        view
    }

    /// Feeds an intersection observation. Returns true if it started the load.
    pub fn handle_intersection(&mut self, entry: &IntersectionEntry) -> bool {
        if !self.is_mounted() || self.state() != LoadState::Idle {
            return false;
        }
        if !self.observer.observe(entry) {
            return false;
        }
        self.start_load();
        true
    }

    /// Computes the intersection of `target` with `viewport` and feeds it.
    pub fn handle_viewport(&mut self, viewport: Rect, target: Rect) -> bool {
        let entry =
            IntersectionEntry::between(viewport, target, self.observer.options().root_margin);
        self.handle_intersection(&entry)
    }

    fn start_load(&mut self) {
        self.state.send_replace(LoadState::InView);

        let url = self.resolved_src.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let state = Arc::clone(&self.state);
        let disposed = Arc::clone(&self.disposed);
        let on_load = self.props.on_load.clone();
        let on_error = self.props.on_error.clone();

        debug!(url = %url, "Loading lazy image");

        self.task = Some(tokio::spawn(async move {
            let result = fetcher.fetch(&url).await;
            let disposed = disposed.lock();
            if *disposed {
                return;
            }

            match result {
                Ok(image) => {
                    state.send_replace(LoadState::Loaded);
                    if let Some(callback) = on_load {
                        callback(&image);
                    }
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "Lazy image failed to load");
                    state.send_replace(LoadState::Errored);
                    if let Some(callback) = on_error {
                        callback(&e);
                    }
                }
            }
        }));
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        *self.state.borrow()
    }

    /// Watches state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    /// Source to render now: the optimized URL once loaded, the placeholder
    /// before that.
    #[must_use]
    pub fn current_src(&self) -> Option<&str> {
        if self.state() == LoadState::Loaded {
            Some(&self.resolved_src)
        } else {
            self.props.placeholder.as_deref()
        }
    }

    /// Optimized source the view loads.
    #[must_use]
    pub fn resolved_src(&self) -> &str {
        &self.resolved_src
    }

    /// Alternative text.
    #[must_use]
    pub fn alt(&self) -> &str {
        &self.props.alt
    }

    /// Returns true while still observing the viewport.
    #[must_use]
    pub const fn is_observing(&self) -> bool {
        self.observer.is_connected()
    }

    /// Returns true until unmounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !*self.disposed.lock()
    }

    /// Disconnects the observer and aborts any in-flight load. A load that is
    /// already settling finishes its callback before this returns; none runs
    /// afterwards.
    pub fn unmount(&mut self) {
        {
            let mut disposed = self.disposed.lock();
            if *disposed {
                return;
            }
            *disposed = true;
        }
        self.observer.disconnect();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        trace!(src = %self.props.src, "Lazy image unmounted");
    }
}

impl Drop for LazyImage {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::{MockFormatSupport, MockImageFetcher};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    const VIEWPORT: Rect = Rect::new(0.0, 0.0, 1000.0, 800.0);
    const VISIBLE: Rect = Rect::new(0.0, 200.0, 300.0, 200.0);
    const FAR_BELOW: Rect = Rect::new(0.0, 3000.0, 300.0, 200.0);

    fn setup(fetcher: MockImageFetcher) -> (ImageOptimizationService, Arc<MockImageFetcher>) {
        let fetcher = Arc::new(fetcher);
        let optimizer =
            ImageOptimizationService::new(fetcher.clone(), Arc::new(MockFormatSupport::new(true)));
        (optimizer, fetcher)
    }

    async fn settled(view: &LazyImage) -> LoadState {
        let mut rx = view.subscribe();
        *rx.wait_for(|state| state.is_settled()).await.unwrap()
    }

    #[tokio::test]
    async fn test_no_request_before_intersection() {
        let (optimizer, fetcher) = setup(MockImageFetcher::new());
        let mut view = LazyImage::mount(
            LazyImageProps::new("https://images.unsplash.com/photo-1", "Team"),
            &optimizer,
            fetcher.clone(),
        );

        tokio::task::yield_now().await;
        assert_eq!(view.state(), LoadState::Idle);
        assert_eq!(fetcher.request_count(), 0);

        assert!(!view.handle_viewport(VIEWPORT, FAR_BELOW));
        assert_eq!(fetcher.request_count(), 0);

        assert!(view.handle_viewport(VIEWPORT, VISIBLE));
        assert_eq!(settled(&view).await, LoadState::Loaded);
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_priority_loads_on_mount() {
        let (optimizer, fetcher) = setup(MockImageFetcher::new());
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();

        let view = LazyImage::mount(
            LazyImageProps::new("/images/hero.jpg", "Hero")
                .priority()
                .on_load(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            &optimizer,
            fetcher.clone(),
        );

        assert!(!view.is_observing());
        assert_eq!(settled(&view).await, LoadState::Loaded);
        assert_eq!(fetcher.requested(), vec!["/images/hero.jpg".to_string()]);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_observer_is_one_shot() {
        let (optimizer, fetcher) = setup(MockImageFetcher::new());
        let mut view = LazyImage::mount(
            LazyImageProps::new("/a.jpg", ""),
            &optimizer,
            fetcher.clone(),
        );

        assert!(view.handle_viewport(VIEWPORT, VISIBLE));
        assert!(!view.is_observing());
        assert!(!view.handle_viewport(VIEWPORT, VISIBLE));

        settled(&view).await;
        assert!(!view.handle_viewport(VIEWPORT, VISIBLE));
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_error_is_reported_without_retry() {
        let (optimizer, fetcher) = setup(MockImageFetcher::new().failing_on("missing"));
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();

        let view = LazyImage::mount(
            LazyImageProps::new("/missing.jpg", "")
                .with_placeholder("/blur.jpg")
                .priority()
                .on_error(move |e| {
                    assert_eq!(*e, ImageFetchError::http(404));
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            &optimizer,
            fetcher.clone(),
        );

        assert_eq!(settled(&view).await, LoadState::Errored);
        tokio::task::yield_now().await;
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.request_count(), 1);
        assert_eq!(view.current_src(), Some("/blur.jpg"));
    }

    #[tokio::test]
    async fn test_source_goes_through_optimizer() {
        let (optimizer, fetcher) = setup(MockImageFetcher::new());
        let view = LazyImage::mount(
            LazyImageProps::new("https://images.unsplash.com/photo-1", "")
                .with_options(OptimizationOptions::new().with_width(400))
                .with_placeholder("/blur.jpg")
                .priority(),
            &optimizer,
            fetcher.clone(),
        );

        assert_eq!(view.current_src(), Some("/blur.jpg"));
        settled(&view).await;
        assert_eq!(
            view.current_src(),
            Some("https://images.unsplash.com/photo-1?w=400")
        );
        assert_eq!(fetcher.requested(), vec![view.resolved_src().to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_aborts_in_flight_load() {
        let (optimizer, fetcher) =
            setup(MockImageFetcher::new().with_delay(Duration::from_secs(5)));
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();

        let mut view = LazyImage::mount(
            LazyImageProps::new("/slow.jpg", "").on_load(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            &optimizer,
            fetcher.clone(),
        );
        let rx = view.subscribe();

        assert!(view.handle_viewport(VIEWPORT, VISIBLE));
        tokio::task::yield_now().await;
        view.unmount();

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(!view.is_mounted());
        assert_eq!(*rx.borrow(), LoadState::InView);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert!(!view.handle_viewport(VIEWPORT, VISIBLE));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_callback_once_unmount_returns() {
        let (optimizer, fetcher) = setup(MockImageFetcher::new());
        let late = Arc::new(AtomicUsize::new(0));

        for _ in 0..500 {
            let returned = Arc::new(AtomicBool::new(false));
            let seen = returned.clone();
            let counter = late.clone();

            let mut view = LazyImage::mount(
                LazyImageProps::new("/hero.jpg", "")
                    .priority()
                    .on_load(move |_| {
                        std::thread::sleep(Duration::from_micros(50));
                        if seen.load(Ordering::SeqCst) {
                            counter.fetch_add(1, Ordering::SeqCst);
                        }
                    }),
                &optimizer,
                fetcher.clone(),
            );
            tokio::task::yield_now().await;
            view.unmount();
            returned.store(true, Ordering::SeqCst);
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(late.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unmount_before_intersection() {
        let (optimizer, fetcher) = setup(MockImageFetcher::new());
        let mut view = LazyImage::mount(
            LazyImageProps::new("/a.jpg", ""),
            &optimizer,
            fetcher.clone(),
        );

        view.unmount();
        assert!(!view.is_observing());
        assert!(!view.handle_viewport(VIEWPORT, VISIBLE));
        assert_eq!(fetcher.request_count(), 0);
    }
}
