//! Viewport geometry and one-shot intersection observation.

/// Default margin around the viewport, in pixels.
pub const DEFAULT_ROOT_MARGIN: f64 = 50.0;

/// Default fraction of the target that must be visible.
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Area in square pixels.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grows the rectangle by `margin` on every side.
    #[must_use]
    pub fn expand(&self, margin: f64) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Overlapping region, if the rectangles touch or overlap.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        (right >= left && bottom >= top).then(|| Self::new(left, top, right - left, bottom - top))
    }
}

/// Result of intersecting a target with the (margin-expanded) viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    /// Target bounds.
    pub target: Rect,
    /// Visible fraction of the target, 0.0 to 1.0.
    pub intersection_ratio: f64,
    /// Whether the target touches the expanded viewport at all.
    pub is_intersecting: bool,
}

impl IntersectionEntry {
    /// Computes the entry for `target` against `root` grown by `margin`.
    #[must_use]
    pub fn between(root: Rect, target: Rect, margin: f64) -> Self {
        let expanded = root.expand(margin);
        let Some(overlap) = target.intersection(&expanded) else {
            return Self {
                target,
                intersection_ratio: 0.0,
                is_intersecting: false,
            };
        };

        let target_area = target.area();
        let intersection_ratio = if target_area > 0.0 {
            (overlap.area() / target_area).clamp(0.0, 1.0)
        } else {
            1.0
        };

        Self {
            target,
            intersection_ratio,
            is_intersecting: true,
        }
    }
}

/// Observation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverOptions {
    /// Margin added around the viewport, in pixels.
    pub root_margin: f64,
    /// Minimum visible fraction.
    pub threshold: f64,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: DEFAULT_ROOT_MARGIN,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ObserverOptions {
    /// Returns true if `entry` crosses the threshold.
    #[must_use]
    pub fn qualifies(&self, entry: &IntersectionEntry) -> bool {
        entry.is_intersecting && entry.intersection_ratio >= self.threshold
    }
}

/// Observer that fires once and then disconnects itself.
#[derive(Debug, Clone)]
pub struct IntersectionObserver {
    options: ObserverOptions,
    connected: bool,
}

impl IntersectionObserver {
    /// Creates a connected observer.
    #[must_use]
    pub const fn new(options: ObserverOptions) -> Self {
        Self {
            options,
            connected: true,
        }
    }

    /// Observation parameters.
    #[must_use]
    pub const fn options(&self) -> &ObserverOptions {
        &self.options
    }

    /// Feeds an observation. Returns true exactly once, for the first
    /// qualifying entry, and disconnects.
    pub fn observe(&mut self, entry: &IntersectionEntry) -> bool {
        if !self.connected || !self.options.qualifies(entry) {
            return false;
        }
        self.connected = false;
        true
    }

    /// Computes and feeds the entry for `target` inside `root`.
    pub fn observe_rects(&mut self, root: Rect, target: Rect) -> bool {
        let entry = IntersectionEntry::between(root, target, self.options.root_margin);
        self.observe(&entry)
    }

    /// Stops observing.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Returns true while still observing.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }
}
