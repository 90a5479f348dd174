use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use parking_lot::Mutex;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, warn};

use crate::geometry::{Point, Rect, Rgb};
use crate::platform::{Platform, Snapshot};

/// Finds an on-screen point of a given color.
pub trait ColorMatcher: Send + Sync {
    fn find_point(&self, color: Rgb, tolerance: i32, region: Rect) -> Option<Point>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorQuery {
    pub color: Rgb,
    pub tolerance: i32,
    pub region: Rect,
}

/// All pixels of `snapshot` within `tolerance` of `color` on every channel.
pub fn matching_points(snapshot: &Snapshot, color: Rgb, tolerance: i32) -> Vec<Point> {
    snapshot.iter().filter(|(_, c)| c.is_similar(color, tolerance)).map(|(p, _)| p).collect()
}

/// Captures the region through the platform and picks a random matching pixel.
pub struct PixelScanMatcher {
    platform: Arc<dyn Platform>,
    rng: Mutex<StdRng>,
}

impl PixelScanMatcher {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform, rng: Mutex::new(StdRng::from_entropy()) }
    }
}

impl ColorMatcher for PixelScanMatcher {
    fn find_point(&self, color: Rgb, tolerance: i32, region: Rect) -> Option<Point> {
        let snapshot = match self.platform.capture_region(region) {
            Ok(s) => s,
            Err(e) => {
                warn!("color search capture failed: {e}");
                return None;
            }
        };
        let matches = matching_points(&snapshot, color, tolerance);
        let picked = matches.choose(&mut *self.rng.lock()).copied();
        debug!("color search {color:?}±{tolerance} in {region:?}: {} matches, picked {picked:?}", matches.len());
        picked
    }
}

struct CacheShared {
    wanted: Mutex<Option<ColorQuery>>,
    slot: Mutex<Option<(ColorQuery, Point)>>,
}

/// Shortest pause between background searches.
pub const MIN_REFRESH: Duration = Duration::from_millis(50);

/// Single-slot cache of the most recent color match, optionally refreshed by a background worker.
pub struct ColorCache {
    shared: Arc<CacheShared>,
    running: Arc<AtomicBool>,
}

impl Default for ColorCache {
    fn default() -> Self { Self::new() }
}

impl ColorCache {
    /// Cache without a worker; only [`ColorCache::store`] fills it.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(CacheShared { wanted: Mutex::new(None), slot: Mutex::new(None) }),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts a worker that searches for the primed query every `interval` (at least [`MIN_REFRESH`]).
    pub fn spawn(matcher: Arc<dyn ColorMatcher>, interval: Duration) -> Self {
        let interval = interval.max(MIN_REFRESH);
        let cache = Self::new();
        cache.running.store(true, Ordering::Relaxed);
        let running = Arc::clone(&cache.running);
        let shared = Arc::clone(&cache.shared);

        thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                let wanted = *shared.wanted.lock();
                if let Some(q) = wanted {
                    if let Some(p) = matcher.find_point(q.color, q.tolerance, q.region) {
                        *shared.slot.lock() = Some((q, p));
                    }
                }

                let ms = interval.as_millis() as u64;
                for _ in 0..ms / 50 {
                    if !running.load(Ordering::Relaxed) { break; }
                    thread::sleep(Duration::from_millis(50));
                }
                if ms % 50 != 0 { thread::sleep(Duration::from_millis(ms % 50)); }
            }
            debug!("color cache worker stopped");
        });
        cache
    }

    /// Sets (or clears) the query the worker should pre-warm.
    pub fn prime(&self, query: Option<ColorQuery>) { *self.shared.wanted.lock() = query; }

    pub fn primed(&self) -> Option<ColorQuery> { *self.shared.wanted.lock() }

    pub fn store(&self, query: ColorQuery, point: Point) { *self.shared.slot.lock() = Some((query, point)); }

    /// Takes the cached point if it answers `query`. The slot is emptied either way.
    pub fn take(&self, query: &ColorQuery) -> Option<Point> {
        match self.shared.slot.lock().take() {
            Some((q, p)) if q == *query => Some(p),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool { self.running.load(Ordering::Relaxed) }

    pub fn stop(&self) { self.running.store(false, Ordering::Relaxed); }
}

impl Drop for ColorCache {
    fn drop(&mut self) { self.stop(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    struct Fixed(Option<Point>);

    impl ColorMatcher for Fixed {
        fn find_point(&self, _c: Rgb, _t: i32, _r: Rect) -> Option<Point> { self.0 }
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl ColorMatcher for Counting {
        fn find_point(&self, _c: Rgb, _t: i32, _r: Rect) -> Option<Point> {
            self.0.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    fn query() -> ColorQuery {
        ColorQuery { color: Rgb::new(255, 0, 0), tolerance: 10, region: Rect::new(0, 0, 10, 10) }
    }

    #[test]
    fn test_matching_points() {
        let area = Rect::new(100, 200, 2, 2);
        let red = Rgb::new(250, 5, 5);
        let blue = Rgb::new(0, 0, 255);
        let snap = Snapshot::new(area, vec![blue, red, blue, red]).unwrap();
        let found = matching_points(&snap, Rgb::new(255, 0, 0), 10);
        assert_eq!(found, vec![Point::new(101, 200), Point::new(101, 201)]);
    }

    #[test]
    fn test_take_clears_slot() {
        let cache = ColorCache::new();
        cache.store(query(), Point::new(3, 4));
        assert_eq!(cache.take(&query()), Some(Point::new(3, 4)));
        assert_eq!(cache.take(&query()), None);
    }

    #[test]
    fn test_take_ignores_other_queries() {
        let cache = ColorCache::new();
        cache.store(query(), Point::new(3, 4));
        let other = ColorQuery { tolerance: 99, ..query() };
        assert_eq!(cache.take(&other), None);
        // Stale entry was discarded
        assert_eq!(cache.take(&query()), None);
    }

    #[test]
    fn test_worker_fills_slot_for_primed_query() {
        let cache = ColorCache::spawn(Arc::new(Fixed(Some(Point::new(7, 8)))), Duration::from_millis(10));
        assert!(cache.is_running());
        cache.prime(Some(query()));

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut found = None;
        while found.is_none() && Instant::now() < deadline {
            found = cache.take(&query());
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(found, Some(Point::new(7, 8)));

        cache.stop();
        assert!(!cache.is_running());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let matcher = Arc::new(Counting::default());
        let cache = ColorCache::spawn(matcher.clone(), Duration::ZERO);
        cache.prime(Some(query()));
        assert_eq!(cache.primed(), Some(query()));
        thread::sleep(Duration::from_millis(120));
        cache.stop();

        // One search per 50ms, plus slack for scheduling
        let calls = matcher.0.load(Ordering::Relaxed);
        assert!(calls <= 5, "{calls} searches in 120ms");
    }
}
