use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::color::{ColorCache, ColorMatcher, ColorQuery};
use crate::geometry::{Point, Rect};
use crate::model::{SequenceStep, TargetMode};
use crate::platform::Platform;

const RETRY_JITTER: i32 = 10;

impl SequenceStep {
    /// Color search this step performs when in color mode.
    pub fn color_query(&self) -> ColorQuery {
        ColorQuery { color: self.target_color, tolerance: self.color_tolerance, region: self.color_search_area }
    }
}

/// Turns a step's addressing mode into a concrete screen point.
pub struct StepResolver {
    platform: Arc<dyn Platform>,
    colors: Arc<dyn ColorMatcher>,
    cache: Option<Arc<ColorCache>>,
    fallback_size: i32,
}

impl StepResolver {
    pub fn new(platform: Arc<dyn Platform>, colors: Arc<dyn ColorMatcher>) -> Self {
        Self { platform, colors, cache: None, fallback_size: 50 }
    }

    pub fn with_cache(mut self, cache: Arc<ColorCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Side of the cursor-centered square searched when a step has no search area.
    pub fn with_fallback_size(mut self, size: i32) -> Self {
        self.fallback_size = size.max(1);
        self
    }

    pub fn resolve<R: Rng + ?Sized>(&self, step: &SequenceStep, rng: &mut R) -> Point {
        match step.target_mode {
            TargetMode::MousePosition => self.platform.cursor_position(),
            TargetMode::ClickArea => step.click_area.random_point(rng),
            TargetMode::ColorClick => self.resolve_color(step, rng),
        }
    }

    /// New target after a failed click. Cursor mode nudges the previous point instead.
    pub fn resolve_retry<R: Rng + ?Sized>(&self, step: &SequenceStep, previous: Point, rng: &mut R) -> Point {
        let point = match step.target_mode {
            TargetMode::MousePosition => previous.offset(
                rng.gen_range(-RETRY_JITTER..=RETRY_JITTER),
                rng.gen_range(-RETRY_JITTER..=RETRY_JITTER),
            ),
            _ => self.resolve(step, rng),
        };
        debug!("retry target {point:?} (was {previous:?})");
        point
    }

    fn resolve_color<R: Rng + ?Sized>(&self, step: &SequenceStep, rng: &mut R) -> Point {
        let mut query = step.color_query();
        if !query.region.is_set() {
            query.region = Rect::centered_on(self.platform.cursor_position(), self.fallback_size);
        }

        if let Some(p) = self.cache.as_ref().and_then(|c| c.take(&query)) {
            debug!("color target {p:?} from cache");
            return p;
        }
        match self.colors.find_point(query.color, query.tolerance, query.region) {
            Some(p) => {
                debug!("color found at {p:?}");
                p
            }
            None => {
                let p = query.region.random_point(rng);
                debug!("color not found, random point {p:?} in search area");
                p
            }
        }
    }
}
