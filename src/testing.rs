//! Fakes shared by the unit and scenario tests.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::color::ColorMatcher;
use crate::engine::{Collaborators, SequenceEngine};
use crate::error::PlatformError;
use crate::events::{EventLog, RunnerEvent};
use crate::geometry::{Point, Rect, Rgb};
use crate::model::{Sequence, SequenceStep, TargetMode};
use crate::overlay::NoOverlay;
use crate::platform::{MouseButton, Platform, Snapshot};
use crate::settings::EngineConfig;

/// Records every call; moving the cursor updates its position. Sleeps return at once.
pub(crate) struct FakePlatform {
    pub cursor: Mutex<Point>,
    pub moves: Mutex<Vec<Point>>,
    pub clicks: Mutex<Vec<(MouseButton, Point)>>,
    pub buttons: Mutex<Vec<(MouseButton, bool)>>,
    pub sleeps: Mutex<Vec<Duration>>,
    /// Color every captured pixel has.
    pub screen: Mutex<Rgb>,
    pub bounds: Option<Rect>,
}

impl FakePlatform {
    pub fn new(cursor: Point) -> Self {
        Self {
            cursor: Mutex::new(cursor),
            moves: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            buttons: Mutex::new(Vec::new()),
            sleeps: Mutex::new(Vec::new()),
            screen: Mutex::new(Rgb::new(30, 30, 30)),
            bounds: None,
        }
    }

    pub fn with_screen(self, color: Rgb) -> Self {
        *self.screen.lock() = color;
        self
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn click_count(&self) -> usize { self.clicks.lock().len() }
}

impl Platform for FakePlatform {
    fn move_cursor_to(&self, x: i32, y: i32) -> Result<(), PlatformError> {
        let p = Point::new(x, y);
        *self.cursor.lock() = p;
        self.moves.lock().push(p);
        Ok(())
    }

    fn cursor_position(&self) -> Point { *self.cursor.lock() }

    fn send_click(&self, button: MouseButton) -> Result<(), PlatformError> {
        let at = *self.cursor.lock();
        self.clicks.lock().push((button, at));
        Ok(())
    }

    fn button_down(&self, button: MouseButton) -> Result<(), PlatformError> {
        self.buttons.lock().push((button, true));
        Ok(())
    }

    fn button_up(&self, button: MouseButton) -> Result<(), PlatformError> {
        self.buttons.lock().push((button, false));
        Ok(())
    }

    fn capture_region(&self, area: Rect) -> Result<Snapshot, PlatformError> {
        Snapshot::filled(area, *self.screen.lock()).ok_or_else(|| PlatformError::Capture("empty region".into()))
    }

    fn screen_bounds(&self) -> Option<Rect> { self.bounds }

    fn sleep(&self, duration: Duration) { self.sleeps.lock().push(duration); }
}

#[derive(Default)]
pub(crate) struct FakeColors {
    pub answer: Option<Point>,
    pub searches: Mutex<Vec<Rect>>,
}

impl ColorMatcher for FakeColors {
    fn find_point(&self, _color: Rgb, _tolerance: i32, region: Rect) -> Option<Point> {
        self.searches.lock().push(region);
        self.answer
    }
}

pub(crate) fn area_step(area: Rect, delay_ms: u32) -> SequenceStep {
    SequenceStep {
        target_mode: TargetMode::ClickArea,
        click_area: area,
        delay_ms,
        deviation_ms: 0,
        ..SequenceStep::default()
    }
}

pub(crate) fn sequence(steps: Vec<SequenceStep>) -> Sequence {
    Sequence { name: "test".to_string(), steps, ..Sequence::default() }
}

pub(crate) fn engine(platform: Arc<FakePlatform>, config: EngineConfig) -> (SequenceEngine, Arc<EventLog>) {
    let events = Arc::new(EventLog::new());
    let collab = Collaborators {
        platform,
        colors: Arc::new(FakeColors::default()),
        overlay: Arc::new(NoOverlay),
        events: events.clone(),
        color_cache: None,
    };
    (SequenceEngine::new(collab, config).with_seed(7), events)
}

/// Fires due timers back to back until the run ends or `limit` timers fired.
pub(crate) fn drive(engine: &mut SequenceEngine, limit: usize) -> usize {
    let mut fired = 0;
    while fired < limit {
        let Some((at, generation)) = engine.next_timer() else { break };
        engine.fire(generation, at);
        fired += 1;
    }
    fired
}

pub(crate) fn steps_executed(events: &EventLog) -> usize {
    events.count(|e| matches!(e, RunnerEvent::StepExecuted { .. }))
}
