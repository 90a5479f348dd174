use std::time::Duration;

use tracing::debug;

use crate::geometry::{Point, Rect};
use crate::platform::Platform;
use crate::settings::MarkerPolicy;

/// Time given to any feedback marker to render before sampling.
pub const SAMPLE_DELAY: Duration = Duration::from_millis(50);
/// Pause after a detected failure before the retry target is chosen.
pub const RETRY_DELAY: Duration = Duration::from_millis(100);
/// Pause between moving to the retry target and clicking it.
pub const RETRY_MOVE_SETTLE: Duration = Duration::from_millis(100);
/// Pause after the retry click before the step is considered done.
pub const RETRY_CLICK_SETTLE: Duration = Duration::from_millis(50);

const SAMPLE_SIZE: i32 = 4;
// Center, above, below
const SAMPLE_PIXELS: [(i32, i32); 3] = [(2, 2), (2, 1), (2, 3)];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome { Passed, Failed }

/// Samples a 4x4 patch around `at` for the failure marker. Capture errors count as a pass.
pub fn check_click(platform: &dyn Platform, at: Point, policy: &MarkerPolicy) -> Outcome {
    let area = Rect::centered_on(at, SAMPLE_SIZE);
    let snapshot = match platform.capture_region(area) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            debug!("click validation sampling failed at {at:?}: {e}");
            return Outcome::Passed;
        }
    };

    for (x, y) in SAMPLE_PIXELS {
        if let Some(pixel) = snapshot.pixel(x, y) {
            if policy.matches(pixel) {
                debug!("failure marker at {at:?}: {pixel:?}");
                return Outcome::Failed;
            }
        }
    }
    debug!("no failure marker at {at:?}");
    Outcome::Passed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::geometry::Rgb;
    use crate::platform::{MouseButton, Snapshot};
    use parking_lot::Mutex;

    struct Screen {
        color: Option<Rgb>,
        requested: Mutex<Vec<Rect>>,
    }

    impl Platform for Screen {
        fn move_cursor_to(&self, _x: i32, _y: i32) -> Result<(), PlatformError> { Ok(()) }
        fn cursor_position(&self) -> Point { Point::default() }
        fn send_click(&self, _b: MouseButton) -> Result<(), PlatformError> { Ok(()) }
        fn button_down(&self, _b: MouseButton) -> Result<(), PlatformError> { Ok(()) }
        fn button_up(&self, _b: MouseButton) -> Result<(), PlatformError> { Ok(()) }
        fn capture_region(&self, area: Rect) -> Result<Snapshot, PlatformError> {
            self.requested.lock().push(area);
            let color = self.color.ok_or_else(|| PlatformError::Capture("no display".into()))?;
            Snapshot::filled(area, color).ok_or(PlatformError::Capture("empty".into()))
        }
    }

    fn screen(color: Option<Rgb>) -> Screen { Screen { color, requested: Mutex::new(Vec::new()) } }

    #[test]
    fn test_yellow_marker_fails_click() {
        let s = screen(Some(Rgb::new(250, 240, 30)));
        assert_eq!(check_click(&s, Point::new(50, 60), &MarkerPolicy::default()), Outcome::Failed);
        assert_eq!(*s.requested.lock(), vec![Rect::new(48, 58, 4, 4)]);
    }

    #[test]
    fn test_other_colors_pass() {
        let s = screen(Some(Rgb::new(250, 20, 30)));
        assert_eq!(check_click(&s, Point::new(5, 5), &MarkerPolicy::default()), Outcome::Passed);
    }

    #[test]
    fn test_capture_error_fails_open() {
        let s = screen(None);
        assert_eq!(check_click(&s, Point::new(5, 5), &MarkerPolicy::default()), Outcome::Passed);
    }

    #[test]
    fn test_policy_is_configurable() {
        let s = screen(Some(Rgb::new(250, 20, 30)));
        let red = MarkerPolicy { min_red: 200, min_green: 0, max_blue: 100 };
        assert_eq!(check_click(&s, Point::new(5, 5), &red), Outcome::Failed);
    }
}
