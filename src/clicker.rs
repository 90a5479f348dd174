use std::time::Duration;

use tracing::warn;

use crate::model::ClickType;
use crate::platform::{MouseButton, Platform};

pub const DOUBLE_CLICK_GAP: Duration = Duration::from_millis(50);

impl ClickType {
    /// Button a single press of this click type uses.
    pub fn button(self) -> MouseButton {
        match self {
            ClickType::Left | ClickType::Double => MouseButton::Left,
            ClickType::Right => MouseButton::Right,
            ClickType::Middle => MouseButton::Middle,
        }
    }
}

/// Synthesizes a logical click. Failures are logged and swallowed.
pub fn click(platform: &dyn Platform, click_type: ClickType) {
    match click_type {
        ClickType::Double => {
            press(platform, MouseButton::Left);
            platform.sleep(DOUBLE_CLICK_GAP);
            press(platform, MouseButton::Left);
        }
        other => press(platform, other.button()),
    }
}

fn press(platform: &dyn Platform, button: MouseButton) {
    if let Err(e) = platform.send_click(button) {
        warn!("{button:?} click failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::geometry::{Point, Rect};
    use crate::platform::Snapshot;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Log {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Platform for Log {
        fn move_cursor_to(&self, _x: i32, _y: i32) -> Result<(), PlatformError> { Ok(()) }
        fn cursor_position(&self) -> Point { Point::default() }
        fn send_click(&self, button: MouseButton) -> Result<(), PlatformError> {
            self.calls.lock().push(format!("click {button:?}"));
            if self.fail { Err(PlatformError::Input("denied".into())) } else { Ok(()) }
        }
        fn button_down(&self, _b: MouseButton) -> Result<(), PlatformError> { Ok(()) }
        fn button_up(&self, _b: MouseButton) -> Result<(), PlatformError> { Ok(()) }
        fn capture_region(&self, _a: Rect) -> Result<Snapshot, PlatformError> { Err(PlatformError::Unsupported("capture")) }
        fn sleep(&self, d: Duration) { self.calls.lock().push(format!("sleep {}", d.as_millis())); }
    }

    #[test]
    fn test_single_clicks_map_to_buttons() {
        let log = Log::default();
        click(&log, ClickType::Left);
        click(&log, ClickType::Right);
        click(&log, ClickType::Middle);
        assert_eq!(*log.calls.lock(), vec!["click Left", "click Right", "click Middle"]);
    }

    #[test]
    fn test_double_click_is_two_lefts_with_gap() {
        let log = Log::default();
        click(&log, ClickType::Double);
        assert_eq!(*log.calls.lock(), vec!["click Left", "sleep 50", "click Left"]);
    }

    #[test]
    fn test_failures_are_swallowed() {
        let log = Log { fail: true, ..Log::default() };
        click(&log, ClickType::Double);
        assert_eq!(log.calls.lock().len(), 3);
    }
}
