//! Real desktop backend: enigo for input, xcap for pixels, display-info for monitor geometry.

use display_info::DisplayInfo;
use enigo::{self, MouseControllable};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::PlatformError;
use crate::geometry::{Point, Rect, Rgb};
use crate::platform::{MouseButton, Platform, Snapshot};

static ENIGO: Lazy<Mutex<enigo::Enigo>> = Lazy::new(|| Mutex::new(enigo::Enigo::new()));

impl MouseButton {
    fn to_enigo(self) -> enigo::MouseButton {
        match self {
            MouseButton::Left => enigo::MouseButton::Left,
            MouseButton::Right => enigo::MouseButton::Right,
            MouseButton::Middle => enigo::MouseButton::Middle,
        }
    }
}

fn capture_err(e: impl std::fmt::Display) -> PlatformError { PlatformError::Capture(e.to_string()) }

/// Process-wide mouse and screen access.
pub struct EnigoPlatform;

impl Platform for EnigoPlatform {
    fn move_cursor_to(&self, x: i32, y: i32) -> Result<(), PlatformError> {
        ENIGO.lock().mouse_move_to(x, y);
        Ok(())
    }

    fn cursor_position(&self) -> Point {
        let (x, y) = ENIGO.lock().mouse_location();
        Point::new(x, y)
    }

    fn send_click(&self, button: MouseButton) -> Result<(), PlatformError> {
        ENIGO.lock().mouse_click(button.to_enigo());
        Ok(())
    }

    fn button_down(&self, button: MouseButton) -> Result<(), PlatformError> {
        ENIGO.lock().mouse_down(button.to_enigo());
        Ok(())
    }

    fn button_up(&self, button: MouseButton) -> Result<(), PlatformError> {
        ENIGO.lock().mouse_up(button.to_enigo());
        Ok(())
    }

    fn capture_region(&self, area: Rect) -> Result<Snapshot, PlatformError> {
        if !area.is_set() {
            return Err(PlatformError::Capture(format!("empty region {area:?}")));
        }
        let center = Point::new(area.x + area.width / 2, area.y + area.height / 2);
        let display = DisplayInfo::from_point(center.x, center.y).map_err(capture_err)?;
        let image = xcap::Monitor::from_point(center.x, center.y)
            .and_then(|m| m.capture_image())
            .map_err(capture_err)?;

        // Captures are in physical pixels, display geometry in logical ones
        let scale_x = image.width() as f64 / display.width.max(1) as f64;
        let scale_y = image.height() as f64 / display.height.max(1) as f64;

        let mut pixels = Vec::with_capacity((area.width as usize).saturating_mul(area.height as usize));
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let px = ((x - display.x) as f64 * scale_x).floor();
                let py = ((y - display.y) as f64 * scale_y).floor();
                let inside = px >= 0.0 && py >= 0.0 && px < image.width() as f64 && py < image.height() as f64;
                pixels.push(if inside {
                    let [r, g, b, _] = image.get_pixel(px as u32, py as u32).0;
                    Rgb::new(r, g, b)
                } else {
                    Rgb::default()
                });
            }
        }
        debug!("captured {area:?} from display {} at {scale_x:.2}x", display.id);
        Snapshot::new(area, pixels).ok_or_else(|| PlatformError::Capture("pixel count mismatch".into()))
    }

    /// Union of all monitors, or the main display when enumeration fails.
    fn screen_bounds(&self) -> Option<Rect> {
        let displays = DisplayInfo::all().unwrap_or_default();
        if displays.is_empty() {
            let (w, h) = ENIGO.lock().main_display_size();
            return Some(Rect::new(0, 0, w as i32, h as i32));
        }

        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        for d in &displays {
            min_x = min_x.min(d.x);
            min_y = min_y.min(d.y);
            max_x = max_x.max(d.x + d.width as i32);
            max_y = max_y.max(d.y + d.height as i32);
        }
        Some(Rect::from_corners(Point::new(min_x, min_y), Point::new(max_x, max_y)))
    }
}
