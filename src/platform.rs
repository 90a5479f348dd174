use std::{thread, time::Duration};

use crate::error::PlatformError;
use crate::geometry::{Point, Rect, Rgb};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton { Left, Right, Middle }

/// Captured screen region, row-major RGB.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub area: Rect,
    pixels: Vec<Rgb>,
}

impl Snapshot {
    /// Returns `None` when `pixels` does not cover `area` exactly.
    pub fn new(area: Rect, pixels: Vec<Rgb>) -> Option<Self> {
        let len = area.width.checked_mul(area.height)?;
        if !area.is_set() || pixels.len() != len as usize {
            return None;
        }
        Some(Self { area, pixels })
    }

    pub fn filled(area: Rect, color: Rgb) -> Option<Self> {
        let len = area.width.max(0).checked_mul(area.height.max(0))?;
        Self::new(area, vec![color; len as usize])
    }

    /// Pixel at region-local coordinates.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        if x < 0 || y < 0 || x >= self.area.width || y >= self.area.height {
            return None;
        }
        self.pixels.get((y * self.area.width + x) as usize).copied()
    }

    /// Iterates pixels with their absolute screen coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (Point, Rgb)> + '_ {
        let area = self.area;
        self.pixels.iter().enumerate().map(move |(i, c)| {
            let i = i as i32;
            (Point::new(area.x + i % area.width, area.y + i / area.width), *c)
        })
    }
}

/// Input synthesis and screen access. Every call is best-effort: callers log failures and carry on.
pub trait Platform: Send + Sync {
    fn move_cursor_to(&self, x: i32, y: i32) -> Result<(), PlatformError>;

    fn cursor_position(&self) -> Point;

    /// One down+up pair for `button`.
    fn send_click(&self, button: MouseButton) -> Result<(), PlatformError>;

    fn button_down(&self, button: MouseButton) -> Result<(), PlatformError>;

    fn button_up(&self, button: MouseButton) -> Result<(), PlatformError>;

    fn capture_region(&self, area: Rect) -> Result<Snapshot, PlatformError>;

    /// Union of all attached displays, when the backend knows it.
    fn screen_bounds(&self) -> Option<Rect> { None }

    fn sleep(&self, duration: Duration) { thread::sleep(duration) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_indexing() {
        let area = Rect::new(10, 20, 2, 2);
        let pixels = vec![Rgb::new(1, 0, 0), Rgb::new(2, 0, 0), Rgb::new(3, 0, 0), Rgb::new(4, 0, 0)];
        let snap = Snapshot::new(area, pixels).unwrap();
        assert_eq!(snap.pixel(1, 0), Some(Rgb::new(2, 0, 0)));
        assert_eq!(snap.pixel(0, 1), Some(Rgb::new(3, 0, 0)));
        assert_eq!(snap.pixel(2, 0), None);

        let coords: Vec<Point> = snap.iter().map(|(p, _)| p).collect();
        assert_eq!(coords, vec![Point::new(10, 20), Point::new(11, 20), Point::new(10, 21), Point::new(11, 21)]);
    }

    #[test]
    fn test_snapshot_rejects_mismatched_buffer() {
        assert!(Snapshot::new(Rect::new(0, 0, 2, 2), vec![Rgb::default(); 3]).is_none());
        assert!(Snapshot::filled(Rect::new(0, 0, 0, 2), Rgb::default()).is_none());
        assert!(Snapshot::new(Rect::new(0, 0, i32::MAX, 3), Vec::new()).is_none());
    }
}
