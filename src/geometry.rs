use rand::Rng;
use serde::{Deserialize, Serialize};

/// Screen point in physical pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point { pub x: i32, pub y: i32 }

impl Point {
    pub const fn new(x: i32, y: i32) -> Self { Self { x, y } }

    pub fn distance(&self, other: Point) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Point { Point::new(self.x + dx, self.y + dy) }
}

/// Axis-aligned screen rectangle. A zero width or height means "unset".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect { pub x: i32, pub y: i32, pub width: i32, pub height: i32 }

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self { Self { x, y, width, height } }

    /// Square of side `size` centered on `center`.
    pub fn centered_on(center: Point, size: i32) -> Self {
        let half = size / 2;
        Self::new(center.x - half, center.y - half, size, size)
    }

    /// Normalized rectangle spanning two corners, in either drag direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let min_x = a.x.min(b.x);
        let min_y = a.y.min(b.y);
        Self::new(min_x, min_y, a.x.max(b.x) - min_x, a.y.max(b.y) - min_y)
    }

    pub fn right(&self) -> i32 { self.x.saturating_add(self.width) }
    pub fn bottom(&self) -> i32 { self.y.saturating_add(self.height) }
    pub fn is_set(&self) -> bool { self.width > 0 && self.height > 0 }

    /// Both far edges are representable as screen coordinates.
    pub fn in_range(&self) -> bool {
        self.x.checked_add(self.width).is_some() && self.y.checked_add(self.height).is_some()
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x && other.y >= self.y && other.right() <= self.right() && other.bottom() <= self.bottom()
    }

    /// Uniform point with `x ∈ [x, x+w)` and `y ∈ [y, y+h)`. Unset rects yield their origin.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        if !self.is_set() {
            return Point::new(self.x, self.y);
        }
        Point::new(rng.gen_range(self.x..self.right()), rng.gen_range(self.y..self.bottom()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb { pub r: u8, pub g: u8, pub b: u8 }

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self { Self { r, g, b } }

    /// Per-channel distance check.
    pub fn is_similar(&self, other: Rgb, tolerance: i32) -> bool {
        (self.r as i32 - other.r as i32).abs() <= tolerance
            && (self.g as i32 - other.g as i32).abs() <= tolerance
            && (self.b as i32 - other.b as i32).abs() <= tolerance
    }
}
