use rand::Rng;

use crate::geometry::Point;
use crate::model::MovementSpeed;

pub const MOVEMENT_STEPS: usize = 10;
pub const MIN_MOVEMENT_DURATION_MS: f64 = 100.0;
pub const MAX_MOVEMENT_DURATION_MS: f64 = 250.0;
/// Paths at least this long overshoot the target and correct back.
pub const OVERSHOOT_MIN_DISTANCE: f64 = 300.0;

const SPEED_VARIATION_FACTOR: f64 = 0.3;
const DISTANCE_SPEED_FACTOR: f64 = 0.15;
const MIN_INTERVAL_MS: f64 = 5.0;
const CONTROL_MARGIN: f64 = 20.0;
const FORWARD_CURVE_CAP: f64 = 40.0;
const CORRECTION_CURVE_CAP: f64 = 20.0;
const CORRECTION_DURATION_FACTOR: f64 = 0.6;

/// Sub-pixel point used for the Bézier control point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Control { pub x: f64, pub y: f64 }

/// One leg of humanized movement: ten eased waypoints along a quadratic Bézier curve.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionPlan {
    pub start: Point,
    /// Where the cursor should finally rest.
    pub target: Point,
    pub control_point: Control,
    /// Set when this leg deliberately lands past `target`.
    pub overshoot_point: Option<Point>,
    /// Time before each waypoint, summing to `duration_ms`.
    pub per_step_durations: Vec<f64>,
    pub duration_ms: f64,
}

impl MotionPlan {
    pub fn uses_overshoot(&self) -> bool { self.overshoot_point.is_some() }

    /// End of this leg: the overshoot point if any, else the target.
    pub fn leg_end(&self) -> Point { self.overshoot_point.unwrap_or(self.target) }

    pub fn steps(&self) -> usize { self.per_step_durations.len() }

    /// Quadratic Bézier `B(t) = (1-t)²P0 + 2(1-t)t·Pc + t²P1`.
    pub fn bezier(&self, t: f64) -> Point {
        let end = self.leg_end();
        let u = 1.0 - t;
        let x = u * u * self.start.x as f64 + 2.0 * u * t * self.control_point.x + t * t * end.x as f64;
        let y = u * u * self.start.y as f64 + 2.0 * u * t * self.control_point.y + t * t * end.y as f64;
        Point::new(x.round() as i32, y.round() as i32)
    }

    /// Waypoint `i` with cubic ease-out timing.
    pub fn waypoint(&self, i: usize) -> Point {
        let n = self.steps();
        if n <= 1 {
            return self.leg_end();
        }
        let t = i.min(n - 1) as f64 / (n - 1) as f64;
        self.bezier(ease_out_cubic(t))
    }

    pub fn waypoints(&self) -> Vec<Point> { (0..self.steps()).map(|i| self.waypoint(i)).collect() }

    /// Return leg from the overshoot point back to the real target, at ~60% of this leg's duration.
    pub fn correction<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<MotionPlan> {
        let from = self.overshoot_point?;
        let duration = self.duration_ms * CORRECTION_DURATION_FACTOR;
        Some(MotionPlan {
            start: from,
            target: self.target,
            control_point: control_point(from, self.target, CORRECTION_CURVE_CAP, rng),
            overshoot_point: None,
            per_step_durations: speed_intervals(duration, MOVEMENT_STEPS, rng),
            duration_ms: duration,
        })
    }
}

pub fn ease_out_cubic(t: f64) -> f64 { 1.0 - (1.0 - t).powi(3) }

/// Plans the forward leg of a humanized move from `start` to `end`.
pub fn plan_motion<R: Rng + ?Sized>(
    start: Point,
    end: Point,
    speed: MovementSpeed,
    custom_duration_ms: u32,
    rng: &mut R,
) -> MotionPlan {
    let distance = start.distance(end);
    let overshoot_point = if distance >= OVERSHOOT_MIN_DISTANCE {
        Some(overshoot(start, end, distance, rng))
    } else {
        None
    };
    let leg_end = overshoot_point.unwrap_or(end);
    let duration = movement_duration(distance, speed, custom_duration_ms, rng);

    MotionPlan {
        start,
        target: end,
        control_point: control_point(start, leg_end, FORWARD_CURVE_CAP, rng),
        overshoot_point,
        per_step_durations: speed_intervals(duration, MOVEMENT_STEPS, rng),
        duration_ms: duration,
    }
}

/// Extends 4–10% past `end` with a 15–35px sideways miss.
fn overshoot<R: Rng + ?Sized>(start: Point, end: Point, distance: f64, rng: &mut R) -> Point {
    let dir_x = (end.x - start.x) as f64 / distance;
    let dir_y = (end.y - start.y) as f64 / distance;
    let extend = distance * rng.gen_range(0.04..=0.10);
    let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let miss = rng.gen_range(15.0..=35.0) * side;
    Point::new(
        (end.x as f64 + dir_x * extend - dir_y * miss).round() as i32,
        (end.y as f64 + dir_y * extend + dir_x * miss).round() as i32,
    )
}

/// Midpoint pushed by up to `min(0.3·d, cap)` per axis, kept within 20px of the endpoints' box.
fn control_point<R: Rng + ?Sized>(from: Point, to: Point, cap: f64, rng: &mut R) -> Control {
    let mid_x = (from.x + to.x) as f64 / 2.0;
    let mid_y = (from.y + to.y) as f64 / 2.0;
    let max_offset = (from.distance(to) * 0.3).min(cap);
    let offset_x = (rng.gen::<f64>() - 0.5) * max_offset * 2.0;
    let offset_y = (rng.gen::<f64>() - 0.5) * max_offset * 2.0;
    Control {
        x: (mid_x + offset_x).clamp(
            from.x.min(to.x) as f64 - CONTROL_MARGIN,
            from.x.max(to.x) as f64 + CONTROL_MARGIN,
        ),
        y: (mid_y + offset_y).clamp(
            from.y.min(to.y) as f64 - CONTROL_MARGIN,
            from.y.max(to.y) as f64 + CONTROL_MARGIN,
        ),
    }
}

fn movement_duration<R: Rng + ?Sized>(distance: f64, speed: MovementSpeed, custom_ms: u32, rng: &mut R) -> f64 {
    let base = match speed {
        MovementSpeed::Fast => rng.gen_range(80..150),
        MovementSpeed::Medium => rng.gen_range(150..250),
        MovementSpeed::Slow => rng.gen_range(250..400),
        // Custom is taken as-is
        MovementSpeed::Custom => return custom_ms as f64,
    } as f64;

    // Longer paths move relatively faster
    let mut duration = base / (1.0 + (distance / 1000.0) * DISTANCE_SPEED_FACTOR);
    if distance < 100.0 {
        duration *= 0.5;
    } else if distance > 500.0 {
        duration *= 1.2;
    }
    duration.clamp(MIN_MOVEMENT_DURATION_MS, MAX_MOVEMENT_DURATION_MS)
}

/// Per-waypoint delays summing exactly to `total_ms`: slow start, quick middle, easing finish.
pub fn speed_intervals<R: Rng + ?Sized>(total_ms: f64, steps: usize, rng: &mut R) -> Vec<f64> {
    if steps == 0 {
        return Vec::new();
    }
    let n = steps as f64;
    let base = total_ms / n;
    let mut intervals: Vec<f64> = (0..steps)
        .map(|i| {
            let i = i as f64;
            let variation = 1.0 + (rng.gen::<f64>() - 0.5) * SPEED_VARIATION_FACTOR;
            let pattern = if i < n * 0.3 {
                1.2 + (i / (n * 0.3)) * 0.3
            } else if i > n * 0.7 {
                1.0 - ((i - n * 0.7) / (n * 0.3)) * 0.4
            } else {
                0.8 + rng.gen::<f64>() * 0.2
            };
            (base * variation * pattern).max(MIN_INTERVAL_MS)
        })
        .collect();

    let generated: f64 = intervals.iter().sum();
    let scale = total_ms / generated;
    for interval in &mut intervals {
        *interval *= scale;
    }
    intervals
}

/// Small 1–3px jitter applied after landing so the final approach is not perfectly straight.
/// Offsets are whole pixels whose Euclidean length lies in `[1, 3]`.
pub fn stutter_offset<R: Rng + ?Sized>(rng: &mut R) -> (i32, i32) {
    loop {
        let dx = rng.gen_range(-3..=3);
        let dy = rng.gen_range(-3..=3);
        if (1..=9).contains(&(dx * dx + dy * dy)) {
            return (dx, dy);
        }
    }
}
