use std::{fs, path::Path};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SequenceFileError};
use crate::geometry::{Rect, Rgb};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickType { #[default] Left, Right, Middle, Double }

/// How a step's target point is determined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode { #[default] ClickArea, ColorClick, MousePosition }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode { #[default] Once, Forever, Count }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementSpeed { Fast, #[default] Medium, Slow, Custom }

/// One action template of a [`Sequence`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceStep {
    pub click_type: ClickType,
    pub delay_ms: u32,
    pub deviation_ms: u32,
    pub movement_speed: MovementSpeed,
    pub custom_duration_ms: u32,
    pub target_mode: TargetMode,
    pub click_area: Rect,
    pub target_color: Rgb,
    pub color_tolerance: i32,
    pub color_search_area: Rect,
    pub description: String,
    /// Lower bound for the jittered delay.
    pub min_delay_ms: u32,
}

impl Default for SequenceStep {
    fn default() -> Self {
        Self {
            click_type: ClickType::Left,
            delay_ms: 1000,
            deviation_ms: 100,
            movement_speed: MovementSpeed::Medium,
            custom_duration_ms: 150,
            target_mode: TargetMode::ClickArea,
            click_area: Rect::new(0, 0, 100, 100),
            target_color: Rgb::new(255, 0, 0),
            color_tolerance: 30,
            color_search_area: Rect::new(0, 0, 100, 100),
            description: "New Step".to_string(),
            min_delay_ms: 0,
        }
    }
}

impl SequenceStep {
    /// Delay until the next action: `delay ± deviation`, floored at `min_delay_ms`.
    pub fn jittered_delay_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let base = self.delay_ms as i64;
        let dev = self.deviation_ms as i64;
        let jitter = if dev > 0 { rng.gen_range(-dev..=dev) } else { 0 };
        (base + jitter).max(self.min_delay_ms as i64) as u64
    }

    /// The area this step draws random points from, if its mode uses one.
    pub fn active_area(&self) -> Option<Rect> {
        match self.target_mode {
            TargetMode::ClickArea => Some(self.click_area),
            TargetMode::ColorClick => Some(self.color_search_area),
            TargetMode::MousePosition => None,
        }
    }
}

/// Shortest interval the plain clicker accepts, and the floor of every jittered interval.
pub const MIN_CLICK_INTERVAL_MS: u32 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sequence {
    pub name: String,
    pub steps: Vec<SequenceStep>,
    pub loop_mode: LoopMode,
    pub loop_count: i32,
}

impl Default for Sequence {
    fn default() -> Self {
        Self { name: "New Sequence".to_string(), steps: Vec::new(), loop_mode: LoopMode::Once, loop_count: 1 }
    }
}

impl Sequence {
    /// Planned number of loops; `-1` means forever.
    pub fn total_loops(&self) -> i32 {
        match self.loop_mode {
            LoopMode::Once => 1,
            LoopMode::Forever => -1,
            LoopMode::Count => self.loop_count,
        }
    }

    /// Rejects configurations that would otherwise resolve to degenerate targets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::EmptySequence);
        }
        if self.loop_mode == LoopMode::Count && self.loop_count <= 0 {
            return Err(ConfigError::InvalidLoopCount(self.loop_count));
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step.target_mode {
                TargetMode::ClickArea if !step.click_area.is_set() => {
                    return Err(ConfigError::UnsetClickArea { step: i });
                }
                TargetMode::ColorClick if !step.color_search_area.is_set() => {
                    return Err(ConfigError::UnsetSearchArea { step: i });
                }
                _ => {}
            }
            if step.active_area().is_some_and(|a| !a.in_range()) {
                return Err(ConfigError::AreaOutOfRange { step: i });
            }
        }
        Ok(())
    }

    /// Plain interval clicker: one step repeated forever, at a random point of `area`
    /// (with humanized motion) or at the cursor when no area is given.
    pub fn interval_clicker(
        interval_ms: u32,
        deviation_ms: u32,
        area: Option<Rect>,
        click_type: ClickType,
        movement_speed: MovementSpeed,
    ) -> Result<Self, ConfigError> {
        if interval_ms < MIN_CLICK_INTERVAL_MS {
            return Err(ConfigError::IntervalTooShort { interval: interval_ms, min: MIN_CLICK_INTERVAL_MS });
        }
        let step = SequenceStep {
            click_type,
            delay_ms: interval_ms,
            deviation_ms,
            min_delay_ms: MIN_CLICK_INTERVAL_MS,
            movement_speed,
            target_mode: if area.is_some() { TargetMode::ClickArea } else { TargetMode::MousePosition },
            click_area: area.unwrap_or_default(),
            description: "Interval click".to_string(),
            ..SequenceStep::default()
        };
        let sequence = Sequence {
            name: "Interval clicker".to_string(),
            steps: vec![step],
            loop_mode: LoopMode::Forever,
            loop_count: 1,
        };
        sequence.validate()?;
        Ok(sequence)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SequenceFileError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SequenceFileError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
