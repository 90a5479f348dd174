//! Humanized mouse click sequences: Bézier motion with overshoot, click validation with a
//! single retry, and a timer-driven runner with looping.

pub mod cli;
pub mod clicker;
pub mod color;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
#[cfg(feature = "hooks")]
pub mod hooks;
pub mod human_mouse;
pub mod model;
pub mod overlay;
pub mod platform;
pub mod recording;
pub mod resolver;
pub mod runner;
pub mod settings;
pub mod validator;

#[cfg(test)]
mod testing;

pub use engine::{Collaborators, Progress, SequenceEngine};
pub use error::{ConfigError, PlatformError, SequenceFileError};
pub use events::{EventSink, RunnerEvent};
pub use geometry::{Point, Rect, Rgb};
pub use model::{ClickType, LoopMode, MovementSpeed, Sequence, SequenceStep, TargetMode};
pub use platform::{MouseButton, Platform};
pub use runner::Runner;
pub use settings::{EngineConfig, MemorySettings, Settings};
