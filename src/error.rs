use thiserror::Error;

/// A sequence that cannot be started as configured.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sequence has no steps")]
    EmptySequence,

    #[error("step {step} uses a click area but none is set")]
    UnsetClickArea { step: usize },

    #[error("step {step} uses color search but no search area is set")]
    UnsetSearchArea { step: usize },

    #[error("loop count must be positive, got {0}")]
    InvalidLoopCount(i32),

    #[error("step {step} area extends past the coordinate range")]
    AreaOutOfRange { step: usize },

    #[error("click interval must be at least {min}ms, got {interval}ms")]
    IntervalTooShort { interval: u32, min: u32 },
}

/// Failure reported by an input/capture backend. Logged by callers, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("input synthesis failed: {0}")]
    Input(String),

    #[error("screen capture failed: {0}")]
    Capture(String),

    #[error("unsupported on this backend: {0}")]
    Unsupported(&'static str),
}

#[derive(Error, Debug)]
pub enum SequenceFileError {
    #[error("failed to access file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed file: {0}")]
    Json(#[from] serde_json::Error),
}
