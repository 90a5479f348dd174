use tracing::info;

use crate::model::Sequence;

/// Visual highlighting of a running sequence. Fire-and-forget.
pub trait Overlay: Send + Sync {
    fn show(&self, sequence: &Sequence);
    fn highlight(&self, step_index: usize);
    fn hide(&self);
}

pub struct NoOverlay;

impl Overlay for NoOverlay {
    fn show(&self, _sequence: &Sequence) {}
    fn highlight(&self, _step_index: usize) {}
    fn hide(&self) {}
}

/// Reports overlay changes to the log, for headless runs.
pub struct LogOverlay;

impl Overlay for LogOverlay {
    fn show(&self, sequence: &Sequence) {
        info!("showing {} ({} steps)", sequence.name, sequence.steps.len());
    }

    fn highlight(&self, step_index: usize) {
        info!("step #{}", step_index + 1);
    }

    fn hide(&self) {
        info!("overlay hidden");
    }
}
