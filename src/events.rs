use std::{sync::mpsc::Sender, time::Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::geometry::Point;
use crate::model::SequenceStep;

/// Progress notifications emitted by the sequence engine.
#[derive(Clone, Debug, PartialEq)]
pub enum RunnerEvent {
    ProgressChanged {
        step_index: usize,
        total_steps: usize,
        loop_index: u32,
        /// `-1` when looping forever.
        total_loops: i32,
        next_action_at: Option<Instant>,
    },
    StepExecuted {
        step: SequenceStep,
        step_index: usize,
        loop_index: u32,
        actual_delay_ms: u64,
    },
    CountdownTick {
        ms_remaining: u64,
        next_action_at: Instant,
    },
    MovementStarted {
        duration_ms: f64,
        target: Point,
    },
    SequenceCompleted {
        total_loops: u32,
        total_steps: u64,
    },
    /// An active run was stopped before exhausting its loops.
    SequenceStopped {
        loops_completed: u32,
        steps_executed: u64,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunnerEvent);
}

/// Reports progress through `tracing`; countdown ticks only at debug level.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: RunnerEvent) {
        match event {
            RunnerEvent::ProgressChanged { step_index, total_steps, loop_index, total_loops, .. } => {
                let loops = if total_loops < 0 { "forever".to_string() } else { total_loops.to_string() };
                info!("step {}/{total_steps}, loop {}/{loops}", step_index + 1, loop_index + 1);
            }
            RunnerEvent::StepExecuted { step, actual_delay_ms, .. } => {
                info!("executed {:?} ({}), next in {actual_delay_ms}ms", step.click_type, step.description);
            }
            RunnerEvent::CountdownTick { ms_remaining, .. } => debug!("{ms_remaining}ms to next action"),
            RunnerEvent::MovementStarted { duration_ms, target } => {
                debug!("moving to {target:?} over {duration_ms:.0}ms");
            }
            RunnerEvent::SequenceCompleted { total_loops, total_steps } => {
                info!("sequence completed: {total_loops} loops, {total_steps} steps");
            }
            RunnerEvent::SequenceStopped { loops_completed, steps_executed } => {
                info!("sequence stopped: {loops_completed} loops, {steps_executed} steps");
            }
        }
    }
}

impl EventSink for Mutex<Sender<RunnerEvent>> {
    fn emit(&self, event: RunnerEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.lock().send(event);
    }
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<RunnerEvent>>,
}

impl EventLog {
    pub fn new() -> Self { Self::default() }

    pub fn snapshot(&self) -> Vec<RunnerEvent> { self.events.lock().clone() }

    pub fn drain(&self) -> Vec<RunnerEvent> { std::mem::take(&mut *self.events.lock()) }

    pub fn count(&self, pred: impl Fn(&RunnerEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: RunnerEvent) { self.events.lock().push(event); }
}
