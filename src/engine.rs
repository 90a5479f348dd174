//! Sequence execution engine.
//!
//! Every action of a run happens inside [`SequenceEngine::fire`], called by a single timer
//! source whenever [`SequenceEngine::next_timer`] comes due. A run is always in exactly one
//! [`Phase`], so two motions, two clicks or overlapping step advances cannot coexist.
//! Timers carry the engine generation; `stop` and `start` bump it, which turns any timer
//! read before them into a no-op.

use std::{
    mem,
    sync::Arc,
    time::{Duration, Instant},
};

use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, warn};

use crate::clicker;
use crate::color::{ColorCache, ColorMatcher};
use crate::error::ConfigError;
use crate::events::{EventSink, RunnerEvent};
use crate::geometry::Point;
use crate::human_mouse::{self, MotionPlan};
use crate::model::{LoopMode, Sequence, SequenceStep, TargetMode};
use crate::overlay::Overlay;
use crate::platform::Platform;
use crate::resolver::StepResolver;
use crate::settings::EngineConfig;
use crate::validator::{self, Outcome};

/// Pause between the landing jitter and the return to the exact target.
pub const STUTTER_PAUSE: Duration = Duration::from_millis(15);

/// Everything the engine talks to, injected once.
#[derive(Clone)]
pub struct Collaborators {
    pub platform: Arc<dyn Platform>,
    pub colors: Arc<dyn ColorMatcher>,
    pub overlay: Arc<dyn Overlay>,
    pub events: Arc<dyn EventSink>,
    pub color_cache: Option<Arc<ColorCache>>,
}

#[derive(Debug)]
enum Phase {
    /// Run accepted; step 0 executes on the first fire.
    Starting,
    Moving { plan: MotionPlan, next: usize },
    Validating { clicked: Point },
    RetryPending { clicked: Point },
    RetryClick,
    RetrySettle,
    AwaitingDelay { due: Instant },
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Moving { .. } => "moving",
            Phase::Validating { .. } => "validating",
            Phase::RetryPending { .. } | Phase::RetryClick | Phase::RetrySettle => "retrying",
            Phase::AwaitingDelay { .. } => "awaiting_delay",
        }
    }
}

struct RunState {
    sequence: Arc<Sequence>,
    step_index: usize,
    loop_index: u32,
    total_loops: i32,
    pending_delay_ms: u64,
    steps_executed: u64,
    next_action_at: Option<Instant>,
    phase: Phase,
    due_at: Instant,
}

impl RunState {
    fn schedule(mut self, phase: Phase, at: Instant) -> Self {
        self.phase = phase;
        self.due_at = at;
        self
    }

    fn step(&self) -> &SequenceStep { &self.sequence.steps[self.step_index] }
}

/// Read-only view of the current run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub step_index: usize,
    pub total_steps: usize,
    pub loop_index: u32,
    pub total_loops: i32,
    pub steps_executed: u64,
    pub pending_delay_ms: u64,
    pub phase: &'static str,
}

pub struct SequenceEngine {
    platform: Arc<dyn Platform>,
    overlay: Arc<dyn Overlay>,
    events: Arc<dyn EventSink>,
    cache: Option<Arc<ColorCache>>,
    resolver: StepResolver,
    config: EngineConfig,
    rng: StdRng,
    generation: u64,
    run: Option<RunState>,
}

fn millis(ms: f64) -> Duration { Duration::from_secs_f64(ms.max(0.0) / 1000.0) }

impl SequenceEngine {
    pub fn new(collab: Collaborators, config: EngineConfig) -> Self {
        let mut resolver = StepResolver::new(Arc::clone(&collab.platform), collab.colors)
            .with_fallback_size(config.validation_area_size);
        if let Some(cache) = &collab.color_cache {
            resolver = resolver.with_cache(Arc::clone(cache));
        }
        Self {
            platform: collab.platform,
            overlay: collab.overlay,
            events: collab.events,
            cache: collab.color_cache,
            resolver,
            config,
            rng: StdRng::from_entropy(),
            generation: 0,
            run: None,
        }
    }

    /// Makes every random choice reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn is_running(&self) -> bool { self.run.is_some() }

    pub fn generation(&self) -> u64 { self.generation }

    /// Deadline and generation of the single pending timer.
    pub fn next_timer(&self) -> Option<(Instant, u64)> {
        self.run.as_ref().map(|r| (r.due_at, self.generation))
    }

    pub fn progress(&self) -> Option<Progress> {
        self.run.as_ref().map(|r| Progress {
            step_index: r.step_index,
            total_steps: r.sequence.steps.len(),
            loop_index: r.loop_index,
            total_loops: r.total_loops,
            steps_executed: r.steps_executed,
            pending_delay_ms: r.pending_delay_ms,
            phase: r.phase.name(),
        })
    }

    /// Validates and begins `sequence`, stopping any current run first.
    /// An invalid sequence is rejected without touching the current run.
    pub fn start(&mut self, sequence: Arc<Sequence>, now: Instant) -> Result<(), ConfigError> {
        sequence.validate()?;
        if self.run.is_some() {
            debug!("start while running, stopping current run first");
            self.stop();
        }
        self.warn_offscreen(&sequence);

        self.generation += 1;
        self.overlay.show(&sequence);
        info!(
            "starting {} ({} steps, {:?} x{})",
            sequence.name,
            sequence.steps.len(),
            sequence.loop_mode,
            sequence.total_loops()
        );
        self.run = Some(RunState {
            total_loops: sequence.total_loops(),
            sequence,
            step_index: 0,
            loop_index: 0,
            pending_delay_ms: 0,
            steps_executed: 0,
            next_action_at: None,
            phase: Phase::Starting,
            due_at: now,
        });
        Ok(())
    }

    /// Cancels the run and its pending timer. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.generation += 1;
        if let Some(run) = self.run.take() {
            self.teardown();
            info!("stopped after {} steps ({} loops)", run.steps_executed, run.loop_index);
            self.events.emit(RunnerEvent::SequenceStopped {
                loops_completed: run.loop_index,
                steps_executed: run.steps_executed,
            });
        }
    }

    /// Runs the pending timer if it belongs to `generation` and is due at `now`.
    pub fn fire(&mut self, generation: u64, now: Instant) -> bool {
        if generation != self.generation {
            debug!("ignoring stale timer from generation {generation}");
            return false;
        }
        let Some(run) = self.run.take() else { return false };
        if now < run.due_at {
            self.run = Some(run);
            return false;
        }
        self.run = self.advance(run, now);
        true
    }

    fn advance(&mut self, mut run: RunState, now: Instant) -> Option<RunState> {
        match mem::replace(&mut run.phase, Phase::Starting) {
            Phase::Starting => self.execute_step(run, now),
            Phase::Moving { plan, next } => self.tick_motion(run, plan, next, now),
            Phase::Validating { clicked } => {
                match validator::check_click(&*self.platform, clicked, &self.config.marker) {
                    Outcome::Failed => {
                        info!("click at {clicked:?} looks missed, retrying once");
                        Some(run.schedule(Phase::RetryPending { clicked }, now + validator::RETRY_DELAY))
                    }
                    Outcome::Passed => self.finish_step(run, now),
                }
            }
            Phase::RetryPending { clicked } => {
                let target = self.resolver.resolve_retry(run.step(), clicked, &mut self.rng);
                self.move_cursor(target);
                Some(run.schedule(Phase::RetryClick, now + validator::RETRY_MOVE_SETTLE))
            }
            Phase::RetryClick => {
                clicker::click(&*self.platform, run.step().click_type);
                Some(run.schedule(Phase::RetrySettle, now + validator::RETRY_CLICK_SETTLE))
            }
            Phase::RetrySettle => self.finish_step(run, now),
            Phase::AwaitingDelay { due } => {
                if now >= due {
                    return self.next_step(run, now);
                }
                self.events.emit(RunnerEvent::CountdownTick {
                    ms_remaining: (due - now).as_millis() as u64,
                    next_action_at: due,
                });
                let at = (now + self.config.countdown_interval).min(due);
                Some(run.schedule(Phase::AwaitingDelay { due }, at))
            }
        }
    }

    fn execute_step(&mut self, mut run: RunState, now: Instant) -> Option<RunState> {
        let sequence = Arc::clone(&run.sequence);
        let step = &sequence.steps[run.step_index];

        // Applied after the click: time until the next action
        run.pending_delay_ms = step.jittered_delay_ms(&mut self.rng);
        self.overlay.highlight(run.step_index);
        self.emit_progress(&run);

        let target = self.resolver.resolve(step, &mut self.rng);
        if step.target_mode == TargetMode::MousePosition {
            return self.click_at(run, step, target, now);
        }
        let current = self.platform.cursor_position();
        if current == target {
            return self.click_at(run, step, target, now);
        }

        let plan = human_mouse::plan_motion(current, target, step.movement_speed, step.custom_duration_ms, &mut self.rng);
        debug!(
            "moving {current:?} -> {target:?} over {:.0}ms{}",
            plan.duration_ms,
            if plan.uses_overshoot() { " with overshoot" } else { "" }
        );
        self.events.emit(RunnerEvent::MovementStarted { duration_ms: plan.duration_ms, target });
        let at = now + millis(plan.per_step_durations[0]);
        Some(run.schedule(Phase::Moving { plan, next: 0 }, at))
    }

    fn tick_motion(&mut self, run: RunState, plan: MotionPlan, next: usize, now: Instant) -> Option<RunState> {
        self.move_cursor(plan.waypoint(next));

        let next = next + 1;
        if next < plan.steps() {
            let at = now + millis(plan.per_step_durations[next]);
            return Some(run.schedule(Phase::Moving { plan, next }, at));
        }
        if let Some(back) = plan.correction(&mut self.rng) {
            let at = now + millis(back.per_step_durations[0]);
            return Some(run.schedule(Phase::Moving { plan: back, next: 0 }, at));
        }

        self.stutter(plan.target);
        let sequence = Arc::clone(&run.sequence);
        let index = run.step_index;
        self.click_at(run, &sequence.steps[index], plan.target, now)
    }

    fn click_at(&mut self, run: RunState, step: &SequenceStep, target: Point, now: Instant) -> Option<RunState> {
        clicker::click(&*self.platform, step.click_type);
        if self.config.validation_enabled {
            return Some(run.schedule(Phase::Validating { clicked: target }, now + validator::SAMPLE_DELAY));
        }
        self.finish_step(run, now)
    }

    fn finish_step(&mut self, mut run: RunState, now: Instant) -> Option<RunState> {
        run.steps_executed += 1;
        self.events.emit(RunnerEvent::StepExecuted {
            step: run.step().clone(),
            step_index: run.step_index,
            loop_index: run.loop_index,
            actual_delay_ms: run.pending_delay_ms,
        });

        let due = now + Duration::from_millis(run.pending_delay_ms);
        run.next_action_at = Some(due);
        self.prime_cache(&run);
        let at = (now + self.config.countdown_interval).min(due);
        Some(run.schedule(Phase::AwaitingDelay { due }, at))
    }

    fn next_step(&mut self, mut run: RunState, now: Instant) -> Option<RunState> {
        run.step_index += 1;
        if run.step_index >= run.sequence.steps.len() {
            return self.complete_loop(run, now);
        }
        self.execute_step(run, now)
    }

    fn complete_loop(&mut self, mut run: RunState, now: Instant) -> Option<RunState> {
        run.loop_index += 1;
        let more = match run.sequence.loop_mode {
            LoopMode::Once => false,
            LoopMode::Forever => true,
            LoopMode::Count => (run.loop_index as i64) < run.total_loops as i64,
        };
        if more {
            run.step_index = 0;
            self.emit_progress(&run);
            return self.execute_step(run, now);
        }

        self.teardown();
        let total_steps = run.sequence.steps.len() as u64 * run.loop_index as u64;
        info!("{} completed: {} loops, {} steps", run.sequence.name, run.loop_index, total_steps);
        self.events.emit(RunnerEvent::SequenceCompleted { total_loops: run.loop_index, total_steps });
        None
    }

    fn emit_progress(&self, run: &RunState) {
        self.events.emit(RunnerEvent::ProgressChanged {
            step_index: run.step_index,
            total_steps: run.sequence.steps.len(),
            loop_index: run.loop_index,
            total_loops: run.total_loops,
            next_action_at: run.next_action_at,
        });
    }

    fn move_cursor(&self, p: Point) {
        if let Err(e) = self.platform.move_cursor_to(p.x, p.y) {
            warn!("cursor move to {p:?} failed: {e}");
        }
    }

    fn stutter(&mut self, at: Point) {
        let (dx, dy) = human_mouse::stutter_offset(&mut self.rng);
        self.move_cursor(at.offset(dx, dy));
        self.platform.sleep(STUTTER_PAUSE);
        self.move_cursor(at);
    }

    /// Points the background color worker at the step that runs next.
    fn prime_cache(&self, run: &RunState) {
        let Some(cache) = &self.cache else { return };
        let steps = &run.sequence.steps;
        let upcoming = &steps[(run.step_index + 1) % steps.len()];
        let query = (upcoming.target_mode == TargetMode::ColorClick).then(|| upcoming.color_query());
        cache.prime(query);
    }

    fn teardown(&self) {
        self.overlay.hide();
        if let Some(cache) = &self.cache {
            cache.prime(None);
        }
    }

    fn warn_offscreen(&self, sequence: &Sequence) {
        let Some(screen) = self.platform.screen_bounds() else { return };
        for (i, step) in sequence.steps.iter().enumerate() {
            if let Some(area) = step.active_area() {
                if !screen.contains_rect(&area) {
                    warn!("step {i} area {area:?} extends outside the screen {screen:?}");
                }
            }
        }
    }
}
