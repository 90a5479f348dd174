//! Capture and linear replay of raw mouse activity.

use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clicker;
use crate::error::SequenceFileError;
use crate::geometry::Point;
use crate::model::ClickType;
use crate::platform::{MouseButton, Platform};

/// Cursor travel (px) below which a poll records nothing.
pub const MOVE_THRESHOLD: f64 = 2.0;
pub const POLL_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedActionType {
    MouseMove,
    LeftDown,
    LeftUp,
    RightDown,
    RightUp,
    MiddleDown,
    MiddleUp,
    LeftClick,
    RightClick,
    MiddleClick,
    DoubleClick,
}

impl RecordedActionType {
    fn press(button: MouseButton, down: bool) -> Self {
        match (button, down) {
            (MouseButton::Left, true) => Self::LeftDown,
            (MouseButton::Left, false) => Self::LeftUp,
            (MouseButton::Right, true) => Self::RightDown,
            (MouseButton::Right, false) => Self::RightUp,
            (MouseButton::Middle, true) => Self::MiddleDown,
            (MouseButton::Middle, false) => Self::MiddleUp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    pub action_type: RecordedActionType,
    pub position: Point,
    /// Offset from the start of the recording.
    pub timestamp_ms: u64,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseRecording {
    pub name: String,
    pub actions: Vec<RecordedAction>,
    pub total_duration_ms: u64,
}

impl MouseRecording {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn add_action(&mut self, action: RecordedAction) {
        self.total_duration_ms = self.total_duration_ms.max(action.timestamp_ms + action.duration_ms);
        self.actions.push(action);
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.total_duration_ms = 0;
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

struct RecorderState {
    started: Instant,
    recording: MouseRecording,
    last_position: Point,
    paused: bool,
}

/// Accumulates mouse activity into a [`MouseRecording`].
///
/// Movement comes from polling the cursor; button presses are pushed in by whoever observes
/// them (the global hook, or a caller). Clones share the same recording.
#[derive(Clone)]
pub struct Recorder {
    platform: Arc<dyn Platform>,
    state: Arc<Mutex<RecorderState>>,
    running: Arc<AtomicBool>,
}

impl Recorder {
    /// Starts recording without a polling thread; call [`Recorder::poll`] to sample movement.
    pub fn new(platform: Arc<dyn Platform>, name: impl Into<String>) -> Self {
        let last_position = platform.cursor_position();
        Self {
            platform,
            state: Arc::new(Mutex::new(RecorderState {
                started: Instant::now(),
                recording: MouseRecording::new(name),
                last_position,
                paused: false,
            })),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Starts recording and polls the cursor every `interval` until stopped.
    pub fn spawn(platform: Arc<dyn Platform>, name: impl Into<String>, interval: Duration) -> Self {
        let recorder = Self::new(platform, name);
        let poller = recorder.clone();
        thread::spawn(move || {
            while poller.is_recording() {
                poller.poll();
                thread::sleep(interval);
            }
            debug!("recorder poll thread stopped");
        });
        recorder
    }

    pub fn is_recording(&self) -> bool { self.running.load(Ordering::Relaxed) }

    pub fn is_paused(&self) -> bool { self.state.lock().paused }

    /// Records a move if the cursor travelled far enough since the last sample.
    pub fn poll(&self) {
        let position = self.platform.cursor_position();
        let mut state = self.state.lock();
        if state.last_position.distance(position) > MOVE_THRESHOLD {
            state.last_position = position;
            push(&mut state, RecordedActionType::MouseMove, position);
        }
    }

    pub fn record_button_down(&self, button: MouseButton) { self.record_button(button, true); }

    pub fn record_button_up(&self, button: MouseButton) { self.record_button(button, false); }

    fn record_button(&self, button: MouseButton, down: bool) {
        let position = self.platform.cursor_position();
        let mut state = self.state.lock();
        push(&mut state, RecordedActionType::press(button, down), position);
    }

    pub fn pause(&self) { self.state.lock().paused = true; }

    pub fn resume(&self) { self.state.lock().paused = false; }

    /// Ends recording. `None` when already stopped or nothing was captured.
    pub fn stop(&self) -> Option<MouseRecording> {
        if !self.running.swap(false, Ordering::Relaxed) {
            return None;
        }
        let mut state = self.state.lock();
        let name = state.recording.name.clone();
        let recording = std::mem::replace(&mut state.recording, MouseRecording::new(name));
        info!("recorded {} actions over {}ms", recording.actions.len(), recording.total_duration_ms);
        (!recording.actions.is_empty()).then_some(recording)
    }
}

fn push(state: &mut RecorderState, action_type: RecordedActionType, position: Point) {
    if state.paused {
        return;
    }
    let timestamp_ms = state.started.elapsed().as_millis() as u64;
    state.recording.add_action(RecordedAction { action_type, position, timestamp_ms, duration_ms: 0 });
}

/// Replays a recording on its own thread.
pub struct Player {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<usize>>,
}

impl Player {
    /// `speed` scales playback: 2.0 replays twice as fast.
    pub fn spawn(platform: Arc<dyn Platform>, recording: MouseRecording, speed: f64) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::spawn(move || {
            let done = play(&*platform, &recording, speed, &flag);
            flag.store(false, Ordering::Relaxed);
            done
        });
        Self { running, handle: Some(handle) }
    }

    pub fn stop(&self) { self.running.store(false, Ordering::Relaxed); }

    /// Waits for playback to end and returns how many actions ran.
    pub fn join(mut self) -> usize {
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(done)) => done,
            Some(Err(_)) => {
                warn!("playback thread panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) { self.stop(); }
}

/// Replays `recording` in order, sleeping the scaled gap before each action.
/// Stops early once `running` is cleared. Returns how many actions ran.
pub fn play(platform: &dyn Platform, recording: &MouseRecording, speed: f64, running: &AtomicBool) -> usize {
    let speed = if speed > 0.0 { speed } else { 1.0 };
    let mut previous_ms = 0;
    let mut done = 0;
    for action in &recording.actions {
        let gap = action.timestamp_ms.saturating_sub(previous_ms);
        previous_ms = action.timestamp_ms;
        if gap > 0 {
            platform.sleep(Duration::from_micros((gap as f64 * 1000.0 / speed).round() as u64));
        }
        if !running.load(Ordering::Relaxed) {
            debug!("playback stopped after {done} actions");
            break;
        }
        perform(platform, action);
        done += 1;
    }
    done
}

fn perform(platform: &dyn Platform, action: &RecordedAction) {
    let p = action.position;
    if let Err(e) = platform.move_cursor_to(p.x, p.y) {
        warn!("playback move to {p:?} failed: {e}");
    }
    let result = match action.action_type {
        RecordedActionType::MouseMove => Ok(()),
        RecordedActionType::LeftDown => platform.button_down(MouseButton::Left),
        RecordedActionType::LeftUp => platform.button_up(MouseButton::Left),
        RecordedActionType::RightDown => platform.button_down(MouseButton::Right),
        RecordedActionType::RightUp => platform.button_up(MouseButton::Right),
        RecordedActionType::MiddleDown => platform.button_down(MouseButton::Middle),
        RecordedActionType::MiddleUp => platform.button_up(MouseButton::Middle),
        RecordedActionType::LeftClick => platform.send_click(MouseButton::Left),
        RecordedActionType::RightClick => platform.send_click(MouseButton::Right),
        RecordedActionType::MiddleClick => platform.send_click(MouseButton::Middle),
        RecordedActionType::DoubleClick => {
            clicker::click(platform, ClickType::Double);
            Ok(())
        }
    };
    if let Err(e) = result {
        warn!("playback {:?} failed: {e}", action.action_type);
    }
}
