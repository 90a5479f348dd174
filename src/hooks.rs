//! Global mouse hook feeding button presses into a [`Recorder`].

use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::platform::MouseButton;
use crate::recording::Recorder;

fn map_button(button: rdev::Button) -> Option<MouseButton> {
    match button {
        rdev::Button::Left => Some(MouseButton::Left),
        rdev::Button::Right => Some(MouseButton::Right),
        rdev::Button::Middle => Some(MouseButton::Middle),
        rdev::Button::Unknown(_) => None,
    }
}

fn handle(recorder: &Recorder, event: &rdev::Event) {
    if !recorder.is_recording() {
        return;
    }
    match event.event_type {
        rdev::EventType::ButtonPress(b) => {
            if let Some(b) = map_button(b) {
                recorder.record_button_down(b);
            }
        }
        rdev::EventType::ButtonRelease(b) => {
            if let Some(b) = map_button(b) {
                recorder.record_button_up(b);
            }
        }
        _ => {}
    }
}

/// Listens on a background thread for the rest of the process lifetime.
/// Events arriving after the recorder stops are ignored.
pub fn spawn_listener(recorder: Recorder) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = rdev::listen(move |event| handle(&recorder, &event)) {
            warn!("global mouse hook unavailable: {e:?}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::recording::RecordedActionType;
    use crate::testing::FakePlatform;
    use std::{sync::Arc, time::SystemTime};

    fn event(event_type: rdev::EventType) -> rdev::Event {
        rdev::Event { time: SystemTime::now(), name: None, event_type }
    }

    #[test]
    fn test_button_events_are_recorded() {
        let recorder = Recorder::new(Arc::new(FakePlatform::new(Point::new(4, 4))), "hook");
        handle(&recorder, &event(rdev::EventType::ButtonPress(rdev::Button::Left)));
        handle(&recorder, &event(rdev::EventType::ButtonPress(rdev::Button::Unknown(9))));
        handle(&recorder, &event(rdev::EventType::ButtonRelease(rdev::Button::Left)));

        let types: Vec<_> = recorder.stop().unwrap().actions.iter().map(|a| a.action_type).collect();
        assert_eq!(types, vec![RecordedActionType::LeftDown, RecordedActionType::LeftUp]);
    }
}
