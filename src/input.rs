// Keyboard and pointer tracking between frames

use std::collections::HashSet;

use glam::Vec2;
use winit::keyboard::KeyCode;

use crate::pose::{Control, InputSnapshot};

/// One-shot commands triggered on key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleFirstPerson,
    AmbientUp,
    AmbientDown,
    Exit,
}

impl Action {
    /// Whether holding the key keeps triggering the action.
    fn repeats(self) -> bool {
        !matches!(self, Action::ToggleFirstPerson)
    }
}

/// Held control bound to a key, if any.
pub fn control_for(key: KeyCode) -> Option<Control> {
    use Control::*;
    let control = match key {
        KeyCode::KeyW => CameraForward,
        KeyCode::KeyS => CameraBackward,
        KeyCode::KeyA => CameraLeft,
        KeyCode::KeyD => CameraRight,
        KeyCode::KeyZ => HeadTurnLeft,
        KeyCode::KeyX => HeadTurnRight,
        KeyCode::KeyC => HeadRaise,
        KeyCode::KeyV => HeadLower,
        KeyCode::KeyI => TorsoForward,
        KeyCode::KeyK => TorsoBackward,
        KeyCode::KeyJ => TorsoTurnLeft,
        KeyCode::KeyL => TorsoTurnRight,
        KeyCode::Digit1 => LeftArmRaise,
        KeyCode::Digit2 => LeftArmLower,
        KeyCode::Digit3 => RightArmRaise,
        KeyCode::Digit4 => RightArmLower,
        KeyCode::Digit5 => LeftWristRaise,
        KeyCode::Digit6 => LeftWristLower,
        KeyCode::Digit7 => RightWristRaise,
        KeyCode::Digit8 => RightWristLower,
        _ => return None,
    };
    Some(control)
}

/// One-shot action bound to a key, if any.
pub fn action_for(key: KeyCode) -> Option<Action> {
    match key {
        KeyCode::Digit0 => Some(Action::ToggleFirstPerson),
        KeyCode::BracketRight => Some(Action::AmbientUp),
        KeyCode::BracketLeft => Some(Action::AmbientDown),
        KeyCode::Escape => Some(Action::Exit),
        _ => None,
    }
}

/// Collects window events until the frame loop samples them.
#[derive(Debug, Default)]
pub struct InputState {
    /// Currently held controls
    pressed: HashSet<Control>,
    /// Actions triggered since the last frame, in order
    pending_actions: Vec<Action>,
    /// Pointer motion accumulated since the last frame
    pointer_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a key event. Auto-repeat re-triggers every action but the view toggle.
    pub fn on_key(&mut self, key: KeyCode, pressed: bool, repeat: bool) {
        if let Some(control) = control_for(key) {
            if pressed {
                self.pressed.insert(control);
            } else {
                self.pressed.remove(&control);
            }
        }
        if !pressed {
            return;
        }
        if let Some(action) = action_for(key).filter(|a| !repeat || a.repeats()) {
            self.pending_actions.push(action);
        }
    }

    /// Handle raw pointer motion.
    pub fn on_pointer_moved(&mut self, dx: f32, dy: f32) {
        self.pointer_delta += Vec2::new(dx, dy);
    }

    /// Releases everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.pressed.clear();
        self.pointer_delta = Vec2::ZERO;
    }

    /// Actions triggered since the previous call.
    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Samples the held controls and resets the pointer delta.
    pub fn take_snapshot(&mut self) -> InputSnapshot {
        InputSnapshot {
            pressed: self.pressed.clone(),
            pointer_delta: std::mem::take(&mut self.pointer_delta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_map_to_controls() {
        let mut input = InputState::new();
        input.on_key(KeyCode::KeyZ, true, false);
        input.on_key(KeyCode::Digit3, true, false);
        input.on_key(KeyCode::KeyQ, true, false);

        let snapshot = input.take_snapshot();
        assert!(snapshot.is_pressed(Control::HeadTurnLeft));
        assert!(snapshot.is_pressed(Control::RightArmRaise));
        assert_eq!(snapshot.pressed.len(), 2);

        input.on_key(KeyCode::KeyZ, false, false);
        let snapshot = input.take_snapshot();
        assert!(!snapshot.is_pressed(Control::HeadTurnLeft));
        assert!(snapshot.is_pressed(Control::RightArmRaise));
    }

    #[test]
    fn pointer_delta_resets_each_snapshot() {
        let mut input = InputState::new();
        input.on_pointer_moved(3.0, -1.0);
        input.on_pointer_moved(2.0, 4.0);
        assert_eq!(input.take_snapshot().pointer_delta, Vec2::new(5.0, 3.0));
        assert_eq!(input.take_snapshot().pointer_delta, Vec2::ZERO);
    }

    #[test]
    fn view_toggle_fires_once_per_press() {
        let mut input = InputState::new();
        input.on_key(KeyCode::Digit0, true, false);
        input.on_key(KeyCode::Digit0, true, true);
        input.on_key(KeyCode::Digit0, false, false);
        input.on_key(KeyCode::BracketRight, true, false);

        assert_eq!(
            input.take_actions(),
            vec![Action::ToggleFirstPerson, Action::AmbientUp]
        );
        assert!(input.take_actions().is_empty());
    }

    #[test]
    fn held_ambient_keys_keep_adjusting() {
        let mut input = InputState::new();
        input.on_key(KeyCode::BracketLeft, true, false);
        input.on_key(KeyCode::BracketLeft, true, true);
        input.on_key(KeyCode::BracketLeft, true, true);
        input.on_key(KeyCode::BracketLeft, false, false);

        assert_eq!(input.take_actions(), vec![Action::AmbientDown; 3]);
    }

    #[test]
    fn clear_releases_held_controls() {
        let mut input = InputState::new();
        input.on_key(KeyCode::KeyW, true, false);
        input.on_pointer_moved(1.0, 1.0);
        input.clear();
        let snapshot = input.take_snapshot();
        assert!(snapshot.pressed.is_empty());
        assert_eq!(snapshot.pointer_delta, Vec2::ZERO);
    }
}
