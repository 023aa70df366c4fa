use serde::{Deserialize, Serialize};

use super::player_inputs::{Axis, Button, InputEvent};

// Names of the keys bound to each driving action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub main: String,
    pub alt: String,
    pub left: String,
    pub right: String,
    pub up: String,
    pub down: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            main: "Space".to_string(),
            alt: "LShift".to_string(),
            left: "Left".to_string(),
            right: "Right".to_string(),
            up: "Up".to_string(),
            down: "Down".to_string(),
        }
    }
}

impl KeyBindings {
    fn button_for(&self, key: &str) -> Option<Button> {
        [
            (&self.main, Button::Main),
            (&self.alt, Button::Alt),
            (&self.left, Button::Left),
            (&self.right, Button::Right),
            (&self.up, Button::Up),
            (&self.down, Button::Down),
        ]
        .into_iter()
        .find(|(bound, _)| bound.as_str() == key)
        .map(|(_, button)| button)
    }
}

/// Whatever the platform hands us, before it's been mapped to an action.
#[derive(Clone, Debug, PartialEq)]
pub enum RawInput {
    Key { name: String, pressed: bool },
    TouchButton { button: Button, pressed: bool },
    TouchAxis { x: f32, y: f32 },
    Stick { x: f32, y: f32 },
    StickButton { button: Button, pressed: bool },
}

/// The device a local player drives with, chosen once at configuration time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InputDevice {
    Keyboard(KeyBindings),
    Touch,
    Joystick { dead_zone: f32 },
}

impl InputDevice {
    /// Maps a raw input onto zero or more [`InputEvent`]s. Input meant for a
    /// different kind of device is dropped.
    pub fn translate(&self, raw: &RawInput) -> Vec<InputEvent> {
        match (self, raw) {
            (InputDevice::Keyboard(bindings), RawInput::Key { name, pressed }) => bindings
                .button_for(name)
                .map(|button| vec![button_event(button, *pressed)])
                .unwrap_or_default(),

            (InputDevice::Touch, RawInput::TouchButton { button, pressed }) => {
                vec![button_event(*button, *pressed)]
            }
            // the on-screen stick only steers; throttle comes from the touch buttons
            (InputDevice::Touch, RawInput::TouchAxis { x, .. }) => {
                vec![InputEvent::Axis(Axis::Horizontal, *x)]
            }

            (InputDevice::Joystick { dead_zone }, RawInput::Stick { x, y }) => vec![
                InputEvent::Axis(Axis::Horizontal, apply_dead_zone(*x, *dead_zone)),
                InputEvent::Axis(Axis::Vertical, apply_dead_zone(*y, *dead_zone)),
            ],
            (InputDevice::Joystick { .. }, RawInput::StickButton { button, pressed }) => {
                vec![button_event(*button, *pressed)]
            }

            _ => Vec::new(),
        }
    }
}

fn button_event(button: Button, pressed: bool) -> InputEvent {
    if pressed {
        InputEvent::Pressed(button)
    } else {
        InputEvent::Released(button)
    }
}

fn apply_dead_zone(value: f32, dead_zone: f32) -> f32 {
    if value.abs() < dead_zone {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::player_inputs::ControlState;

    #[test]
    fn test_keyboard_uses_bindings() {
        let device = InputDevice::Keyboard(KeyBindings::default());
        let events = device.translate(&RawInput::Key {
            name: "Space".to_string(),
            pressed: true,
        });
        assert_eq!(events, vec![InputEvent::Pressed(Button::Main)]);

        let unbound = device.translate(&RawInput::Key {
            name: "F12".to_string(),
            pressed: true,
        });
        assert!(unbound.is_empty());
    }

    #[test]
    fn test_joystick_dead_zone() {
        let device = InputDevice::Joystick { dead_zone: 0.2 };
        let mut control = ControlState::NEUTRAL;
        for event in device.translate(&RawInput::Stick { x: 0.1, y: 0.8 }) {
            control.apply(event);
        }
        assert_eq!(control, ControlState::new(0.0, 0.8));
    }

    #[test]
    fn test_foreign_input_is_ignored() {
        let device = InputDevice::Touch;
        assert!(device
            .translate(&RawInput::Stick { x: 1.0, y: 1.0 })
            .is_empty());
        assert_eq!(
            device.translate(&RawInput::TouchAxis { x: -0.5, y: 0.9 }),
            vec![InputEvent::Axis(Axis::Horizontal, -0.5)]
        );
    }
}
