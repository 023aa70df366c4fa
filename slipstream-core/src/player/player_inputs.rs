use serde::{Deserialize, Serialize};

type Modifier = f32;

// A uniform input contract: every device boils down to buttons going down and
// up, plus analog axis updates
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    Pressed(Button),
    Released(Button),
    Axis(Axis, Modifier),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    // gas pedal
    Main,
    // brake / reverse
    Alt,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

// ControlState is the only thing replicated about a player's driving: the
// owning client writes it, everybody else just reads it
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawControlState")]
pub struct ControlState {
    steering: Modifier,
    throttle: Modifier,
}

// whatever came off the wire, before clamping
#[derive(Deserialize)]
struct RawControlState {
    steering: Modifier,
    throttle: Modifier,
}

impl From<RawControlState> for ControlState {
    fn from(raw: RawControlState) -> Self {
        ControlState::new(raw.steering, raw.throttle)
    }
}

impl ControlState {
    pub const NEUTRAL: ControlState = ControlState {
        steering: 0.0,
        throttle: 0.0,
    };

    /// Builds a control state, clamping both values into `[-1, 1]`.
    pub fn new(steering: Modifier, throttle: Modifier) -> Self {
        Self {
            steering: clamp_unit(steering),
            throttle: clamp_unit(throttle),
        }
    }

    pub fn steering(&self) -> Modifier {
        self.steering
    }

    pub fn throttle(&self) -> Modifier {
        self.throttle
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed(Button::Main) | InputEvent::Pressed(Button::Up) => {
                self.throttle = 1.0
            }
            InputEvent::Pressed(Button::Alt) | InputEvent::Pressed(Button::Down) => {
                self.throttle = -1.0
            }
            InputEvent::Pressed(Button::Left) => self.steering = -1.0,
            InputEvent::Pressed(Button::Right) => self.steering = 1.0,
            InputEvent::Released(Button::Main)
            | InputEvent::Released(Button::Alt)
            | InputEvent::Released(Button::Up)
            | InputEvent::Released(Button::Down) => self.throttle = 0.0,
            InputEvent::Released(Button::Left) | InputEvent::Released(Button::Right) => {
                self.steering = 0.0
            }
            InputEvent::Axis(Axis::Horizontal, value) => self.steering = clamp_unit(value),
            InputEvent::Axis(Axis::Vertical, value) => self.throttle = clamp_unit(value),
        }
    }
}

fn clamp_unit(value: Modifier) -> Modifier {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_out_of_range_values() {
        let control = ControlState::new(3.0, -7.5);
        assert_eq!(control.steering(), 1.0);
        assert_eq!(control.throttle(), -1.0);

        let control = ControlState::new(f32::NAN, 0.25);
        assert_eq!(control.steering(), 0.0);
        assert_eq!(control.throttle(), 0.25);
    }

    #[test]
    fn test_buttons_drive_throttle_and_steering() {
        let mut control = ControlState::NEUTRAL;
        control.apply(InputEvent::Pressed(Button::Main));
        control.apply(InputEvent::Pressed(Button::Left));
        assert_eq!(control, ControlState::new(-1.0, 1.0));

        control.apply(InputEvent::Pressed(Button::Alt));
        assert_eq!(control.throttle(), -1.0);

        control.apply(InputEvent::Released(Button::Alt));
        control.apply(InputEvent::Released(Button::Left));
        assert!(control.is_neutral());
    }

    #[test]
    fn test_axis_updates_are_clamped() {
        let mut control = ControlState::NEUTRAL;
        control.apply(InputEvent::Axis(Axis::Horizontal, 0.4));
        control.apply(InputEvent::Axis(Axis::Vertical, 2.0));
        assert_eq!(control, ControlState::new(0.4, 1.0));
    }

    #[test]
    fn test_decoded_values_are_clamped() {
        #[derive(Serialize)]
        struct Forged {
            steering: Modifier,
            throttle: Modifier,
        }

        let bytes = bincode::serialize(&Forged {
            steering: 5.0,
            throttle: f32::NAN,
        })
        .unwrap();
        let control: ControlState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(control, ControlState::new(1.0, 0.0));
    }
}
