//! Turning player gestures into shot velocities

use glam::Vec2;

use super::{DRAG_POWER_DIVISOR, MAX_POWER};

/// Slingshot: the ball flies opposite the drag, power grows with drag length.
///
/// Power is `|drag| / 10`, capped at `MAX_POWER`.
pub fn slingshot_velocity(drag_start: Vec2, drag_end: Vec2) -> Vec2 {
    let drag = drag_end - drag_start;
    let power = (drag.length() / DRAG_POWER_DIVISOR).min(MAX_POWER);
    match drag.try_normalize() {
        Some(direction) => -direction * power,
        None => Vec2::ZERO,
    }
}

/// Keyboard aim for the second local player: rotate, hold to charge, release to fire
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeyboardAim {
    /// Heading in radians
    pub angle: f32,
    pub power: f32,
    pub charging: bool,
}

impl KeyboardAim {
    pub const TURN_RATE: f32 = 0.05;
    pub const CHARGE_RATE: f32 = 0.2;

    /// Per-frame update from held keys
    pub fn update(&mut self, turn_left: bool, turn_right: bool) {
        if turn_left {
            self.angle -= Self::TURN_RATE;
        }
        if turn_right {
            self.angle += Self::TURN_RATE;
        }
        if self.charging {
            self.power = (self.power + Self::CHARGE_RATE).min(MAX_POWER);
        }
    }

    pub fn begin_charge(&mut self) {
        if !self.charging {
            self.charging = true;
            self.power = 0.0;
        }
    }

    /// Release the charge; `None` when nothing was charging
    pub fn release(&mut self) -> Option<Vec2> {
        if !self.charging {
            return None;
        }
        let velocity = Vec2::from_angle(self.angle) * self.power;
        self.charging = false;
        self.power = 0.0;
        Some(velocity)
    }
}
