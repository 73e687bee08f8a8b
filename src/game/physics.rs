//! Ball motion: wind, friction, rest detection and wall bounces

use glam::Vec2;

use super::state::{Ball, Bounds, PhysicsProfile};
use super::MIN_VELOCITY;

/// What happened to a ball during one integration step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Ball came to rest this tick (reported once per roll)
    pub stopped: bool,
    /// Ball bounced off a wall this tick
    pub hit_wall: bool,
}

/// Per-tick kinematics for a single ball
pub struct MotionIntegrator;

impl MotionIntegrator {
    /// Advance a moving ball by one frame.
    ///
    /// Wind is a per-tick force, so its effect compounds with frame count.
    /// Resting or sunk balls are left untouched.
    pub fn step(
        ball: &mut Ball,
        wind: Vec2,
        physics: &PhysicsProfile,
        bounds: &Bounds,
    ) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        if !ball.is_moving || ball.in_hole {
            return outcome;
        }

        if wind != Vec2::ZERO {
            ball.velocity += wind;
        }

        ball.position += ball.velocity;
        ball.velocity *= physics.friction;

        if ball.speed() < MIN_VELOCITY {
            ball.is_moving = false;
            ball.velocity = Vec2::ZERO;
            outcome.stopped = true;
        }

        outcome.hit_wall = Self::reflect_off_walls(ball, physics.restitution, bounds);
        outcome
    }

    /// Clamp the ball inside `bounds` and send it back into the field.
    /// Returns true if any wall was touched.
    pub fn reflect_off_walls(ball: &mut Ball, restitution: f32, bounds: &Bounds) -> bool {
        let r = ball.radius();
        let mut hit = false;

        if ball.position.x - r < 0.0 {
            ball.position.x = r;
            ball.velocity.x = ball.velocity.x.abs() * restitution;
            hit = true;
        } else if ball.position.x + r > bounds.width {
            ball.position.x = bounds.width - r;
            ball.velocity.x = -ball.velocity.x.abs() * restitution;
            hit = true;
        }

        if ball.position.y - r < 0.0 {
            ball.position.y = r;
            ball.velocity.y = ball.velocity.y.abs() * restitution;
            hit = true;
        } else if ball.position.y + r > bounds.height {
            ball.position.y = bounds.height - r;
            ball.velocity.y = -ball.velocity.y.abs() * restitution;
            hit = true;
        }

        hit
    }

    /// True when `p` is inside the hole and the ball is slow enough to drop
    pub fn drops_into(ball: &Ball, hole: Vec2, hole_radius: f32, speed_gate: f32) -> bool {
        !ball.in_hole && ball.position.distance(hole) < hole_radius && ball.speed() < speed_gate
    }
}
