//! Game simulation modules

pub mod aim;
pub mod collision;
pub mod events;
pub mod level;
pub mod r#match;
pub mod physics;
pub mod round;
pub mod scoring;
pub mod snapshot;
pub mod state;

pub use events::{EventLog, GoalEvent, NullObserver, RoundEvent, RoundObserver};
pub use level::LevelGenerator;
pub use r#match::{GameMatch, MatchHandle, MatchRegistry};
pub use round::{PlayMode, RoundConfig, RoundLifecycle, RoundState, ShotRejected};
pub use state::{Ball, Bounds, CourseTheme, Layout, Obstacle, SimulationState};

use glam::Vec2;
use uuid::Uuid;

use crate::ws::protocol::ClientMsg;

/// Ball radius in px
pub const BALL_RADIUS: f32 = 10.0;
/// Hole radius in px
pub const HOLE_RADIUS: f32 = 15.0;
/// Below this speed a rolling ball comes to rest
pub const MIN_VELOCITY: f32 = 0.1;
/// Strongest possible shot, px per tick
pub const MAX_POWER: f32 = 15.0;
/// Drag length in px per unit of shot power
pub const DRAG_POWER_DIVISOR: f32 = 10.0;
/// A ball over the hole only drops below this speed
pub const GOAL_SPEED_GATE: f32 = 5.0;

pub const CANVAS_WIDTH: f32 = 800.0;
pub const CANVAS_HEIGHT: f32 = 500.0;

/// Single-ball spawn point
pub const SPAWN_POINT: Vec2 = Vec2::new(100.0, 250.0);

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub user_id: Uuid,
    pub msg: ClientMsg,
    /// Unix millis when the socket reader took the message off the wire
    pub received_at: u64,
}

impl PlayerInput {
    /// Millis between receipt and `now`
    pub fn queued_for(&self, now: u64) -> u64 {
        now.saturating_sub(self.received_at)
    }
}
