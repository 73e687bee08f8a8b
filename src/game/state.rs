//! Simulation state types: balls, obstacles, course layout

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{BALL_RADIUS, CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::ws::protocol::{BallView, PlayerSlot};

/// A golf ball (authoritative)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub position: Vec2,
    pub velocity: Vec2,
    pub is_moving: bool,
    pub in_hole: bool,
}

impl Ball {
    /// A ball at rest on `spawn`
    pub fn at(spawn: Vec2) -> Self {
        Self {
            position: spawn,
            velocity: Vec2::ZERO,
            is_moving: false,
            in_hole: false,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn radius(&self) -> f32 {
        BALL_RADIUS
    }

    /// Balls sunk in the hole take no further part in the round
    pub fn is_active(&self) -> bool {
        !self.in_hole
    }

    pub fn view(&self) -> BallView {
        BallView {
            position: self.position.into(),
            velocity: self.velocity.into(),
        }
    }
}

/// Axis-aligned rectangular obstacle, `(x, y)` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Obstacle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Point on (or in) the rectangle closest to `p`
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.x, self.right()), p.y.clamp(self.y, self.bottom()))
    }

    /// Distance from `p` to the rectangle, zero when `p` is inside
    pub fn distance_to(&self, p: Vec2) -> f32 {
        p.distance(self.closest_point(p))
    }

    /// Strict AABB overlap; rectangles that only touch do not overlap
    pub fn overlaps(&self, other: &Obstacle) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Playfield extents, origin at the top-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// `p` mirrored through the centre of the field
    pub fn mirror(&self, p: Vec2) -> Vec2 {
        Vec2::new(self.width - p.x, self.height - p.y)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT)
    }
}

/// Per-round surface behaviour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsProfile {
    /// Per-tick multiplicative velocity decay, in (0, 1)
    pub friction: f32,
    /// Fraction of normal velocity kept after a bounce, in [0, 1]
    pub restitution: f32,
}

impl Default for PhysicsProfile {
    fn default() -> Self {
        CourseTheme::Classic.physics()
    }
}

/// Course surface theme; picks the physics profile for a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseTheme {
    #[default]
    Classic,
    Ice,
    Sand,
}

impl CourseTheme {
    pub fn physics(self) -> PhysicsProfile {
        match self {
            CourseTheme::Classic => PhysicsProfile {
                friction: 0.98,
                restitution: 1.0,
            },
            CourseTheme::Ice => PhysicsProfile {
                friction: 0.99,
                restitution: 0.9,
            },
            CourseTheme::Sand => PhysicsProfile {
                friction: 0.95,
                restitution: 0.6,
            },
        }
    }
}

/// Everything generated for one round; replaced as a whole between rounds
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub hole: Vec2,
    /// Extra practice holes, live for one round only
    pub bonus_holes: Vec<Vec2>,
    pub obstacles: Vec<Obstacle>,
    pub wind: Vec2,
    pub theme: CourseTheme,
    pub physics: PhysicsProfile,
}

impl Layout {
    /// All holes a ball may drop into this round
    pub fn holes(&self) -> impl Iterator<Item = Vec2> + '_ {
        std::iter::once(self.hole).chain(self.bonus_holes.iter().copied())
    }
}

/// Mutable per-round world: owned by one `RoundLifecycle`, stepped by `&mut`
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub bounds: Bounds,
    pub balls: Vec<Ball>,
    pub spawns: Vec<Vec2>,
    pub layout: Layout,
    /// Shots taken this round, per ball
    pub shot_counts: Vec<u32>,
}

impl SimulationState {
    pub fn new(bounds: Bounds, spawns: Vec<Vec2>, layout: Layout) -> Self {
        let balls = spawns.iter().copied().map(Ball::at).collect();
        let shot_counts = vec![0; spawns.len()];
        Self {
            bounds,
            balls,
            spawns,
            layout,
            shot_counts,
        }
    }

    pub fn ball(&self, slot: PlayerSlot) -> Option<&Ball> {
        self.balls.get(slot.index())
    }

    pub fn any_moving(&self) -> bool {
        self.balls.iter().any(|b| b.is_moving && b.is_active())
    }

    /// Return every ball to its spawn and clear shot counters
    pub fn reset_balls(&mut self) {
        for (ball, spawn) in self.balls.iter_mut().zip(self.spawns.iter()) {
            *ball = Ball::at(*spawn);
        }
        self.shot_counts.iter_mut().for_each(|c| *c = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_point_outside_and_inside() {
        let obs = Obstacle::new(100.0, 100.0, 50.0, 20.0);
        assert_eq!(
            obs.closest_point(Vec2::new(90.0, 110.0)),
            Vec2::new(100.0, 110.0)
        );
        let inside = Vec2::new(120.0, 105.0);
        assert_eq!(obs.closest_point(inside), inside);
        assert_eq!(obs.distance_to(inside), 0.0);
    }

    #[test]
    fn test_touching_rectangles_do_not_overlap() {
        let a = Obstacle::new(0.0, 0.0, 10.0, 10.0);
        let b = Obstacle::new(10.0, 0.0, 10.0, 10.0);
        let c = Obstacle::new(5.0, 5.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn test_mirror_of_default_spawn() {
        let bounds = Bounds::default();
        assert_eq!(
            bounds.mirror(Vec2::new(100.0, 250.0)),
            Vec2::new(700.0, 250.0)
        );
    }

    #[test]
    fn test_reset_balls_returns_to_spawn() {
        let layout = Layout {
            hole: Vec2::new(700.0, 250.0),
            bonus_holes: Vec::new(),
            obstacles: Vec::new(),
            wind: Vec2::ZERO,
            theme: CourseTheme::Classic,
            physics: PhysicsProfile::default(),
        };
        let spawn = Vec2::new(100.0, 250.0);
        let mut sim = SimulationState::new(Bounds::default(), vec![spawn], layout);
        sim.balls[0].position = Vec2::new(300.0, 300.0);
        sim.balls[0].in_hole = true;
        sim.shot_counts[0] = 4;

        sim.reset_balls();

        assert_eq!(sim.balls[0], Ball::at(spawn));
        assert_eq!(sim.shot_counts[0], 0);
    }
}
