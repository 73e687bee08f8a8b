//! Procedural course generation by bounded rejection sampling

use glam::Vec2;
use rand::Rng;
use tracing::debug;

use super::state::{Bounds, CourseTheme, Layout, Obstacle};
use super::{HOLE_RADIUS, SPAWN_POINT};
use crate::ws::protocol::Difficulty;

/// Placement constraints for generated courses
#[derive(Debug, Clone, Copy)]
pub struct LevelRules {
    /// Attempts per obstacle or hole before giving up on random placement
    pub max_attempts: u32,
    pub min_obstacle_size: f32,
    pub max_obstacle_size: f32,
    /// Minimum distance from the spawn point to any obstacle
    pub obstacle_spawn_clearance: f32,
    /// Minimum distance from the spawn point to the hole
    pub hole_spawn_clearance: f32,
    /// Hole keeps this much room beyond its own radius from every obstacle
    pub hole_obstacle_clearance: f32,
    /// Hole is kept this far from the canvas edges
    pub hole_padding: f32,
}

impl Default for LevelRules {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            min_obstacle_size: 20.0,
            max_obstacle_size: 100.0,
            obstacle_spawn_clearance: 100.0,
            hole_spawn_clearance: 200.0,
            hole_obstacle_clearance: 15.0,
            hole_padding: 50.0,
        }
    }
}

/// Builds hole/obstacle layouts for a canvas
#[derive(Debug, Clone)]
pub struct LevelGenerator {
    bounds: Bounds,
    spawn: Vec2,
    rules: LevelRules,
}

impl LevelGenerator {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            spawn: SPAWN_POINT,
            rules: LevelRules::default(),
        }
    }

    pub fn with_spawn(mut self, spawn: Vec2) -> Self {
        self.spawn = spawn;
        self
    }

    pub fn with_rules(mut self, rules: LevelRules) -> Self {
        self.rules = rules;
        self
    }

    /// Place obstacles for `difficulty`, then a hole clear of them
    pub fn generate<R: Rng>(
        &self,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> (Vec2, Vec<Obstacle>) {
        let mut obstacles = self.place_obstacles(difficulty.obstacle_count(), rng);
        let hole = match self.place_hole(&obstacles, &[], rng) {
            Some(hole) => hole,
            None => self.fallback_hole(&mut obstacles),
        };
        (hole, obstacles)
    }

    /// Full round layout: course, wind, physics and optional bonus holes
    pub fn generate_layout<R: Rng>(
        &self,
        difficulty: Difficulty,
        theme: CourseTheme,
        bonus_holes: usize,
        rng: &mut R,
    ) -> Layout {
        let (hole, obstacles) = self.generate(difficulty, rng);

        let mut placed = vec![hole];
        for _ in 0..bonus_holes {
            if let Some(extra) = self.place_hole(&obstacles, &placed, rng) {
                placed.push(extra);
            }
        }
        let bonus_holes = placed.split_off(1);

        let wind = roll_wind(difficulty, rng);

        debug!(
            obstacles = obstacles.len(),
            bonus_holes = bonus_holes.len(),
            hole_x = hole.x,
            hole_y = hole.y,
            wind = wind.length(),
            "Generated course layout"
        );

        Layout {
            hole,
            bonus_holes,
            obstacles,
            wind,
            theme,
            physics: theme.physics(),
        }
    }

    fn place_obstacles<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<Obstacle> {
        let rules = &self.rules;
        let mut obstacles: Vec<Obstacle> = Vec::with_capacity(count);

        for _ in 0..count {
            for _ in 0..rules.max_attempts {
                let width = sample(rng, rules.min_obstacle_size, rules.max_obstacle_size);
                let height = sample(rng, rules.min_obstacle_size, rules.max_obstacle_size);
                let candidate = Obstacle::new(
                    sample(rng, 0.0, self.bounds.width - width),
                    sample(rng, 0.0, self.bounds.height - height),
                    width,
                    height,
                );

                if candidate.distance_to(self.spawn) < rules.obstacle_spawn_clearance {
                    continue;
                }
                if obstacles.iter().any(|o| o.overlaps(&candidate)) {
                    continue;
                }

                obstacles.push(candidate);
                break;
            }
        }

        obstacles
    }

    /// Sample a hole position, keeping away from spawn, obstacles and `taken` holes
    fn place_hole<R: Rng>(
        &self,
        obstacles: &[Obstacle],
        taken: &[Vec2],
        rng: &mut R,
    ) -> Option<Vec2> {
        let pad = self.rules.hole_padding;

        for _ in 0..self.rules.max_attempts {
            let candidate = Vec2::new(
                sample(rng, pad, self.bounds.width - pad),
                sample(rng, pad, self.bounds.height - pad),
            );

            if candidate.distance(self.spawn) < self.rules.hole_spawn_clearance {
                continue;
            }
            if !self.hole_clear_of(candidate, obstacles) {
                continue;
            }
            if taken.iter().any(|h| h.distance(candidate) < HOLE_RADIUS * 2.0) {
                continue;
            }

            return Some(candidate);
        }

        None
    }

    fn hole_clear_of(&self, hole: Vec2, obstacles: &[Obstacle]) -> bool {
        let clearance = HOLE_RADIUS + self.rules.hole_obstacle_clearance;
        obstacles.iter().all(|o| o.distance_to(hole) >= clearance)
    }

    /// Spawn mirrored through the canvas centre; obstacles crowding it are dropped
    fn fallback_hole(&self, obstacles: &mut Vec<Obstacle>) -> Vec2 {
        let hole = self.bounds.mirror(self.spawn);
        let clearance = HOLE_RADIUS + self.rules.hole_obstacle_clearance;
        let before = obstacles.len();
        obstacles.retain(|o| o.distance_to(hole) >= clearance);

        debug!(
            dropped_obstacles = before - obstacles.len(),
            "Hole placement exhausted, using fallback position"
        );
        hole
    }
}

/// Random wind with a uniform heading and a magnitude below the tier ceiling
pub fn roll_wind<R: Rng>(difficulty: Difficulty, rng: &mut R) -> Vec2 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let force = sample(rng, 0.0, difficulty.max_wind());
    Vec2::from_angle(angle) * force
}

/// Uniform sample in `[lo, hi)`, or `lo` when the range is empty
fn sample<R: Rng>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const TIERS: [Difficulty; 3] = [Difficulty::Normal, Difficulty::Advanced, Difficulty::Maximum];

    #[test]
    fn test_layouts_respect_constraints_across_seeds() {
        let generator = LevelGenerator::new(Bounds::default());
        let rules = LevelRules::default();

        for seed in 0..300u64 {
            for difficulty in TIERS {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let (hole, obstacles) = generator.generate(difficulty, &mut rng);

                assert!(obstacles.len() <= difficulty.obstacle_count());
                for (i, a) in obstacles.iter().enumerate() {
                    assert!(a.distance_to(SPAWN_POINT) >= rules.obstacle_spawn_clearance);
                    assert!(a.x >= 0.0 && a.right() <= 800.0);
                    assert!(a.y >= 0.0 && a.bottom() <= 500.0);
                    for b in &obstacles[i + 1..] {
                        assert!(!a.overlaps(b), "seed {}: {:?} overlaps {:?}", seed, a, b);
                    }
                    assert!(
                        a.distance_to(hole) >= HOLE_RADIUS + rules.hole_obstacle_clearance,
                        "seed {}: hole {:?} too close to {:?}",
                        seed,
                        hole,
                        a
                    );
                }
            }
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let generator = LevelGenerator::new(Bounds::default());
        let a = generator.generate_layout(
            Difficulty::Maximum,
            CourseTheme::Sand,
            2,
            &mut ChaCha8Rng::seed_from_u64(7),
        );
        let b = generator.generate_layout(
            Difficulty::Maximum,
            CourseTheme::Sand,
            2,
            &mut ChaCha8Rng::seed_from_u64(7),
        );
        assert_eq!(a, b);
        assert_eq!(a.physics, CourseTheme::Sand.physics());
    }

    #[test]
    fn test_tiny_canvas_falls_back_and_terminates() {
        // No spot is 200px from spawn on this canvas, so the hole must fall back
        let bounds = Bounds::new(220.0, 220.0);
        let generator = LevelGenerator::new(bounds).with_spawn(Vec2::new(110.0, 110.0));
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let (hole, obstacles) = generator.generate(Difficulty::Maximum, &mut rng);

        assert_eq!(hole, Vec2::new(110.0, 110.0));
        assert!(obstacles
            .iter()
            .all(|o| o.distance_to(hole) >= HOLE_RADIUS + 15.0));
    }

    #[test]
    fn test_fallback_drops_crowding_obstacles() {
        let generator = LevelGenerator::new(Bounds::default());
        let mut obstacles = vec![
            Obstacle::new(690.0, 240.0, 30.0, 30.0),
            Obstacle::new(300.0, 50.0, 40.0, 40.0),
        ];

        let hole = generator.fallback_hole(&mut obstacles);

        assert_eq!(hole, Vec2::new(700.0, 250.0));
        assert_eq!(obstacles, vec![Obstacle::new(300.0, 50.0, 40.0, 40.0)]);
    }

    #[test]
    fn test_bonus_holes_are_spread_out() {
        let generator = LevelGenerator::new(Bounds::default());
        for seed in 0..50u64 {
            let layout = generator.generate_layout(
                Difficulty::Advanced,
                CourseTheme::Classic,
                2,
                &mut ChaCha8Rng::seed_from_u64(seed),
            );
            let holes: Vec<Vec2> = layout.holes().collect();
            for (i, a) in holes.iter().enumerate() {
                for b in &holes[i + 1..] {
                    assert!(a.distance(*b) >= HOLE_RADIUS * 2.0);
                }
            }
        }
    }

    #[test]
    fn test_custom_rules_fix_obstacle_size() {
        let rules = LevelRules {
            min_obstacle_size: 50.0,
            max_obstacle_size: 50.0,
            ..LevelRules::default()
        };
        let generator = LevelGenerator::new(Bounds::default()).with_rules(rules);
        let (_, obstacles) = generator.generate(Difficulty::Maximum, &mut ChaCha8Rng::seed_from_u64(4));

        assert!(!obstacles.is_empty());
        assert!(obstacles.iter().all(|o| o.width == 50.0 && o.height == 50.0));
    }

    #[test]
    fn test_wind_within_tier_ceiling() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for difficulty in TIERS {
            for _ in 0..200 {
                assert!(roll_wind(difficulty, &mut rng).length() <= difficulty.max_wind() + 1e-6);
            }
        }
    }
}
