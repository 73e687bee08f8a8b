//! Round lifecycle: shots, ticks, goals and round resets for every play mode

use std::time::Duration;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use super::aim::slingshot_velocity;
use super::collision::CollisionResolver;
use super::events::{GoalEvent, RoundObserver};
use super::level::LevelGenerator;
use super::physics::MotionIntegrator;
use super::scoring::{RunClock, Scoreboard};
use super::state::{Bounds, CourseTheme, Layout, SimulationState};
use super::{GOAL_SPEED_GATE, HOLE_RADIUS, MAX_POWER, MIN_VELOCITY, SPAWN_POINT};
use crate::ws::protocol::{Difficulty, PlayerSlot};

/// Which game is being played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    /// One ball against the clock
    SinglePlayer,
    /// Two balls on one screen, shooting independently
    LocalVersus,
    /// Server-side authority for an online match
    OnlineVersus,
    /// Untimed free play
    Practice,
}

impl PlayMode {
    /// Spawn points, one per ball
    pub fn spawns(self) -> Vec<Vec2> {
        match self {
            PlayMode::SinglePlayer | PlayMode::Practice => vec![SPAWN_POINT],
            PlayMode::LocalVersus | PlayMode::OnlineVersus => vec![
                Vec2::new(SPAWN_POINT.x, SPAWN_POINT.y - 25.0),
                Vec2::new(SPAWN_POINT.x, SPAWN_POINT.y + 25.0),
            ],
        }
    }

    pub fn is_timed(self) -> bool {
        !matches!(self, PlayMode::Practice)
    }

    /// Local players may fire again while their ball is still rolling
    fn allows_shot_while_moving(self) -> bool {
        matches!(self, PlayMode::LocalVersus)
    }

    /// Online matches run the clock from the start, local runs from the first shot
    fn clock_starts_immediately(self) -> bool {
        matches!(self, PlayMode::OnlineVersus)
    }
}

/// Where the live round is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    AwaitingShot,
    BallsInMotion,
    /// A ball dropped; waiting out the reset delay
    GoalPending,
    /// The run clock expired; nothing happens until `restart`
    RoundOver,
}

/// Settings for a run of rounds
#[derive(Debug, Clone)]
pub struct RoundConfig {
    pub bounds: Bounds,
    pub difficulty: Difficulty,
    pub theme: CourseTheme,
    /// Pause between a goal and the next layout
    pub reset_delay: Duration,
    /// Length of a timed run
    pub run_duration: Duration,
    /// Extra holes per round, practice mode only
    pub bonus_holes: usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            difficulty: Difficulty::Normal,
            theme: CourseTheme::Classic,
            reset_delay: Duration::from_millis(500),
            run_duration: Duration::from_secs(60),
            bonus_holes: 0,
        }
    }
}

/// Why a shot was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShotRejected {
    #[error("No ball for player {0}")]
    NoSuchPlayer(PlayerSlot),

    #[error("Ball for player {0} is still rolling")]
    BallMoving(PlayerSlot),

    #[error("Ball for player {0} is already in the hole")]
    BallInHole(PlayerSlot),

    #[error("Round is not accepting shots")]
    RoundNotLive,

    #[error("Shot velocity is not finite")]
    InvalidVelocity,
}

/// Identifies the round a pending reset was armed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetToken {
    generation: u64,
}

#[derive(Debug, Clone)]
struct PendingReset {
    remaining: Duration,
    generation: u64,
    next: Layout,
}

/// Owns the simulation for one play session and drives it tick by tick
pub struct RoundLifecycle {
    mode: PlayMode,
    config: RoundConfig,
    generator: LevelGenerator,
    rng: ChaCha8Rng,
    state: RoundState,
    sim: SimulationState,
    scoreboard: Scoreboard,
    clock: Option<RunClock>,
    generation: u64,
    pending: Option<PendingReset>,
}

impl RoundLifecycle {
    pub fn new(mode: PlayMode, config: RoundConfig, seed: u64) -> Self {
        let generator = LevelGenerator::new(config.bounds);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let layout = roll_layout(&generator, mode, &config, &mut rng);
        let sim = SimulationState::new(config.bounds, mode.spawns(), layout);
        let clock = new_clock(mode, &config);

        Self {
            mode,
            config,
            generator,
            rng,
            state: RoundState::AwaitingShot,
            sim,
            scoreboard: Scoreboard::for_mode(mode),
            clock,
            generation: 0,
            pending: None,
        }
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn simulation(&self) -> &SimulationState {
        &self.sim
    }

    #[cfg(test)]
    pub(crate) fn simulation_mut(&mut self) -> &mut SimulationState {
        &mut self.sim
    }

    /// The live layout
    pub fn layout(&self) -> &Layout {
        &self.sim.layout
    }

    /// Layout that goes live when the pending reset fires
    pub fn staged_layout(&self) -> Option<&Layout> {
        self.pending.as_ref().map(|p| &p.next)
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn clock(&self) -> Option<&RunClock> {
        self.clock.as_ref()
    }

    /// Whole seconds left on the run clock, `None` for untimed modes
    pub fn time_left(&self) -> Option<u32> {
        self.clock.as_ref().map(RunClock::seconds_left)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_reset(&self) -> Option<ResetToken> {
        self.pending.as_ref().map(|p| ResetToken {
            generation: p.generation,
        })
    }

    /// Launch `slot`'s ball with `velocity` (capped at `MAX_POWER`)
    pub fn shoot(
        &mut self,
        slot: PlayerSlot,
        velocity: Vec2,
        observer: &mut dyn RoundObserver,
    ) -> Result<(), ShotRejected> {
        if !matches!(self.state, RoundState::AwaitingShot | RoundState::BallsInMotion) {
            return Err(ShotRejected::RoundNotLive);
        }
        if !velocity.is_finite() {
            return Err(ShotRejected::InvalidVelocity);
        }

        let idx = slot.index();
        let ball = self
            .sim
            .balls
            .get_mut(idx)
            .ok_or(ShotRejected::NoSuchPlayer(slot))?;
        if ball.in_hole {
            return Err(ShotRejected::BallInHole(slot));
        }
        if ball.is_moving && !self.mode.allows_shot_while_moving() {
            return Err(ShotRejected::BallMoving(slot));
        }

        ball.velocity = velocity.clamp_length_max(MAX_POWER);
        ball.is_moving = true;
        self.sim.shot_counts[idx] += 1;
        self.scoreboard.record_shot();
        if let Some(clock) = self.clock.as_mut() {
            clock.start();
        }
        self.state = RoundState::BallsInMotion;

        debug!(
            player = %slot,
            shot = self.sim.shot_counts[idx],
            vx = velocity.x,
            vy = velocity.y,
            "Shot taken"
        );
        observer.on_shot_taken(slot);
        Ok(())
    }

    /// Drag-release gesture: the ball flies opposite the drag
    pub fn shoot_from_drag(
        &mut self,
        slot: PlayerSlot,
        drag_start: Vec2,
        drag_end: Vec2,
        observer: &mut dyn RoundObserver,
    ) -> Result<Vec2, ShotRejected> {
        let velocity = slingshot_velocity(drag_start, drag_end);
        self.shoot(slot, velocity, observer)?;
        Ok(velocity)
    }

    /// Advance one frame. `elapsed` only drives timers; physics is per tick.
    pub fn tick(&mut self, elapsed: Duration, observer: &mut dyn RoundObserver) {
        if self.state == RoundState::RoundOver {
            return;
        }

        if let Some(clock) = self.clock.as_mut() {
            if clock.advance(elapsed) {
                self.state = RoundState::RoundOver;
                self.pending = None;
                debug!(mode = ?self.mode, "Run clock expired");
                observer.on_run_over(&self.scoreboard);
                return;
            }
        }

        match self.state {
            RoundState::GoalPending => {
                // The other ball keeps rolling through the reset delay
                self.advance_balls(observer);
                self.tick_pending_reset(elapsed, observer);
            }
            RoundState::AwaitingShot | RoundState::BallsInMotion => self.simulate(observer),
            RoundState::RoundOver => {}
        }
    }

    /// Commit the staged layout for `token`'s round.
    ///
    /// Returns false, changing nothing, if that round is no longer current.
    pub fn complete_reset(&mut self, token: ResetToken, observer: &mut dyn RoundObserver) -> bool {
        let current = matches!(&self.pending, Some(p) if p.generation == token.generation)
            && token.generation == self.generation;
        if !current {
            debug!(
                stale_generation = token.generation,
                generation = self.generation,
                "Ignoring stale round reset"
            );
            return false;
        }

        let Some(pending) = self.pending.take() else {
            return false;
        };
        self.sim.layout = pending.next;
        self.sim.reset_balls();
        self.generation += 1;
        self.state = RoundState::AwaitingShot;

        debug!(generation = self.generation, "Round reset");
        observer.on_round_reset(self.generation);
        true
    }

    /// Start the run over: fresh layout, zeroed score, pending reset discarded
    pub fn restart(&mut self) {
        self.generation += 1;
        self.pending = None;
        let layout = roll_layout(&self.generator, self.mode, &self.config, &mut self.rng);
        self.sim = SimulationState::new(self.config.bounds, self.mode.spawns(), layout);
        self.scoreboard = Scoreboard::for_mode(self.mode);
        self.clock = new_clock(self.mode, &self.config);
        self.state = RoundState::AwaitingShot;
        debug!(mode = ?self.mode, generation = self.generation, "Run restarted");
    }

    /// Stop the run clock; the next shot resumes it. Balls keep rolling.
    ///
    /// Returns false when there is no running clock to stop. Online matches
    /// never pause.
    pub fn pause(&mut self) -> bool {
        if self.mode == PlayMode::OnlineVersus || self.state == RoundState::RoundOver {
            return false;
        }
        match self.clock.as_mut() {
            Some(clock) if clock.is_running() => {
                clock.pause();
                debug!(mode = ?self.mode, left = clock.seconds_left(), "Run paused");
                true
            }
            _ => false,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.config.difficulty
    }

    /// Switch tier and start the run over on a course of that tier
    pub fn change_difficulty(&mut self, difficulty: Difficulty) {
        self.config.difficulty = difficulty;
        self.restart();
    }

    fn tick_pending_reset(&mut self, elapsed: Duration, observer: &mut dyn RoundObserver) {
        let Some(pending) = self.pending.as_mut() else {
            self.state = RoundState::AwaitingShot;
            return;
        };
        pending.remaining = pending.remaining.saturating_sub(elapsed);
        if pending.remaining.is_zero() {
            let token = ResetToken {
                generation: pending.generation,
            };
            self.complete_reset(token, observer);
        }
    }

    fn simulate(&mut self, observer: &mut dyn RoundObserver) {
        if !self.sim.any_moving() {
            self.state = RoundState::AwaitingShot;
            return;
        }

        self.advance_balls(observer);

        if let Some(idx) = self.find_goal() {
            self.score_goal(idx, observer);
            return;
        }

        self.state = if self.sim.any_moving() {
            RoundState::BallsInMotion
        } else {
            RoundState::AwaitingShot
        };
    }

    /// One physics step for every active ball: walls, obstacles, ball contact
    fn advance_balls(&mut self, observer: &mut dyn RoundObserver) {
        if !self.sim.any_moving() {
            return;
        }

        let SimulationState {
            bounds,
            balls,
            layout,
            ..
        } = &mut self.sim;

        let mut stopped = Vec::new();
        for (idx, ball) in balls.iter_mut().enumerate() {
            if ball.in_hole {
                continue;
            }
            let outcome = MotionIntegrator::step(ball, layout.wind, &layout.physics, bounds);
            let hits = CollisionResolver::resolve(ball, &layout.obstacles, layout.physics.restitution);
            if hits > 0 {
                // Obstacles near an edge can push the ball past the wall
                MotionIntegrator::reflect_off_walls(ball, layout.physics.restitution, bounds);
                trace!(ball = idx, hits, "Obstacle contact");
            }
            if outcome.stopped {
                stopped.push(idx);
            }
        }

        if let [a, b] = balls.as_mut_slice() {
            if a.is_active() && b.is_active() && CollisionResolver::resolve_ball_ball(a, b) {
                for ball in [a, b] {
                    if ball.is_moving {
                        continue;
                    }
                    if ball.speed() >= MIN_VELOCITY {
                        ball.is_moving = true;
                    } else {
                        // Too light a touch to wake it; a resting ball has no velocity
                        ball.velocity = Vec2::ZERO;
                    }
                }
            }
        }

        for idx in stopped {
            if let Some(slot) = PlayerSlot::from_index(idx) {
                if !self.sim.balls[idx].is_moving {
                    observer.on_ball_stopped(slot);
                }
            }
        }
    }

    /// First ball resting slowly enough inside any live hole
    fn find_goal(&self) -> Option<usize> {
        self.sim.balls.iter().position(|ball| {
            self.sim
                .layout
                .holes()
                .any(|hole| MotionIntegrator::drops_into(ball, hole, HOLE_RADIUS, GOAL_SPEED_GATE))
        })
    }

    fn score_goal(&mut self, idx: usize, observer: &mut dyn RoundObserver) {
        let Some(slot) = PlayerSlot::from_index(idx) else {
            return;
        };

        let ball = &mut self.sim.balls[idx];
        ball.in_hole = true;
        ball.is_moving = false;
        ball.velocity = Vec2::ZERO;

        let next = roll_layout(&self.generator, self.mode, &self.config, &mut self.rng);
        let goal = GoalEvent {
            scoring_player: slot,
            shot_count: self.sim.shot_counts[idx],
            next_hole: next.hole,
        };

        let bonus = self.scoreboard.record_goal(&goal);
        if let Some(clock) = self.clock.as_mut() {
            clock.add(bonus);
        }

        self.pending = Some(PendingReset {
            remaining: self.config.reset_delay,
            generation: self.generation,
            next,
        });
        self.state = RoundState::GoalPending;

        debug!(
            player = %slot,
            shots = goal.shot_count,
            hole_in_one = goal.is_hole_in_one(),
            "Ball in hole"
        );
        observer.on_ball_in_hole(goal);
    }
}

fn roll_layout(
    generator: &LevelGenerator,
    mode: PlayMode,
    config: &RoundConfig,
    rng: &mut ChaCha8Rng,
) -> Layout {
    let bonus_holes = if mode == PlayMode::Practice {
        config.bonus_holes
    } else {
        0
    };
    generator.generate_layout(config.difficulty, config.theme, bonus_holes, rng)
}

fn new_clock(mode: PlayMode, config: &RoundConfig) -> Option<RunClock> {
    if !mode.is_timed() {
        return None;
    }
    let mut clock = RunClock::new(config.run_duration);
    if mode.clock_starts_immediately() {
        clock.start();
    }
    Some(clock)
}
