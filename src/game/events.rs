//! Round events and the observer interface the presentation layer subscribes to

use glam::Vec2;

use super::scoring::Scoreboard;
use crate::ws::protocol::PlayerSlot;

/// A ball dropped into a hole
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalEvent {
    pub scoring_player: PlayerSlot,
    /// Shots the scorer took this round; 1 means hole-in-one
    pub shot_count: u32,
    /// The hole that will be live once the round resets
    pub next_hole: Vec2,
}

impl GoalEvent {
    pub fn is_hole_in_one(&self) -> bool {
        self.shot_count == 1
    }
}

/// Domain events emitted by a `RoundLifecycle`
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    ShotTaken { player: PlayerSlot },
    BallStopped { player: PlayerSlot },
    BallInHole(GoalEvent),
    /// A fresh layout went live
    RoundReset { generation: u64 },
    /// The run clock expired
    RunOver(Scoreboard),
}

/// Receives round events as they happen. All methods default to no-ops.
pub trait RoundObserver {
    fn on_shot_taken(&mut self, _player: PlayerSlot) {}

    fn on_ball_stopped(&mut self, _player: PlayerSlot) {}

    fn on_ball_in_hole(&mut self, _goal: GoalEvent) {}

    fn on_round_reset(&mut self, _generation: u64) {}

    fn on_run_over(&mut self, _final_score: &Scoreboard) {}
}

/// Observer that ignores everything
#[derive(Debug, Default)]
pub struct NullObserver;

impl RoundObserver for NullObserver {}

/// Observer that records events for later polling
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<RoundEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all recorded events, oldest first
    pub fn drain(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[RoundEvent] {
        &self.events
    }

    pub fn goals(&self) -> impl Iterator<Item = &GoalEvent> {
        self.events.iter().filter_map(|e| match e {
            RoundEvent::BallInHole(goal) => Some(goal),
            _ => None,
        })
    }
}

impl RoundObserver for EventLog {
    fn on_shot_taken(&mut self, player: PlayerSlot) {
        self.events.push(RoundEvent::ShotTaken { player });
    }

    fn on_ball_stopped(&mut self, player: PlayerSlot) {
        self.events.push(RoundEvent::BallStopped { player });
    }

    fn on_ball_in_hole(&mut self, goal: GoalEvent) {
        self.events.push(RoundEvent::BallInHole(goal));
    }

    fn on_round_reset(&mut self, generation: u64) {
        self.events.push(RoundEvent::RoundReset { generation });
    }

    fn on_run_over(&mut self, final_score: &Scoreboard) {
        self.events.push(RoundEvent::RunOver(final_score.clone()));
    }
}
