//! Per-mode score keeping and the run clock

use std::time::Duration;

use super::events::GoalEvent;
use super::round::PlayMode;
use crate::ws::protocol::{PlayerSlot, Scores};

/// Seconds added to a solo run for every hole-in-one
pub const HOLE_IN_ONE_BONUS: Duration = Duration::from_secs(5);

/// Single-player timed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoloRun {
    pub score: u32,
    /// Consecutive hole-in-ones
    pub streak: u32,
    pub best_streak: u32,
    pub total_shots: u32,
}

/// Running totals for every play mode
#[derive(Debug, Clone, PartialEq)]
pub enum Scoreboard {
    Solo(SoloRun),
    /// Two players, local or online
    Versus(Scores),
    /// Free play; only shots are counted
    Practice { total_shots: u32 },
}

impl Scoreboard {
    pub fn for_mode(mode: PlayMode) -> Self {
        match mode {
            PlayMode::SinglePlayer => Scoreboard::Solo(SoloRun::default()),
            PlayMode::LocalVersus | PlayMode::OnlineVersus => Scoreboard::Versus(Scores::default()),
            PlayMode::Practice => Scoreboard::Practice { total_shots: 0 },
        }
    }

    pub fn record_shot(&mut self) {
        match self {
            Scoreboard::Solo(run) => run.total_shots += 1,
            Scoreboard::Practice { total_shots } => *total_shots += 1,
            Scoreboard::Versus(_) => {}
        }
    }

    /// Book a goal; returns extra run time earned by it
    pub fn record_goal(&mut self, goal: &GoalEvent) -> Duration {
        match self {
            Scoreboard::Solo(run) => {
                run.score += 1;
                if goal.is_hole_in_one() {
                    run.streak += 1;
                    run.best_streak = run.best_streak.max(run.streak);
                    HOLE_IN_ONE_BONUS
                } else {
                    run.streak = 0;
                    Duration::ZERO
                }
            }
            Scoreboard::Versus(scores) => {
                scores.increment(goal.scoring_player);
                Duration::ZERO
            }
            Scoreboard::Practice { .. } => Duration::ZERO,
        }
    }

    /// Two-player scores, if this is a versus board
    pub fn versus(&self) -> Option<Scores> {
        match self {
            Scoreboard::Versus(scores) => Some(*scores),
            _ => None,
        }
    }

    pub fn solo(&self) -> Option<&SoloRun> {
        match self {
            Scoreboard::Solo(run) => Some(run),
            _ => None,
        }
    }

    pub fn score_for(&self, slot: PlayerSlot) -> u32 {
        match self {
            Scoreboard::Solo(run) if slot == PlayerSlot::One => run.score,
            Scoreboard::Versus(scores) => scores.get(slot),
            _ => 0,
        }
    }
}

/// Countdown for timed modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    remaining: Duration,
    running: bool,
    /// Expiry already reported by `advance`
    expired: bool,
}

impl RunClock {
    pub fn new(duration: Duration) -> Self {
        Self {
            remaining: duration,
            running: false,
            expired: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop the countdown; the next `start` resumes from the same point
    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Whole seconds left, rounded up so "0" only shows once time is gone
    pub fn seconds_left(&self) -> u32 {
        let secs = self.remaining.as_secs();
        let rounded = if self.remaining.subsec_nanos() > 0 { secs + 1 } else { secs };
        rounded.min(u32::MAX as u64) as u32
    }

    pub fn add(&mut self, bonus: Duration) {
        self.remaining += bonus;
    }

    /// Run down the clock; returns true on the first running tick at zero.
    /// A clock built with no time left expires on its first running tick.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        if !self.running || self.expired {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        self.expired = self.remaining.is_zero();
        self.expired
    }

    pub fn is_expired(&self) -> bool {
        self.remaining.is_zero()
    }
}
