//! Match state and authoritative tick loop

use dashmap::DashMap;
use glam::Vec2;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::{unix_millis, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION};
use crate::ws::protocol::{ClientMsg, PlayerSlot, ServerMsg, Winner};

use super::events::{EventLog, RoundEvent};
use super::round::{PlayMode, RoundConfig, RoundLifecycle};
use super::snapshot::SnapshotBuilder;
use super::PlayerInput;

/// Inputs that sat in the channel longer than this get logged
const SLOW_INPUT_MS: u64 = 100;

/// A connected player seated in a match
#[derive(Debug, Clone)]
pub struct Seat {
    pub user_id: Uuid,
    pub slot: PlayerSlot,
    /// Per-connection outbox drained by the socket writer
    pub outbox: mpsc::Sender<ServerMsg>,
}

impl Seat {
    pub fn new(user_id: Uuid, slot: PlayerSlot, outbox: mpsc::Sender<ServerMsg>) -> Self {
        Self {
            user_id,
            slot,
            outbox,
        }
    }
}

/// Whether the tick loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Running,
    /// Clock ran out; `matchOver` was sent
    Finished,
    /// A player left; `opponentLeft` was sent to the other
    Abandoned,
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub player_count: Arc<AtomicUsize>,
}

impl MatchHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_players(&self) -> usize {
        self.matches
            .iter()
            .map(|m| m.value().player_count())
            .sum()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative online match
pub struct GameMatch {
    id: Uuid,
    round: RoundLifecycle,
    seats: Vec<Seat>,
    input_rx: mpsc::Receiver<PlayerInput>,
    snapshot_builder: SnapshotBuilder,
    events: EventLog,
    player_count: Arc<AtomicUsize>,
    tick: u64,
    status: MatchStatus,
}

impl GameMatch {
    /// Create a new match for two seated players
    pub fn new(id: Uuid, seed: u64, config: RoundConfig, seats: [Seat; 2]) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let player_count = Arc::new(AtomicUsize::new(seats.len()));

        let handle = MatchHandle {
            id,
            input_tx,
            player_count: player_count.clone(),
        };

        let game_match = Self {
            id,
            round: RoundLifecycle::new(PlayMode::OnlineVersus, config, seed),
            seats: seats.into(),
            input_rx,
            snapshot_builder: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            events: EventLog::new(),
            player_count,
            tick: 0,
            status: MatchStatus::Running,
        };

        (game_match, handle)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn round(&self) -> &RoundLifecycle {
        &self.round
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Run the authoritative tick loop
    pub async fn run(mut self) {
        info!(match_id = %self.id, "Match started");
        self.announce();

        let mut tick_interval = interval(TICK_DURATION);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            if self.step() != MatchStatus::Running {
                break;
            }
        }

        info!(
            match_id = %self.id,
            ticks = self.tick,
            status = ?self.status,
            "Match ended"
        );
    }

    /// Send each player the initial snapshot with their slot
    pub fn announce(&mut self) {
        let messages: Vec<(usize, ServerMsg)> = self
            .seats
            .iter()
            .enumerate()
            .map(|(i, seat)| {
                (
                    i,
                    self.snapshot_builder
                        .match_found(self.id, &self.round, seat.slot),
                )
            })
            .collect();

        for (i, msg) in messages {
            self.send_to(i, msg);
        }
    }

    /// One fixed tick: drain inputs, simulate, publish
    pub fn step(&mut self) -> MatchStatus {
        if self.status != MatchStatus::Running {
            return self.status;
        }
        self.tick += 1;

        self.process_inputs();
        if self.status != MatchStatus::Running {
            return self.status;
        }

        self.round.tick(TICK_DURATION, &mut self.events);
        self.publish_events();
        if self.status != MatchStatus::Running {
            return self.status;
        }

        if self.snapshot_builder.should_send() {
            let snapshot = self.snapshot_builder.build(&self.round);
            self.broadcast(snapshot);
        }

        self.status
    }

    /// Process all pending inputs from players
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            let waited_ms = input.queued_for(unix_millis());
            if waited_ms > SLOW_INPUT_MS {
                debug!(match_id = %self.id, user_id = %input.user_id, waited_ms, "Slow input");
            }

            match input.msg {
                ClientMsg::ShotIntent { velocity } => {
                    self.handle_shot(input.user_id, velocity.into());
                }
                ClientMsg::LeaveMatch => {
                    self.handle_leave(input.user_id);
                    if self.status != MatchStatus::Running {
                        return;
                    }
                }
                ClientMsg::Ping { t } => {
                    if let Some(i) = self.seat_index(input.user_id) {
                        self.send_to(i, ServerMsg::Pong { t });
                    }
                }
                ClientMsg::FindMatch => {
                    if let Some(i) = self.seat_index(input.user_id) {
                        self.send_to(
                            i,
                            ServerMsg::error("already_in_match", "Leave the current match first"),
                        );
                    }
                }
            }
        }
    }

    fn handle_shot(&mut self, user_id: Uuid, velocity: Vec2) {
        let Some(i) = self.seat_index(user_id) else {
            warn!(match_id = %self.id, user_id = %user_id, "Shot from unknown player");
            return;
        };
        let slot = self.seats[i].slot;

        if let Err(e) = self.round.shoot(slot, velocity, &mut self.events) {
            debug!(match_id = %self.id, player = %slot, error = %e, "Shot rejected");
            self.send_to(i, ServerMsg::error("shot_rejected", e.to_string()));
            return;
        }
        // Fresh velocity goes out on the next tick
        self.snapshot_builder.force_next();
    }

    /// Handle player leave
    fn handle_leave(&mut self, user_id: Uuid) {
        let Some(i) = self.seat_index(user_id) else {
            return;
        };
        let seat = self.seats.remove(i);
        self.player_count.store(self.seats.len(), Ordering::Relaxed);

        info!(
            match_id = %self.id,
            user_id = %user_id,
            player = %seat.slot,
            "Player left match"
        );

        self.broadcast(ServerMsg::OpponentLeft);
        self.status = MatchStatus::Abandoned;
    }

    /// Turn round events into wire messages
    fn publish_events(&mut self) {
        for event in self.events.drain() {
            match event {
                RoundEvent::BallInHole(goal) => {
                    let new_scores = self.round.scoreboard().versus().unwrap_or_default();
                    info!(
                        match_id = %self.id,
                        player = %goal.scoring_player,
                        p1 = new_scores.p1,
                        p2 = new_scores.p2,
                        "Goal scored"
                    );
                    self.broadcast(ServerMsg::GoalScored {
                        scoring_player: goal.scoring_player,
                        new_scores,
                        new_hole_position: goal.next_hole.into(),
                    });
                }
                RoundEvent::RoundReset { .. } => {
                    let update = self.snapshot_builder.build_layout(&self.round);
                    self.broadcast(update);
                }
                RoundEvent::RunOver(scoreboard) => {
                    let final_scores = scoreboard.versus().unwrap_or_default();
                    self.broadcast(ServerMsg::MatchOver {
                        winner: Winner::from_scores(final_scores),
                        final_scores,
                    });
                    self.status = MatchStatus::Finished;
                }
                RoundEvent::ShotTaken { .. } | RoundEvent::BallStopped { .. } => {}
            }
        }
    }

    fn seat_index(&self, user_id: Uuid) -> Option<usize> {
        self.seats.iter().position(|s| s.user_id == user_id)
    }

    fn send_to(&self, index: usize, msg: ServerMsg) {
        if let Some(seat) = self.seats.get(index) {
            if seat.outbox.try_send(msg).is_err() {
                warn!(
                    match_id = %self.id,
                    user_id = %seat.user_id,
                    "Outbox full or closed, dropping message"
                );
            }
        }
    }

    fn broadcast(&self, msg: ServerMsg) {
        for i in 0..self.seats.len() {
            self.send_to(i, msg.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Ball;
    use crate::ws::protocol::Scores;
    use std::time::Duration;

    struct Harness {
        game: GameMatch,
        handle: MatchHandle,
        users: [Uuid; 2],
        outboxes: [mpsc::Receiver<ServerMsg>; 2],
    }

    fn harness(config: RoundConfig) -> Harness {
        let users = [Uuid::new_v4(), Uuid::new_v4()];
        let (tx1, rx1) = mpsc::channel(1024);
        let (tx2, rx2) = mpsc::channel(1024);
        let seats = [
            Seat::new(users[0], PlayerSlot::One, tx1),
            Seat::new(users[1], PlayerSlot::Two, tx2),
        ];
        let (game, handle) = GameMatch::new(Uuid::new_v4(), 17, config, seats);
        Harness {
            game,
            handle,
            users,
            outboxes: [rx1, rx2],
        }
    }

    fn send(h: &Harness, player: usize, msg: ClientMsg) {
        h.handle
            .input_tx
            .try_send(PlayerInput {
                user_id: h.users[player],
                msg,
                received_at: unix_millis(),
            })
            .unwrap();
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMsg>) -> Vec<ServerMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_announce_assigns_slots() {
        let mut h = harness(RoundConfig::default());
        h.game.announce();

        for (i, rx) in h.outboxes.iter_mut().enumerate() {
            let msgs = drain(rx);
            assert_eq!(msgs.len(), 1);
            match &msgs[0] {
                ServerMsg::MatchFound { assigned_slot, .. } => {
                    assert_eq!(assigned_slot.index(), i);
                }
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[test]
    fn test_shot_moves_only_callers_ball() {
        let mut h = harness(RoundConfig::default());
        send(&h, 1, ClientMsg::ShotIntent { velocity: Vec2::new(40.0, 0.0).into() });

        h.game.step();

        let balls = &h.game.round().simulation().balls;
        assert!(!balls[0].is_moving);
        assert!(balls[1].is_moving);
        assert!(balls[1].position.x > 100.0);

        let msgs = drain(&mut h.outboxes[0]);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::StateUpdate { players: Some(_), .. })));
    }

    #[test]
    fn test_non_finite_shot_is_rejected() {
        let mut h = harness(RoundConfig::default());
        send(&h, 0, ClientMsg::ShotIntent { velocity: Vec2::new(f32::INFINITY, 0.0).into() });

        h.game.step();

        assert!(!h.game.round().simulation().balls[0].is_moving);
        let msgs = drain(&mut h.outboxes[0]);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMsg::Error { code, .. } if code == "shot_rejected")));
    }

    #[test]
    fn test_goal_then_new_layout_broadcast() {
        let mut h = harness(RoundConfig::default());
        let hole = h.game.round.layout().hole;
        h.game.round.simulation_mut().balls[1] = Ball {
            position: hole,
            velocity: Vec2::new(0.5, 0.0),
            is_moving: true,
            in_hole: false,
        };

        h.game.step();
        let msgs = drain(&mut h.outboxes[0]);
        let next_hole = msgs
            .iter()
            .find_map(|m| match m {
                ServerMsg::GoalScored {
                    scoring_player,
                    new_scores,
                    new_hole_position,
                } => {
                    assert_eq!(*scoring_player, PlayerSlot::Two);
                    assert_eq!(*new_scores, Scores { p1: 0, p2: 1 });
                    Some(Vec2::from(*new_hole_position))
                }
                _ => None,
            })
            .expect("goalScored expected");

        // 500 ms reset delay at 60 ticks per second
        for _ in 0..31 {
            h.game.step();
        }
        let msgs = drain(&mut h.outboxes[1]);
        let layout_update = msgs.iter().find_map(|m| match m {
            ServerMsg::StateUpdate {
                hole_position: Some(hole),
                obstacles: Some(_),
                ..
            } => Some(Vec2::from(*hole)),
            _ => None,
        });
        assert_eq!(layout_update, Some(next_hole));
        assert_eq!(h.game.round().layout().hole, next_hole);
    }

    #[test]
    fn test_leave_notifies_opponent_and_stops() {
        let mut h = harness(RoundConfig::default());
        send(&h, 0, ClientMsg::LeaveMatch);

        assert_eq!(h.game.step(), MatchStatus::Abandoned);
        assert_eq!(h.handle.player_count(), 1);
        let msgs = drain(&mut h.outboxes[1]);
        assert!(matches!(msgs.as_slice(), [ServerMsg::OpponentLeft]));
        assert_eq!(h.game.step(), MatchStatus::Abandoned);
    }

    #[test]
    fn test_clock_expiry_sends_match_over_with_tie() {
        let config = RoundConfig {
            run_duration: Duration::from_millis(50),
            ..RoundConfig::default()
        };
        let mut h = harness(config);

        let mut status = MatchStatus::Running;
        for _ in 0..10 {
            status = h.game.step();
            if status != MatchStatus::Running {
                break;
            }
        }

        assert_eq!(status, MatchStatus::Finished);
        let msgs = drain(&mut h.outboxes[1]);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMsg::MatchOver {
                winner: Winner::Tie,
                final_scores: Scores { p1: 0, p2: 0 },
            }
        )));
    }

    #[tokio::test]
    async fn test_run_loop_ends_when_player_leaves() {
        let mut h = harness(RoundConfig::default());
        send(&h, 1, ClientMsg::LeaveMatch);

        tokio::time::timeout(Duration::from_secs(2), h.game.run())
            .await
            .expect("match loop should stop");

        let msgs = drain(&mut h.outboxes[0]);
        assert!(matches!(msgs.first(), Some(ServerMsg::MatchFound { .. })));
        assert!(matches!(msgs.last(), Some(ServerMsg::OpponentLeft)));
    }
}
