//! Snapshot building for the online match

use uuid::Uuid;

use crate::ws::protocol::{PlayerSlot, PlayerView, ServerMsg};

use super::round::RoundLifecycle;
use super::state::Ball;

/// Builds snapshots for network transmission
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Periodic update: both balls and the clock
    pub fn build(&self, round: &RoundLifecycle) -> ServerMsg {
        ServerMsg::StateUpdate {
            players: Some(player_views(round)),
            hole_position: None,
            obstacles: None,
            time_left: round.time_left(),
        }
    }

    /// Full update after a round reset, carrying the new course
    pub fn build_layout(&self, round: &RoundLifecycle) -> ServerMsg {
        let layout = round.layout();
        ServerMsg::StateUpdate {
            players: Some(player_views(round)),
            hole_position: Some(layout.hole.into()),
            obstacles: Some(layout.obstacles.clone()),
            time_left: round.time_left(),
        }
    }

    /// Initial snapshot for the player in `slot`
    pub fn match_found(&self, session_id: Uuid, round: &RoundLifecycle, slot: PlayerSlot) -> ServerMsg {
        let layout = round.layout();
        ServerMsg::MatchFound {
            session_id,
            players: player_views(round),
            hole_position: layout.hole.into(),
            obstacles: layout.obstacles.clone(),
            assigned_slot: slot,
            time_left: round.time_left().unwrap_or(0),
        }
    }
}

/// Both players' balls and scores
pub fn player_views(round: &RoundLifecycle) -> [PlayerView; 2] {
    PlayerSlot::ALL.map(|slot| {
        let ball = round
            .simulation()
            .ball(slot)
            .map(Ball::view)
            .unwrap_or_default();
        PlayerView {
            player_number: slot,
            ball,
            score: round.scoreboard().score_for(slot),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::round::{PlayMode, RoundConfig};
    use glam::Vec2;

    #[test]
    fn test_snapshot_interval() {
        let mut builder = SnapshotBuilder::new(3);
        let sent: Vec<bool> = (0..6).map(|_| builder.should_send()).collect();
        assert_eq!(sent, vec![false, false, true, false, false, true]);

        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn test_match_found_per_slot() {
        let round = RoundLifecycle::new(PlayMode::OnlineVersus, RoundConfig::default(), 3);
        let builder = SnapshotBuilder::new(3);
        let id = Uuid::new_v4();

        match builder.match_found(id, &round, PlayerSlot::Two) {
            ServerMsg::MatchFound {
                session_id,
                players,
                assigned_slot,
                time_left,
                hole_position,
                ..
            } => {
                assert_eq!(session_id, id);
                assert_eq!(assigned_slot, PlayerSlot::Two);
                assert_eq!(time_left, 60);
                assert_eq!(Vec2::from(hole_position), round.layout().hole);
                assert_eq!(players[0].player_number, PlayerSlot::One);
                assert_eq!(players[1].ball.position.y, 275.0);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_periodic_update_omits_course() {
        let round = RoundLifecycle::new(PlayMode::OnlineVersus, RoundConfig::default(), 3);
        let value = serde_json::to_value(SnapshotBuilder::new(1).build(&round)).unwrap();
        assert!(value.get("players").is_some());
        assert!(value.get("holePosition").is_none());
        assert!(value.get("obstacles").is_none());
        assert_eq!(value["timeLeft"], 60);
    }
}
