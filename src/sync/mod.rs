//! Client-side mirror of an online match
//!
//! The client never simulates online. It renders the last authoritative
//! snapshot, merges partial updates as they arrive and turns aim gestures
//! into `shotIntent` messages. Every operation is tied to a session token;
//! after `teardown` anything carrying an older token is ignored.

use glam::Vec2;
use tracing::{debug, info};
use uuid::Uuid;

use crate::game::aim::slingshot_velocity;
use crate::game::state::Obstacle;
use crate::game::MIN_VELOCITY;
use crate::ws::protocol::{ClientMsg, PlayerSlot, PlayerView, Scores, ServerMsg, Winner};

/// Online session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Not looking for a match
    #[default]
    Idle,
    Waiting,
    Active,
    /// Terminal until the next `find_match`
    Finished,
}

/// Identifies one online session; invalidated by `teardown`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken(u64);

/// Last authoritative state as received from the server
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorState {
    pub session_id: Uuid,
    pub players: [PlayerView; 2],
    pub hole_position: Vec2,
    pub obstacles: Vec<Obstacle>,
    pub time_left: u32,
}

impl MirrorState {
    pub fn scores(&self) -> Scores {
        Scores {
            p1: self.players[0].score,
            p2: self.players[1].score,
        }
    }

    pub fn player(&self, slot: PlayerSlot) -> &PlayerView {
        &self.players[slot.index()]
    }
}

/// Client mirror of one online match
#[derive(Debug, Default)]
pub struct OnlineSession {
    epoch: u64,
    status: SessionStatus,
    user_id: Option<Uuid>,
    assigned_slot: Option<PlayerSlot>,
    mirror: Option<MirrorState>,
    winner: Option<Winner>,
    last_error: Option<String>,
}

impl OnlineSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> SessionToken {
        SessionToken(self.epoch)
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn assigned_slot(&self) -> Option<PlayerSlot> {
        self.assigned_slot
    }

    pub fn mirror(&self) -> Option<&MirrorState> {
        self.mirror.as_ref()
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Ask for a match. `None` while already waiting or playing.
    pub fn find_match(&mut self) -> Option<ClientMsg> {
        match self.status {
            SessionStatus::Idle | SessionStatus::Finished => {
                self.status = SessionStatus::Waiting;
                self.assigned_slot = None;
                self.mirror = None;
                self.winner = None;
                Some(ClientMsg::FindMatch)
            }
            SessionStatus::Waiting | SessionStatus::Active => None,
        }
    }

    /// Apply an inbound server message. Returns whether it changed anything.
    pub fn apply(&mut self, token: SessionToken, msg: ServerMsg) -> bool {
        if token != self.token() {
            debug!(stale = token.0, current = self.epoch, "Dropping message for old session");
            return false;
        }

        match msg {
            ServerMsg::Welcome { user_id, .. } => {
                self.user_id = Some(user_id);
                true
            }
            ServerMsg::WaitingForOpponent => self.status == SessionStatus::Waiting,
            ServerMsg::MatchFound {
                session_id,
                players,
                hole_position,
                obstacles,
                assigned_slot,
                time_left,
            } => {
                if self.status != SessionStatus::Waiting {
                    return false;
                }
                self.mirror = Some(MirrorState {
                    session_id,
                    players,
                    hole_position: hole_position.into(),
                    obstacles,
                    time_left,
                });
                self.assigned_slot = Some(assigned_slot);
                self.status = SessionStatus::Active;
                info!(session_id = %session_id, slot = %assigned_slot, "Match found");
                true
            }
            ServerMsg::StateUpdate {
                players,
                hole_position,
                obstacles,
                time_left,
            } => {
                let Some(mirror) = self.active_mirror() else {
                    return false;
                };
                if let Some(players) = players {
                    mirror.players = players;
                }
                if let Some(hole) = hole_position {
                    mirror.hole_position = hole.into();
                }
                if let Some(obstacles) = obstacles {
                    mirror.obstacles = obstacles;
                }
                if let Some(time_left) = time_left {
                    mirror.time_left = time_left;
                }
                true
            }
            ServerMsg::GoalScored {
                scoring_player,
                new_scores,
                new_hole_position,
            } => {
                let Some(mirror) = self.active_mirror() else {
                    return false;
                };
                for player in mirror.players.iter_mut() {
                    player.score = new_scores.get(player.player_number);
                }
                mirror.hole_position = new_hole_position.into();
                debug!(player = %scoring_player, p1 = new_scores.p1, p2 = new_scores.p2, "Goal scored");
                true
            }
            ServerMsg::MatchOver {
                winner,
                final_scores,
            } => {
                let Some(mirror) = self.active_mirror() else {
                    return false;
                };
                for player in mirror.players.iter_mut() {
                    player.score = final_scores.get(player.player_number);
                }
                self.finish(winner);
                true
            }
            ServerMsg::OpponentLeft => {
                if self.status != SessionStatus::Active {
                    return false;
                }
                let Some(slot) = self.assigned_slot else {
                    return false;
                };
                self.finish(Winner::Player(slot));
                true
            }
            ServerMsg::Error { code, message } => {
                debug!(code = %code, message = %message, "Server error");
                self.last_error = Some(message);
                true
            }
            ServerMsg::Pong { .. } => false,
        }
    }

    /// Shot intent from a drag gesture
    pub fn shot_from_drag(
        &self,
        token: SessionToken,
        drag_start: Vec2,
        drag_end: Vec2,
    ) -> Option<ClientMsg> {
        self.shot_intent(token, slingshot_velocity(drag_start, drag_end))
    }

    /// `shotIntent` for the local ball; only while active and the ball is at rest
    pub fn shot_intent(&self, token: SessionToken, velocity: Vec2) -> Option<ClientMsg> {
        if token != self.token() || self.status != SessionStatus::Active {
            return None;
        }
        let slot = self.assigned_slot?;
        let mirror = self.mirror.as_ref()?;
        if mirror.player(slot).ball.speed() > MIN_VELOCITY {
            return None;
        }
        Some(ClientMsg::ShotIntent {
            velocity: velocity.into(),
        })
    }

    /// Leave online play; everything tied to the current token goes stale
    pub fn teardown(&mut self) -> Option<ClientMsg> {
        let was_live = matches!(self.status, SessionStatus::Waiting | SessionStatus::Active);
        self.epoch += 1;
        self.status = SessionStatus::Idle;
        self.assigned_slot = None;
        self.mirror = None;
        self.winner = None;
        self.last_error = None;
        was_live.then_some(ClientMsg::LeaveMatch)
    }

    fn active_mirror(&mut self) -> Option<&mut MirrorState> {
        if self.status != SessionStatus::Active {
            return None;
        }
        self.mirror.as_mut()
    }

    fn finish(&mut self, winner: Winner) {
        self.status = SessionStatus::Finished;
        self.winner = Some(winner);
        info!(winner = ?winner, "Match finished");
    }
}
