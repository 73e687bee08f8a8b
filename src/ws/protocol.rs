//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::state::Obstacle;

/// Errors converting wire values into domain values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid player slot: {0}")]
    InvalidSlot(u8),

    #[error("Invalid winner value: {0}")]
    InvalidWinner(String),

    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

/// One of the two player positions in a two-ball game, `1` or `2` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    pub const ALL: [PlayerSlot; 2] = [PlayerSlot::One, PlayerSlot::Two];

    /// Zero-based index into per-player arrays
    pub fn index(self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PlayerSlot::One),
            1 => Some(PlayerSlot::Two),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }
}

impl TryFrom<u8> for PlayerSlot {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PlayerSlot::One),
            2 => Ok(PlayerSlot::Two),
            other => Err(ProtocolError::InvalidSlot(other)),
        }
    }
}

impl From<PlayerSlot> for u8 {
    fn from(slot: PlayerSlot) -> Self {
        match slot {
            PlayerSlot::One => 1,
            PlayerSlot::Two => 2,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", u8::from(*self))
    }
}

/// Match outcome: `1`, `2` or `"tie"` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WinnerWire", into = "WinnerWire")]
pub enum Winner {
    Player(PlayerSlot),
    Tie,
}

impl Winner {
    /// Winner by comparing final scores
    pub fn from_scores(scores: Scores) -> Self {
        match scores.p1.cmp(&scores.p2) {
            std::cmp::Ordering::Greater => Winner::Player(PlayerSlot::One),
            std::cmp::Ordering::Less => Winner::Player(PlayerSlot::Two),
            std::cmp::Ordering::Equal => Winner::Tie,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WinnerWire {
    Slot(u8),
    Label(String),
}

impl TryFrom<WinnerWire> for Winner {
    type Error = ProtocolError;

    fn try_from(value: WinnerWire) -> Result<Self, Self::Error> {
        match value {
            WinnerWire::Slot(n) => PlayerSlot::try_from(n).map(Winner::Player),
            WinnerWire::Label(label) if label == "tie" => Ok(Winner::Tie),
            WinnerWire::Label(label) => Err(ProtocolError::InvalidWinner(label)),
        }
    }
}

impl From<Winner> for WinnerWire {
    fn from(winner: Winner) -> Self {
        match winner {
            Winner::Player(slot) => WinnerWire::Slot(slot.into()),
            Winner::Tie => WinnerWire::Label("tie".to_string()),
        }
    }
}

/// Course difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Two obstacles, a light breeze
    #[default]
    Normal,
    /// Four obstacles, noticeable wind
    Advanced,
    /// Six obstacles, strong wind
    Maximum,
}

impl Difficulty {
    pub fn obstacle_count(self) -> usize {
        match self {
            Difficulty::Normal => 2,
            Difficulty::Advanced => 4,
            Difficulty::Maximum => 6,
        }
    }

    /// Upper bound on the per-tick wind force
    pub fn max_wind(self) -> f32 {
        match self {
            Difficulty::Normal => 0.01,
            Difficulty::Advanced => 0.04,
            Difficulty::Maximum => 0.08,
        }
    }
}

impl FromStr for Difficulty {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Difficulty::Normal),
            "advanced" => Ok(Difficulty::Advanced),
            "maximum" => Ok(Difficulty::Maximum),
            other => Err(ProtocolError::UnknownDifficulty(other.to_string())),
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Request a two-player match
    FindMatch,

    /// Ask the server to shoot the caller's ball
    ShotIntent {
        velocity: WireVec2,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave the current match or queue
    LeaveMatch,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        user_id: Uuid,
        server_time: u64,
    },

    /// Queued, no opponent yet
    WaitingForOpponent,

    /// Paired with an opponent; the full initial snapshot
    MatchFound {
        session_id: Uuid,
        players: [PlayerView; 2],
        hole_position: WireVec2,
        obstacles: Vec<Obstacle>,
        assigned_slot: PlayerSlot,
        time_left: u32,
    },

    /// Partial snapshot, merged field by field into the client mirror
    StateUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        players: Option<[PlayerView; 2]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hole_position: Option<WireVec2>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        obstacles: Option<Vec<Obstacle>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_left: Option<u32>,
    },

    /// A ball dropped; authoritative scores and the next hole
    GoalScored {
        scoring_player: PlayerSlot,
        new_scores: Scores,
        new_hole_position: WireVec2,
    },

    /// Match clock ran out
    MatchOver {
        winner: Winner,
        final_scores: Scores,
    },

    /// The other player disconnected
    OpponentLeft,

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// A player's ball and score as shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub player_number: PlayerSlot,
    pub ball: BallView,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BallView {
    pub position: WireVec2,
    pub velocity: WireVec2,
}

impl BallView {
    pub fn speed(&self) -> f32 {
        Vec2::from(self.velocity).length()
    }
}

/// A point or vector, `{x, y}` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WireVec2 {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for WireVec2 {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<WireVec2> for Vec2 {
    fn from(v: WireVec2) -> Self {
        Vec2::new(v.x, v.y)
    }
}

/// Per-slot scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub p1: u32,
    pub p2: u32,
}

impl Scores {
    pub fn get(&self, slot: PlayerSlot) -> u32 {
        match slot {
            PlayerSlot::One => self.p1,
            PlayerSlot::Two => self.p2,
        }
    }

    pub fn increment(&mut self, slot: PlayerSlot) {
        match slot {
            PlayerSlot::One => self.p1 += 1,
            PlayerSlot::Two => self.p2 += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_messages_use_camel_case_tags() {
        let msg = ClientMsg::ShotIntent {
            velocity: Vec2::new(-3.0, 4.5).into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({ "type": "shotIntent", "velocity": { "x": -3.0, "y": 4.5 } })
        );

        let parsed: ClientMsg = serde_json::from_str(r#"{"type":"findMatch"}"#).unwrap();
        assert!(matches!(parsed, ClientMsg::FindMatch));
    }

    #[test]
    fn test_goal_scored_shape() {
        let msg = ServerMsg::GoalScored {
            scoring_player: PlayerSlot::Two,
            new_scores: Scores { p1: 1, p2: 3 },
            new_hole_position: Vec2::new(640.0, 120.0).into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "goalScored",
                "scoringPlayer": 2,
                "newScores": { "p1": 1, "p2": 3 },
                "newHolePosition": { "x": 640.0, "y": 120.0 }
            })
        );
    }

    #[test]
    fn test_winner_wire_values() {
        assert_eq!(serde_json::to_string(&Winner::Tie).unwrap(), r#""tie""#);
        assert_eq!(
            serde_json::to_string(&Winner::Player(PlayerSlot::One)).unwrap(),
            "1"
        );
        let parsed: Winner = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, Winner::Player(PlayerSlot::Two));
        assert!(serde_json::from_str::<Winner>("3").is_err());
        assert!(serde_json::from_str::<Winner>(r#""draw""#).is_err());
    }

    #[test]
    fn test_state_update_omits_missing_fields() {
        let msg = ServerMsg::StateUpdate {
            players: None,
            hole_position: None,
            obstacles: None,
            time_left: Some(42),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({ "type": "stateUpdate", "timeLeft": 42 }));

        let parsed: ServerMsg =
            serde_json::from_str(r#"{"type":"stateUpdate","holePosition":{"x":1,"y":2}}"#).unwrap();
        match parsed {
            ServerMsg::StateUpdate {
                hole_position,
                players,
                ..
            } => {
                assert_eq!(hole_position.map(Vec2::from), Some(Vec2::new(1.0, 2.0)));
                assert!(players.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_ball_view_keeps_object_shape() {
        let ball = BallView {
            position: Vec2::new(120.0, 80.0).into(),
            velocity: Vec2::new(3.0, -4.0).into(),
        };
        let value = serde_json::to_value(ball).unwrap();
        assert_eq!(
            value,
            json!({ "position": { "x": 120.0, "y": 80.0 }, "velocity": { "x": 3.0, "y": -4.0 } })
        );
        assert_eq!(ball.speed(), 5.0);
    }

    #[test]
    fn test_opponent_left_is_bare_tag() {
        let value = serde_json::to_value(&ServerMsg::OpponentLeft).unwrap();
        assert_eq!(value, json!({ "type": "opponentLeft" }));
    }

    #[test]
    fn test_winner_from_scores() {
        assert_eq!(
            Winner::from_scores(Scores { p1: 2, p2: 1 }),
            Winner::Player(PlayerSlot::One)
        );
        assert_eq!(Winner::from_scores(Scores { p1: 2, p2: 2 }), Winner::Tie);
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("Advanced".parse::<Difficulty>(), Ok(Difficulty::Advanced));
        assert!("hard".parse::<Difficulty>().is_err());
    }
}
