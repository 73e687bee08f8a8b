//! Matchmaking service - manages queue and match creation

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::game::r#match::Seat;
use crate::game::{GameMatch, MatchRegistry, PlayerInput, RoundConfig};
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, PlayerSlot, ServerMsg};

use super::queue::{MatchmakingQueue, QueuedPlayer};

/// Matchmaking failures reported back to the client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Already in a match")]
    AlreadyInMatch,

    #[error("Not in a match")]
    NotInMatch,

    #[error("Match is no longer running")]
    MatchClosed,
}

impl MatchmakingError {
    /// Short machine-readable code for `error` messages
    pub fn code(&self) -> &'static str {
        match self {
            MatchmakingError::AlreadyInMatch => "already_in_match",
            MatchmakingError::NotInMatch => "not_in_match",
            MatchmakingError::MatchClosed => "match_closed",
        }
    }
}

/// Matchmaking service
pub struct MatchmakingService {
    queue: Arc<Mutex<MatchmakingQueue>>,
    registry: Arc<MatchRegistry>,
    /// Map of player -> current match
    player_matches: Arc<DashMap<Uuid, Uuid>>,
    round_config: RoundConfig,
}

impl MatchmakingService {
    pub fn new(registry: Arc<MatchRegistry>, round_config: RoundConfig) -> Self {
        Self {
            queue: Arc::new(Mutex::new(MatchmakingQueue::new())),
            registry,
            player_matches: Arc::new(DashMap::new()),
            round_config,
        }
    }

    /// Queue a player and pair them as soon as an opponent is waiting.
    ///
    /// Returns the new match id when this call formed a match.
    pub async fn find_match(
        &self,
        user_id: Uuid,
        outbox: mpsc::Sender<ServerMsg>,
    ) -> Result<Option<Uuid>, MatchmakingError> {
        // Check if already in a match
        if self.player_matches.contains_key(&user_id) {
            return Err(MatchmakingError::AlreadyInMatch);
        }

        let mut queue = self.queue.lock().await;
        queue.enqueue(QueuedPlayer::new(user_id, outbox.clone()));

        info!(user_id = %user_id, queue_size = queue.len(), "Player joined matchmaking queue");

        let Some(pair) = queue.try_form_pair() else {
            debug!(
                user_id = %user_id,
                oldest_wait_ms = queue.oldest_wait().map(|d| d.as_millis() as u64),
                "No opponent yet"
            );
            drop(queue);
            let _ = outbox.try_send(ServerMsg::WaitingForOpponent);
            return Ok(None);
        };
        drop(queue); // Release lock for match creation

        Ok(Some(self.create_match(pair)))
    }

    /// Leave the queue, or the current match if there is one
    pub async fn leave(&self, user_id: Uuid) {
        self.queue.lock().await.dequeue(user_id);

        if let Err(e) = self
            .route_input(PlayerInput {
                user_id,
                msg: ClientMsg::LeaveMatch,
                received_at: unix_millis(),
            })
            .await
        {
            debug!(user_id = %user_id, reason = %e, "Leave outside a match");
        }
        self.player_matches.remove(&user_id);
    }

    /// Forward a client message to the player's match loop
    pub async fn route_input(&self, input: PlayerInput) -> Result<(), MatchmakingError> {
        let match_id = self
            .player_match(&input.user_id)
            .ok_or(MatchmakingError::NotInMatch)?;
        let handle = self
            .registry
            .get(&match_id)
            .ok_or(MatchmakingError::MatchClosed)?;

        handle
            .input_tx
            .send(input)
            .await
            .map_err(|_| MatchmakingError::MatchClosed)
    }

    /// Create a match with the given players
    fn create_match(&self, players: [QueuedPlayer; 2]) -> Uuid {
        let match_id = Uuid::new_v4();
        let seed = rand::random::<u64>();

        let [first, second] = players;
        let player_ids = [first.user_id, second.user_id];
        let seats = [
            Seat::new(first.user_id, PlayerSlot::One, first.outbox),
            Seat::new(second.user_id, PlayerSlot::Two, second.outbox),
        ];

        let (game_match, handle) = GameMatch::new(match_id, seed, self.round_config.clone(), seats);

        // Register match
        self.registry.insert(handle);

        // Associate players with match
        for pid in player_ids {
            self.player_matches.insert(pid, match_id);
        }

        info!(
            match_id = %match_id,
            p1 = %player_ids[0],
            p2 = %player_ids[1],
            "Created new match"
        );

        // Spawn match task
        let registry = self.registry.clone();
        let player_matches = self.player_matches.clone();

        tokio::spawn(async move {
            game_match.run().await;

            // Cleanup after match ends
            registry.remove(&match_id);
            for pid in player_ids {
                player_matches.remove_if(&pid, |_, mid| *mid == match_id);
            }

            info!(match_id = %match_id, "Match removed from registry");
        });

        match_id
    }

    /// Get current queue size
    pub async fn queue_size(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Check if player is in queue
    pub async fn is_in_queue(&self, user_id: &Uuid) -> bool {
        self.queue.lock().await.contains(user_id)
    }

    /// Get player's current match ID
    pub fn player_match(&self, user_id: &Uuid) -> Option<Uuid> {
        self.player_matches.get(user_id).map(|r| *r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service() -> MatchmakingService {
        MatchmakingService::new(Arc::new(MatchRegistry::new()), RoundConfig::default())
    }

    #[tokio::test]
    async fn test_first_player_waits() {
        let svc = service();
        let (tx, mut rx) = mpsc::channel(16);
        let user = Uuid::new_v4();

        assert_eq!(svc.find_match(user, tx).await, Ok(None));
        assert!(matches!(rx.try_recv(), Ok(ServerMsg::WaitingForOpponent)));
        assert!(svc.is_in_queue(&user).await);
    }

    #[tokio::test]
    async fn test_second_player_forms_match() {
        let svc = service();
        let (tx1, mut rx1) = mpsc::channel(256);
        let (tx2, mut rx2) = mpsc::channel(256);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        svc.find_match(a, tx1).await.unwrap();
        let match_id = svc.find_match(b, tx2).await.unwrap().expect("match formed");

        assert_eq!(svc.player_match(&a), Some(match_id));
        assert_eq!(svc.player_match(&b), Some(match_id));
        assert_eq!(svc.queue_size().await, 0);
        assert_eq!(svc.registry.active_matches(), 1);

        let first = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                match rx1.recv().await {
                    Some(ServerMsg::MatchFound { assigned_slot, .. }) => return assigned_slot,
                    Some(_) => continue,
                    None => panic!("outbox closed"),
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(first, PlayerSlot::One);

        let second = tokio::time::timeout(Duration::from_secs(1), rx2.recv())
            .await
            .unwrap();
        assert!(matches!(
            second,
            Some(ServerMsg::MatchFound {
                assigned_slot: PlayerSlot::Two,
                ..
            })
        ));

        assert_eq!(
            svc.find_match(a, mpsc::channel(1).0).await,
            Err(MatchmakingError::AlreadyInMatch)
        );
    }

    #[tokio::test]
    async fn test_leave_ends_match_for_opponent() {
        let svc = service();
        let (tx1, _rx1) = mpsc::channel(256);
        let (tx2, mut rx2) = mpsc::channel(256);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        svc.find_match(a, tx1).await.unwrap();
        svc.find_match(b, tx2).await.unwrap();

        svc.leave(a).await;
        assert_eq!(svc.player_match(&a), None);

        let left = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(msg) = rx2.recv().await {
                if matches!(msg, ServerMsg::OpponentLeft) {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap();
        assert!(left);
    }

    #[tokio::test]
    async fn test_route_without_match() {
        let svc = service();
        let input = PlayerInput {
            user_id: Uuid::new_v4(),
            msg: ClientMsg::Ping { t: 1 },
            received_at: 0,
        };
        assert_eq!(svc.route_input(input).await, Err(MatchmakingError::NotInMatch));
        assert_eq!(MatchmakingError::NotInMatch.code(), "not_in_match");
    }
}
