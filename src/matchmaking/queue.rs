//! Matchmaking queue implementation

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Player waiting for an opponent
#[derive(Debug, Clone)]
pub struct QueuedPlayer {
    pub user_id: Uuid,
    /// Where match messages for this player go
    pub outbox: mpsc::Sender<ServerMsg>,
    pub queued_at: Instant,
}

impl QueuedPlayer {
    pub fn new(user_id: Uuid, outbox: mpsc::Sender<ServerMsg>) -> Self {
        Self {
            user_id,
            outbox,
            queued_at: Instant::now(),
        }
    }

    /// How long this player has been waiting
    pub fn wait_time(&self) -> Duration {
        self.queued_at.elapsed()
    }

    /// The connection behind this entry is gone
    pub fn is_disconnected(&self) -> bool {
        self.outbox.is_closed()
    }
}

/// First-come first-served two-player queue
#[derive(Default)]
pub struct MatchmakingQueue {
    queue: VecDeque<QueuedPlayer>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player to the queue
    pub fn enqueue(&mut self, player: QueuedPlayer) {
        // Remove if already in queue (rejoin)
        self.queue.retain(|p| p.user_id != player.user_id);
        self.queue.push_back(player);
    }

    /// Remove a player from the queue
    pub fn dequeue(&mut self, user_id: Uuid) -> Option<QueuedPlayer> {
        let pos = self.queue.iter().position(|p| p.user_id == user_id)?;
        self.queue.remove(pos)
    }

    /// Check if a player is in the queue
    pub fn contains(&self, user_id: &Uuid) -> bool {
        self.queue.iter().any(|p| &p.user_id == user_id)
    }

    /// Get queue length
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pop the two longest-waiting connected players.
    /// Disconnected entries are discarded along the way.
    pub fn try_form_pair(&mut self) -> Option<[QueuedPlayer; 2]> {
        self.queue.retain(|p| !p.is_disconnected());
        if self.queue.len() < 2 {
            return None;
        }
        let first = self.queue.pop_front()?;
        let second = self.queue.pop_front()?;
        Some([first, second])
    }

    /// Longest current wait, for diagnostics
    pub fn oldest_wait(&self) -> Option<Duration> {
        self.queue.front().map(QueuedPlayer::wait_time)
    }
}
