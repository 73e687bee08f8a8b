//! Two-player matchmaking

pub mod queue;
pub mod service;

pub use queue::{MatchmakingQueue, QueuedPlayer};
pub use service::{MatchmakingError, MatchmakingService};
