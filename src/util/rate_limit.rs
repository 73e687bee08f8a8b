//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Any inbound text frame, shots included
pub const MESSAGE_RATE_LIMIT: u32 = 30;

/// Per-connection rate limiter state
#[derive(Clone)]
pub struct PlayerRateLimiter {
    message_limiter: Arc<Limiter>,
    shot_limiter: Arc<Limiter>,
}

impl PlayerRateLimiter {
    pub fn new(shots_per_second: u32) -> Self {
        Self {
            message_limiter: create_limiter(MESSAGE_RATE_LIMIT),
            shot_limiter: create_limiter(shots_per_second),
        }
    }

    /// Check if an inbound message is allowed (returns true if allowed)
    pub fn check_message(&self) -> bool {
        self.message_limiter.check().is_ok()
    }

    /// Check if a shot intent is allowed
    pub fn check_shot(&self) -> bool {
        self.shot_limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shot_burst_is_capped() {
        let limiter = PlayerRateLimiter::new(3);
        let allowed = (0..10).filter(|_| limiter.check_shot()).count();
        assert_eq!(allowed, 3);
        assert!(limiter.check_message());
    }

    #[test]
    fn test_zero_rate_still_allows_one() {
        let limiter = create_limiter(0);
        assert!(limiter.check().is_ok());
    }
}
