//! Time utilities for the match loop

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Tick rate configuration. Physics is per tick, so this is also the frame rate.
pub const SIMULATION_TPS: u32 = 60;
pub const SNAPSHOT_TPS: u32 = 20;

/// Wall time covered by one simulation tick
pub const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / SIMULATION_TPS as u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_duration_matches_rate() {
        let second = TICK_DURATION * SIMULATION_TPS;
        assert!(Duration::from_secs(1) - second < Duration::from_micros(1));
        assert_eq!(SIMULATION_TPS % SNAPSHOT_TPS, 0);
    }

    #[test]
    fn test_uptime_after_init() {
        init_server_time();
        assert!(uptime_secs() < 60);
        assert!(unix_millis() > 1_600_000_000_000);
    }
}
