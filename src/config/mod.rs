//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::RoundConfig;
use crate::ws::protocol::Difficulty;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma-separated, `*` for any
    pub client_origin: String,

    /// Length of an online match
    pub match_duration: Duration,
    /// Pause between a goal and the next course
    pub goal_reset_delay: Duration,
    /// Course difficulty for online matches
    pub difficulty: Difficulty,
    /// Shot intents accepted per player per second
    pub shot_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),

            match_duration: Duration::from_secs(parse_nonzero(&lookup, "MATCH_DURATION_SECS", 60)?),
            goal_reset_delay: Duration::from_millis(parse_or(&lookup, "GOAL_RESET_DELAY_MS", 500)?),
            difficulty: parse_or(&lookup, "DIFFICULTY", Difficulty::Normal)?,
            shot_rate_limit: parse_or(&lookup, "SHOT_RATE_LIMIT", 10)?,
        })
    }

    /// Round settings for online matches
    pub fn round_config(&self) -> RoundConfig {
        RoundConfig {
            difficulty: self.difficulty,
            reset_delay: self.goal_reset_delay,
            run_duration: self.match_duration,
            ..RoundConfig::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

/// Like `parse_or`, but zero is rejected
fn parse_nonzero<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default)? {
        0 => Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
        }),
        n => Ok(n),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.server_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.client_origin, "*");
        assert_eq!(cfg.match_duration, Duration::from_secs(60));
        assert_eq!(cfg.goal_reset_delay, Duration::from_millis(500));
        assert_eq!(cfg.difficulty, Difficulty::Normal);
        assert_eq!(cfg.shot_rate_limit, 10);
    }

    #[test]
    fn test_port_wins_over_server_addr() {
        let cfg = config(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(cfg.server_addr.port(), 9000);
    }

    #[test]
    fn test_overrides_flow_into_round_config() {
        let cfg = config(&[("DIFFICULTY", "maximum"), ("MATCH_DURATION_SECS", "90")]).unwrap();
        let round = cfg.round_config();
        assert_eq!(round.difficulty, Difficulty::Maximum);
        assert_eq!(round.run_duration, Duration::from_secs(90));
        assert_eq!(round.bonus_holes, 0);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(matches!(
            config(&[("SHOT_RATE_LIMIT", "lots")]),
            Err(ConfigError::Invalid { key: "SHOT_RATE_LIMIT", .. })
        ));
        assert!(matches!(
            config(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
    }

    #[test]
    fn test_zero_match_duration_is_rejected() {
        assert!(matches!(
            config(&[("MATCH_DURATION_SECS", "0")]),
            Err(ConfigError::Invalid { key: "MATCH_DURATION_SECS", .. })
        ));
    }
}
