//! Server configuration
//!
//! Read once at startup from `QUIZ_*` environment variables (a `.env` file is
//! loaded first by `main`). Invalid values are logged and replaced by the default.

use crate::scoring::ScoringPolicy;
use crate::session::SessionSettings;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Interval of the keep-alive ping sent to every socket
    pub heartbeat: Duration,
    /// Capacity of every connection outbox and session command queue
    pub channel_capacity: usize,
    pub send_ticks: bool,
    pub max_username_len: usize,
    pub reaper_interval: Duration,
    pub room_id_attempts: u32,
    pub scoring: ScoringPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            heartbeat: Duration::from_secs(25),
            channel_capacity: 64,
            send_ticks: true,
            max_username_len: 24,
            reaper_interval: Duration::from_secs(60),
            room_id_attempts: 64,
            scoring: ScoringPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind = parse_var("QUIZ_BIND", defaults.bind);
        let heartbeat = Duration::from_secs(parse_var("QUIZ_HEARTBEAT_SECS", 25u64).max(1));
        let channel_capacity = parse_var("QUIZ_CHANNEL_CAPACITY", defaults.channel_capacity).max(1);
        let send_ticks = std::env::var("QUIZ_SEND_TICKS")
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(defaults.send_ticks);
        let max_username_len = parse_var("QUIZ_MAX_USERNAME_LEN", defaults.max_username_len).max(1);
        let reaper_interval = Duration::from_secs(parse_var("QUIZ_REAPER_SECS", 60u64).max(1));
        let room_id_attempts = parse_var("QUIZ_ROOM_ID_ATTEMPTS", defaults.room_id_attempts).max(1);

        let max_points: u32 = parse_var("QUIZ_MAX_POINTS", 1000);
        let scoring = match std::env::var("QUIZ_SCORING")
            .map(|v| v.to_lowercase())
            .as_deref()
        {
            Ok("ranked") => ScoringPolicy::ranked(max_points),
            Ok("linear") | Err(_) => ScoringPolicy::Linear {
                max: max_points,
                min: parse_var("QUIZ_MIN_POINTS", 500u32).min(max_points),
            },
            Ok(other) => {
                tracing::warn!("Unknown QUIZ_SCORING `{}`, using linear", other);
                ScoringPolicy::Linear {
                    max: max_points,
                    min: parse_var("QUIZ_MIN_POINTS", 500u32).min(max_points),
                }
            }
        };

        let config = Self {
            bind,
            heartbeat,
            channel_capacity,
            send_ticks,
            max_username_len,
            reaper_interval,
            room_id_attempts,
            scoring,
        };

        tracing::info!(
            bind = %config.bind,
            heartbeat_secs = config.heartbeat.as_secs(),
            channel_capacity,
            send_ticks,
            scoring = ?config.scoring,
            "Server config loaded"
        );
        config
    }

    /// Settings handed to every new session
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            channel_capacity: self.channel_capacity,
            send_ticks: self.send_ticks,
            max_username_len: self.max_username_len,
            scoring: self.scoring,
            room_id_attempts: self.room_id_attempts,
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: `{}`, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "QUIZ_BIND",
        "QUIZ_HEARTBEAT_SECS",
        "QUIZ_CHANNEL_CAPACITY",
        "QUIZ_SEND_TICKS",
        "QUIZ_MAX_USERNAME_LEN",
        "QUIZ_REAPER_SECS",
        "QUIZ_ROOM_ID_ATTEMPTS",
        "QUIZ_SCORING",
        "QUIZ_MAX_POINTS",
        "QUIZ_MIN_POINTS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn set(key: &str, value: &str) {
        std::env::set_var(key, value);
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ServerConfig::from_env();
        assert_eq!(config.bind, SocketAddr::from(([0, 0, 0, 0], 8000)));
        assert_eq!(config.heartbeat, Duration::from_secs(25));
        assert!(config.send_ticks);
        assert_eq!(config.scoring, ScoringPolicy::default());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        set("QUIZ_BIND", "127.0.0.1:9000");
        set("QUIZ_SEND_TICKS", "false");
        set("QUIZ_SCORING", "ranked");
        set("QUIZ_MAX_USERNAME_LEN", "12");

        let config = ServerConfig::from_env();
        assert_eq!(config.bind, SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert!(!config.send_ticks);
        assert_eq!(config.scoring, ScoringPolicy::ranked(1000));

        let settings = config.session_settings();
        assert_eq!(settings.max_username_len, 12);
        assert!(!settings.send_ticks);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        set("QUIZ_HEARTBEAT_SECS", "soon");
        set("QUIZ_CHANNEL_CAPACITY", "0");
        set("QUIZ_MIN_POINTS", "5000");

        let config = ServerConfig::from_env();
        assert_eq!(config.heartbeat, Duration::from_secs(25));
        assert_eq!(config.channel_capacity, 1);
        assert_eq!(
            config.scoring,
            ScoringPolicy::Linear {
                max: 1000,
                min: 1000
            }
        );
        clear_env();
    }
}
