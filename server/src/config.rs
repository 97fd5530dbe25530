//! Server configuration.

use tiltball_engine::GAME_DURATION_MS;
use tiltball_shared::map::GameMapName;

/// How equal final scores are ordered in the standings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreakRule {
    /// Higher high-score wins the tie, join order breaks the rest.
    HighScore,
    /// Earlier join wins the tie.
    JoinOrder,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate_hz: u32,
    /// Wall-clock budget of one game, ms.
    pub game_duration_ms: f64,
    pub max_players_per_room: usize,
    /// Fixed rating delta magnitude per game.
    pub rating_change: u32,
    pub tie_break: TieBreakRule,
    pub map_name: GameMapName,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            game_duration_ms: GAME_DURATION_MS,
            max_players_per_room: 2,
            rating_change: 10,
            tie_break: TieBreakRule::HighScore,
            map_name: GameMapName::Multiplayer,
        }
    }
}

impl ServerConfig {
    pub fn tick_delta_ms(&self) -> f64 {
        1000.0 / self.tick_rate_hz as f64
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 240 {
            return Err("tick_rate_hz must be between 1 and 240".to_string());
        }
        if !self.game_duration_ms.is_finite() || self.game_duration_ms <= 0.0 {
            return Err("game_duration_ms must be finite and > 0".to_string());
        }
        if self.max_players_per_room == 0 {
            return Err("max_players_per_room must be >= 1".to_string());
        }
        if self.rating_change == 0 {
            return Err("rating_change must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let config = ServerConfig {
            tick_rate_hz: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_duration() {
        let config = ServerConfig {
            game_duration_ms: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
