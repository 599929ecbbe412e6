use std::time::Duration;

use aster_shared::ConfigError;

/// Server runtime configuration, produced by the CLI layer.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub max_players: u32,
    pub tick_rate: u32,
    pub heartbeat_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 4242,
            max_players: 16,
            tick_rate: 60,
            heartbeat_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Range checks beyond what the argument parser enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                flag: "--port".to_owned(),
                reason: "port must be between 1 and 65535".to_owned(),
            });
        }
        if self.max_players == 0 || self.max_players > 1000 {
            return Err(ConfigError::InvalidValue {
                flag: "--maxplayer".to_owned(),
                reason: format!("{} is outside 1..=1000", self.max_players),
            });
        }
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(ConfigError::InvalidValue {
                flag: "--tickrate".to_owned(),
                reason: format!("{} is outside 1..=1000", self.tick_rate),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = ServerConfig::default();
        config.max_players = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.max_players = 1001;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.tick_rate = 2000;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }
}
