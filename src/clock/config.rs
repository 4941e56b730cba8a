//! Clock configuration for the engine's startup parameters.

use std::num::NonZeroU32;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Startup parameters of the virtual clock. Virtual time itself is always
/// seeded from the real clock and cannot be configured here.
///
/// | Field        | Unit            | Description                                 | Default |
/// |--------------|-----------------|---------------------------------------------|---------|
/// | speed        | % of real time  | 100 = 1x, 50 = 0.5x, 0 = frozen             | 100     |
/// | random_mode  | bool            | Draw each tick's speed at random            | false   |
/// | random_bound | % of real time  | Exclusive bound for the random draw, > 0    | 300     |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "ClockConfig::default_speed")]
    pub speed: i64,
    #[serde(default)]
    pub random_mode: bool,
    #[serde(default = "ClockConfig::default_random_bound")]
    pub random_bound: NonZeroU32,
}

impl ClockConfig {
    /// Load clock config from the file path in `CONFIG_FILE` env var.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_FILE")
            .map_err(|_| ConfigError::Message("CONFIG_FILE environment variable not set".into()))?;
        Self::from_file(&path)
    }

    /// Load clock config from a TOML file. Supports:
    /// - Files with an `[engine]` section (e.g. the server config)
    /// - Flat files with `speed`, `random_mode`, `random_bound` at root
    ///
    /// Environment variables `VCLOCK_ENGINE_SPEED`, `VCLOCK_ENGINE_RANDOM_MODE`,
    /// `VCLOCK_ENGINE_RANDOM_BOUND` override file values.
    pub fn from_file(config_file: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(config_file))
            .build()?;
        let from_file: Self = config
            .get("engine")
            .or_else(|_| config.try_deserialize())?;
        let clock: Self = Config::builder()
            .add_source(Config::try_from(&from_file)?)
            .add_source(Environment::with_prefix("VCLOCK_ENGINE").try_parsing(true))
            .build()?
            .try_deserialize()?;
        clock.validate()?;
        Ok(clock)
    }

    /// Rejects settings the updater would refuse to run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speed < 0 {
            return Err(ConfigError::Message(format!(
                "speed should be a non-negative number, found {}",
                self.speed
            )));
        }
        Ok(())
    }

    fn default_speed() -> i64 {
        100 // real time
    }
    fn default_random_bound() -> NonZeroU32 {
        NonZeroU32::new(300).unwrap_or(NonZeroU32::MIN)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            speed: Self::default_speed(),
            random_mode: false,
            random_bound: Self::default_random_bound(),
        }
    }
}
