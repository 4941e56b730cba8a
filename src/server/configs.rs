use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use vclock::ClockConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the control server listens on
    #[serde(default = "ServerConfig::default_listen_address")]
    pub listen_address: String,
    #[serde(default)]
    pub engine: ClockConfig,
}

impl ServerConfig {
    /// Reads the TOML file named by `CONFIG_FILE`, if set, with `VCLOCK_*`
    /// environment overrides (e.g. `VCLOCK_LISTEN_ADDRESS`). Without a file
    /// the defaults apply.
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Ok(path) = std::env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&path));
        }
        let config: Self = builder
            .add_source(
                Environment::with_prefix("VCLOCK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.engine.validate()?;
        Ok(config)
    }

    fn default_listen_address() -> String {
        "127.0.0.1:7070".to_string()
    }
}
