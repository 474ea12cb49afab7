use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::services::session_registry::DEFAULT_OUTBOUND_BUFFER;

/// Runtime settings, read from `RELAY_*` environment variables.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Per-session outbound queue capacity.
    pub outbound_buffer: usize,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::with_prefix("RELAY"))
    }

    fn load(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("workers", 4)?
            .set_default("outbound_buffer", DEFAULT_OUTBOUND_BUFFER as i64)?
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}
