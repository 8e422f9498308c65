//! Configuration for the Relay runtime.
//!
//! Settings are layered with figment from defaults, TOML/YAML files and
//! `RELAY_*` environment variables; see [`ConfigLoader`].

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{DispatchConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, RelayConfig};

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<RelayConfig> {
    ConfigLoader::new().load()
}
