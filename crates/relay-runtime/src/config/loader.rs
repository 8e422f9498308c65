//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config`: enables TOML configuration files (`relay.toml`, `config.toml`)
//! - `yaml-config`: enables YAML configuration files (`relay.yaml`, `relay.yml`, etc.)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic base ([`ConfigLoader::merge`])
//! 3. Main config file (`relay.toml` / `relay.yaml`)
//! 4. Profile-specific config file (`relay.{profile}.toml` / `relay.{profile}.yaml`)
//! 5. Environment variables (`RELAY_*`)
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `RELAY_` prefix with `__` as separator:
//!
//! - `RELAY_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `RELAY_DISPATCH__ACK_TIMEOUT_MS=2500` → `dispatch.ack_timeout_ms = 2500`
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::RelayConfig;

/// Environment variable naming the active profile.
pub const PROFILE_ENV: &str = "RELAY_PROFILE";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "RELAY_";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting the `dev` and `prod` short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads the profile from `RELAY_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the profile through `lookup`, called with `RELAY_PROFILE`.
    pub fn from_lookup(lookup: impl FnOnce(&str) -> Option<String>) -> Self {
        lookup(PROFILE_ENV)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Overrides the search when set.
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader reading the profile from the environment.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a programmatic base configuration.
    ///
    /// Files and environment variables still override it.
    pub fn merge(mut self, config: RelayConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<RelayConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: RelayConfig = figment.extract()?;
        config.validate()?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            ack_timeout_ms = config.dispatch.ack_timeout_ms,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(RelayConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment)
    }

    /// Dispatches on the file extension; only enabled formats are accepted.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("relay"));
        }
        paths
    }

    /// Looks for the first base file in `search_paths × base_names`, then its
    /// profile-specific sibling. Returns whether a base file was found.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let base_path = search_path.join(base_name);
                if !base_path.exists() {
                    continue;
                }
                info!(path = %base_path.display(), "Loading configuration file");
                figment = merge_fn(figment, &base_path);

                if let Some((stem, ext)) = base_name.rsplit_once('.') {
                    let profile_path =
                        search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                    if profile_path.exists() {
                        debug!(path = %profile_path.display(), "Loading profile-specific config");
                        figment = merge_fn(figment, &profile_path);
                    }
                }
                return (figment, true);
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["relay.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["relay.yaml", "relay.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(paths = ?search_paths, "No configuration file found, using defaults");
        }
        figment
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DispatchConfig, LogLevel};

    /// A directory with no configuration files in it.
    fn empty_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("relay-config-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = ConfigLoader::new()
            .search_path(empty_dir())
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_programmatic_base() {
        let config = ConfigLoader::new()
            .search_path(empty_dir())
            .without_env()
            .merge(RelayConfig {
                dispatch: DispatchConfig {
                    ack_timeout_ms: 1200,
                    ..Default::default()
                },
                ..Default::default()
            })
            .load()
            .unwrap();

        assert_eq!(config.dispatch.ack_timeout_ms, 1200);
        assert_eq!(config.dispatch.queue_capacity, 256);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/nonexistent/relay.toml")
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_invalid_programmatic_config_rejected() {
        let err = ConfigLoader::new()
            .search_path(empty_dir())
            .without_env()
            .merge(RelayConfig {
                dispatch: DispatchConfig {
                    queue_capacity: 0,
                    ..Default::default()
                },
                ..Default::default()
            })
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_overrides_base_file() {
        let dir = std::env::temp_dir().join(format!("relay-config-profile-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("relay.toml"),
            "[logging]\nlevel = \"debug\"\n\n[dispatch]\nack_timeout_ms = 2000\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("relay.production.toml"),
            "[dispatch]\nack_timeout_ms = 2500\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .profile("prod")
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.dispatch.ack_timeout_ms, 2500);
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("Dev"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }

    #[test]
    fn test_profile_from_lookup() {
        let profile = Profile::from_lookup(|key| {
            assert_eq!(key, PROFILE_ENV);
            Some("prod".to_string())
        });
        assert_eq!(profile, Profile::Production);

        assert_eq!(Profile::from_lookup(|_| None), Profile::Development);
        assert_eq!(
            Profile::from_lookup(|_| Some("Staging".to_string())),
            Profile::Custom("staging".to_string())
        );
    }
}
