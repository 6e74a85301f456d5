//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `PICKUP_*` environment variables.
//!
//! Nested keys use a double underscore in the environment, so
//! `PICKUP_REALTIME__AUTO_RECONNECT=false` sets `realtime.auto_reconnect`.

use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat, Map};
use pickup_domain::{ClientConfig, DomainError};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "PICKUP";

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The merged configuration is unusable.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] DomainError),
}

/// Default configuration file under the user's config directory.
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pickup").join("config.toml"))
}

/// Builds a [`ClientConfig`] from layered sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<(PathBuf, bool)>,
    env: Option<Map<String, String>>,
}

impl ConfigLoader {
    /// Loader with no file, reading the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `path`, which must exist.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some((path.into(), true));
        self
    }

    /// Reads `path` if it exists.
    #[must_use]
    pub fn with_optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some((path.into(), false));
        self
    }

    /// Uses `vars` instead of the process environment.
    #[must_use]
    pub fn with_env(mut self, vars: Map<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Merges the sources and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a source is unreadable, a value has the wrong
    /// type, or the merged configuration fails validation.
    pub fn load(self) -> Result<ClientConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some((path, required)) = &self.file {
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(*required),
            );
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env),
        );

        let config: ClientConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        tracing::debug!(
            api = %config.api_base_url,
            realtime = %config.realtime_url,
            refresh_mode = ?config.refresh_mode,
            "configuration loaded"
        );
        Ok(config)
    }
}
