//! Client settings loading.

mod loader;

pub use loader::{ConfigError, ConfigLoader, ENV_PREFIX, default_config_file};
