//! Configuration Loader
//!
//! Layered loading with the `config` crate:
//! 0. `.env` file if present (via dotenvy)
//! 1. Built-in defaults (`ConsumerConfig::default()`)
//! 2. Optional TOML file named by `USER_RPC_CONFIG_PATH`
//! 3. Environment overrides `USER_RPC__<SECTION>__<KEY>`
//!
//! The merged result is validated before it is returned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::{debug, info};
use validator::Validate;

use super::error::{ConfigResult, ConfigurationError};
use super::ConsumerConfig;

/// Environment variable naming the TOML configuration file
pub const CONFIG_PATH_ENV: &str = "USER_RPC_CONFIG_PATH";

/// Prefix of environment overrides (`USER_RPC__BROKER__URL`)
pub const ENV_PREFIX: &str = "USER_RPC";

const ENV_SEPARATOR: &str = "__";

/// Zero-state loader; all functions are associated
#[derive(Debug)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the process environment
    ///
    /// # Errors
    /// - `USER_RPC_CONFIG_PATH` names a file that does not exist
    /// - TOML parse errors or type mismatches in overrides
    /// - Validation errors
    pub fn load_from_env() -> ConfigResult<ConsumerConfig> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_with_overrides(config_path.as_deref(), None)
    }

    /// Load from an explicit file, still honouring environment overrides
    pub fn load_from_file(path: &Path) -> ConfigResult<ConsumerConfig> {
        Self::load_with_overrides(Some(path), None)
    }

    /// Load with an explicit override map instead of the process environment
    ///
    /// `overrides` uses the same keys as the environment
    /// (`USER_RPC__DELIVERY__MAX_DELIVERY_ATTEMPTS`). `None` reads the real
    /// environment.
    pub fn load_with_overrides(
        path: Option<&Path>,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<ConsumerConfig> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigurationError::file_not_found(path));
            }
            debug!(path = %path.display(), "Loading consumer configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(overrides),
        );

        let source_name = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment".to_string());

        let merged = builder
            .build()
            .map_err(|e| ConfigurationError::load_error(&source_name, e))?;

        let config: ConsumerConfig = merged
            .try_deserialize()
            .map_err(ConfigurationError::deserialization_error)?;

        config.validate()?;

        info!(
            source = %source_name,
            broker = %config.broker.url_redacted(),
            exchange = %config.topology.exchange,
            queue = %config.topology.queue,
            prefetch = config.topology.prefetch_count,
            max_delivery_attempts = config.delivery.max_delivery_attempts,
            "Consumer configuration loaded"
        );

        Ok(config)
    }
}
