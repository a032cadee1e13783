//! Hierarchical config loading: programmatic defaults, then a project YAML
//! file, then environment variables take highest precedence.

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use super::model::EngineConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid engine_concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    #[error("invalid job_timeout_ms: {0}. Must be positive")]
    InvalidJobTimeout(u64),

    #[error("auth is required but no jwt secret was configured")]
    MissingAuthSecret,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with precedence: defaults < `.swarm1/config.yaml`
    /// < `.swarm1/local.yaml` < environment (`SWARM1_`-prefixed, `__`
    /// nesting separator, so `SWARM1_AUTH__AUTH_REQUIRED` sets
    /// `auth.auth_required`).
    pub fn load() -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Yaml::file(".swarm1/config.yaml"))
            .merge(Yaml::file(".swarm1/local.yaml"))
            .merge(Env::prefixed("SWARM1_").split("__"))
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("SWARM1_").split("__"))
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
        if config.engine_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(config.engine_concurrency));
        }
        if config.job_timeout_ms == 0 {
            return Err(ConfigError::InvalidJobTimeout(config.job_timeout_ms));
        }
        if config.auth.auth_required && config.auth.auth_jwt_secret.is_none() {
            return Err(ConfigError::MissingAuthSecret);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let config = EngineConfig::default();
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn auth_required_without_secret_is_rejected() {
        let mut config = EngineConfig::default();
        config.auth.auth_required = true;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::MissingAuthSecret)));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = EngineConfig::default();
        config.engine_concurrency = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidConcurrency(0))));
    }
}
