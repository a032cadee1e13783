//! Hierarchical engine configuration (figment: defaults -> YAML -> env).

mod loader;
mod model;

pub use loader::{ConfigError, ConfigLoader};
pub use model::{AuthConfig, BackupConfig, EngineConfig};
