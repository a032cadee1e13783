//! The engine's configuration struct.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    #[serde(default = "default_concurrency")]
    pub engine_concurrency: usize,
    #[serde(default = "default_namespace")]
    pub engine_namespace: String,
    #[serde(default = "default_job_timeout_ms")]
    pub job_timeout_ms: u64,
    #[serde(default = "default_max_job_retries")]
    pub max_job_retries: u32,
    #[serde(default = "default_backoff_delay_ms")]
    pub backoff_delay_ms: u64,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default)]
    pub staging_url: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default = "default_node_env")]
    pub node_env: String,
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default)]
    pub safety_allow_prod: bool,

    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    #[serde(default = "default_tenant_id")]
    pub default_tenant: String,

    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

const fn default_concurrency() -> usize {
    4
}

fn default_namespace() -> String {
    "swarm1".to_string()
}

const fn default_job_timeout_ms() -> u64 {
    300_000
}

const fn default_max_job_retries() -> u32 {
    3
}

const fn default_backoff_delay_ms() -> u64 {
    1_000
}

fn default_database_url() -> String {
    "sqlite://.swarm1/queue.db".to_string()
}

fn default_node_env() -> String {
    "development".to_string()
}

fn default_tenant_id() -> String {
    "default".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_concurrency: default_concurrency(),
            engine_namespace: default_namespace(),
            job_timeout_ms: default_job_timeout_ms(),
            max_job_retries: default_max_job_retries(),
            backoff_delay_ms: default_backoff_delay_ms(),
            database_url: default_database_url(),
            staging_url: None,
            api_base: None,
            node_env: default_node_env(),
            test_mode: false,
            safety_allow_prod: false,
            tenant_id: default_tenant_id(),
            default_tenant: default_tenant_id(),
            auth: AuthConfig::default(),
            backup: BackupConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthConfig {
    #[serde(default)]
    pub auth_required: bool,
    pub auth_jwt_secret: Option<String>,
    pub auth_issuer: Option<String>,
    pub auth_audience: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackupConfig {
    pub backup_s3_bucket: Option<String>,
    #[serde(default = "default_retention_days")]
    pub backup_retention_days: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_s3_bucket: None,
            backup_retention_days: default_retention_days(),
        }
    }
}

const fn default_retention_days() -> u32 {
    30
}
