//! Atomic on-disk run-state persistence.
//!
//! State is written to a temp file in the same directory and renamed into
//! place, so a crash mid-write never leaves a torn or truncated state file
//! behind for the next resume to trip over.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::run_state::RunState;
use crate::domain::models::tenant::TenantId;
use crate::domain::ports::{RunStateStore, TenantStore};

pub struct FsRunStateStore {
    tenants: Arc<dyn TenantStore>,
}

impl FsRunStateStore {
    pub fn new(tenants: Arc<dyn TenantStore>) -> Self {
        Self { tenants }
    }
}

#[async_trait]
impl RunStateStore for FsRunStateStore {
    async fn load(&self, tenant: &TenantId, run_id: &str) -> DomainResult<Option<RunState>> {
        let path = self.state_path(tenant, run_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&path).await?;
        let state: RunState = serde_json::from_slice(&bytes)?;
        Ok(Some(state))
    }

    async fn save(&self, tenant: &TenantId, state: &RunState) -> DomainResult<()> {
        let path = self.state_path(tenant, &state.run_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = sibling_tmp_path(&path, &state.run_id);
        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    fn state_path(&self, tenant: &TenantId, run_id: &str) -> PathBuf {
        self.tenants.runs_root(tenant).join(run_id).join("run-state.json")
    }
}

fn sibling_tmp_path(path: &Path, run_id: &str) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    // Unique per run, not per attempt: a resumed run reusing the same tmp
    // name after a crash is fine, the writer always overwrites it fully
    // before the rename.
    parent.join(format!(".run-state-{run_id}.json.tmp"))
}

/// Derive a fresh run id for a new invocation.
pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}
