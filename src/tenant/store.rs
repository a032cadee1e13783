//! Filesystem tenant store: `runs/` for `default`,
//! `runs/tenants/<tenant>/` otherwise; same rule for `dist/`.

use std::path::{Path, PathBuf};

use crate::domain::models::tenant::TenantId;
use crate::domain::ports::TenantStore;

pub struct FsTenantStore {
    project_root: PathBuf,
}

impl FsTenantStore {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    fn scoped_root(&self, base: &str, tenant: &TenantId) -> PathBuf {
        if tenant.is_default() {
            self.project_root.join(base)
        } else {
            self.project_root.join(base).join("tenants").join(tenant.as_str())
        }
    }
}

impl TenantStore for FsTenantStore {
    fn runs_root(&self, tenant: &TenantId) -> PathBuf {
        self.scoped_root("runs", tenant)
    }

    fn dist_root(&self, tenant: &TenantId) -> PathBuf {
        self.scoped_root("dist", tenant)
    }

    fn is_within_tenant(&self, tenant: &TenantId, path: &Path) -> bool {
        let Ok(canonical_runs) = self.runs_root(tenant).canonicalize().or_else(|_| Ok::<_, std::io::Error>(self.runs_root(tenant))) else {
            return false;
        };
        let Ok(canonical_dist) = self.dist_root(tenant).canonicalize().or_else(|_| Ok::<_, std::io::Error>(self.dist_root(tenant))) else {
            return false;
        };
        path.starts_with(&canonical_runs) || path.starts_with(&canonical_dist)
    }
}
