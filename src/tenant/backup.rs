//! Tenant-scoped backup archives.
//!
//! Archives a chosen scope (`runs`, `dist`, or both) for one tenant into a
//! gzip'd tarball, hard-excluding filenames that look like secrets. Uses a
//! plain `tar`/`flate2` pairing for a portable archive format with no extra
//! dependency weight.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::tenant::TenantId;
use crate::domain::ports::TenantStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupScope {
    Runs,
    Dist,
    Both,
}

/// Archive report emitted after a successful backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupReport {
    pub id: String,
    pub path: PathBuf,
    pub file_count: u64,
    pub size_bytes: u64,
}

/// Filenames matching any of these patterns are hard-excluded from every
/// backup archive, regardless of scope.
fn is_sensitive(path: &Path) -> bool {
    path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name.starts_with('.')
            || name.starts_with(".env")
            || name.ends_with(".key")
            || name.ends_with(".pem")
            || name.contains("secrets")
    })
}

/// Archive `scope` for `tenant` into `dest_dir`, returning the report.
pub fn archive_tenant(
    tenants: &dyn TenantStore,
    tenant: &TenantId,
    scope: BackupScope,
    dest_dir: &Path,
) -> DomainResult<BackupReport> {
    std::fs::create_dir_all(dest_dir)?;
    let id = format!("backup-{}-{}-{}", tenant.as_str(), Utc::now().format("%Y%m%d-%H%M%S"), &uuid::Uuid::new_v4().to_string()[..8]);
    let archive_path = dest_dir.join(format!("{id}.tar.gz"));

    let file = std::fs::File::create(&archive_path)?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut file_count = 0u64;
    let roots: Vec<(&str, PathBuf)> = match scope {
        BackupScope::Runs => vec![("runs", tenants.runs_root(tenant))],
        BackupScope::Dist => vec![("dist", tenants.dist_root(tenant))],
        BackupScope::Both => vec![("runs", tenants.runs_root(tenant)), ("dist", tenants.dist_root(tenant))],
    };

    for (label, root) in roots {
        if !root.exists() {
            continue;
        }
        file_count += append_tree(&mut builder, &root, Path::new(label))?;
    }

    let encoder = builder.into_inner()?;
    let mut file = encoder.finish()?;
    file.flush()?;
    let size_bytes = std::fs::metadata(&archive_path)?.len();

    Ok(BackupReport {
        id,
        path: archive_path,
        file_count,
        size_bytes,
    })
}

fn append_tree(
    builder: &mut tar::Builder<flate2::write::GzEncoder<std::fs::File>>,
    dir: &Path,
    archive_prefix: &Path,
) -> DomainResult<u64> {
    let mut count = 0u64;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            let relative = path.strip_prefix(dir).unwrap_or(&path);
            if is_sensitive(relative) {
                continue;
            }
            let archive_path = archive_prefix.join(relative);
            if path.is_dir() {
                stack.push(path);
            } else {
                builder.append_path_with_name(&path, &archive_path)?;
                count += 1;
            }
        }
    }
    Ok(count)
}
