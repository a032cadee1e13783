//! Shared helpers for writing executor artifacts under a run's tenant
//! root and recording them in the returned [`ArtifactManifest`].

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::domain::errors::DomainResult;
use crate::domain::models::artifact::{ArtifactManifest, ManifestEntry};

/// Serialize `value` as pretty JSON under `run_root/rel_path`, creating
/// parent directories as needed, and append a manifest entry for it.
pub fn write_json_artifact(
    manifest: &mut ArtifactManifest,
    run_root: &Path,
    rel_path: &str,
    value: &serde_json::Value,
) -> DomainResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes_artifact(manifest, run_root, rel_path, &bytes, "application/json")
}

/// Write raw bytes under `run_root/rel_path` and append a manifest entry.
pub fn write_bytes_artifact(
    manifest: &mut ArtifactManifest,
    run_root: &Path,
    rel_path: &str,
    bytes: &[u8],
    declared_type: &str,
) -> DomainResult<()> {
    let full_path = run_root.join(rel_path);
    if let Some(parent) = full_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&full_path, bytes)?;

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let checksum_sha256 = hex::encode(hasher.finalize());

    manifest.push(ManifestEntry {
        path: rel_path.to_string(),
        declared_type: declared_type.to_string(),
        size_bytes: bytes.len() as u64,
        checksum_sha256,
    });
    Ok(())
}
