//! The AUV required-artifact table: a single table keyed by AUV id is the
//! source of truth for what evidence each AUV must produce.
//!
//! Resolved once here rather than left to disagree across two source
//! locations: `REQUIRED_ARTIFACTS` in [`default_manifest`] is the sole
//! built-in mapping, and a project may extend or override it by pointing
//! `check` at a YAML sidecar (same shape, merged over the defaults).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// One artifact a given AUV must produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRequirement {
    /// Path relative to the AUV's tenant directory.
    pub path: String,
    /// `true` when the artifact must parse as JSON with a specific shape
    /// (e.g. `lighthouse.json`-like artifacts need `categories.performance.score`).
    #[serde(default)]
    pub lighthouse_like: bool,
}

impl ArtifactRequirement {
    pub fn plain(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lighthouse_like: false,
        }
    }

    pub fn lighthouse(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lighthouse_like: true,
        }
    }
}

/// The full table: AUV id -> required artifacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuvManifest {
    pub auvs: BTreeMap<String, Vec<ArtifactRequirement>>,
}

impl AuvManifest {
    pub fn required_for(&self, auv_id: &str) -> DomainResult<&[ArtifactRequirement]> {
        self.auvs
            .get(auv_id)
            .map(Vec::as_slice)
            .ok_or_else(|| DomainError::UnknownAuv(auv_id.to_string()))
    }

    /// Merge `overrides` on top of `self`, overriding per-AUV entries
    /// wholesale (not a field-by-field merge: an AUV either keeps the
    /// default artifact list or is fully replaced).
    pub fn merged_with(mut self, overrides: AuvManifest) -> Self {
        for (auv_id, reqs) in overrides.auvs {
            self.auvs.insert(auv_id, reqs);
        }
        self
    }

    pub fn load_overrides(path: &PathBuf) -> DomainResult<AuvManifest> {
        if !path.exists() {
            return Ok(AuvManifest::default());
        }
        let bytes = std::fs::read(path)?;
        let manifest: AuvManifest = serde_yaml::from_slice(&bytes).map_err(|e| DomainError::SchemaError {
            subject: "cvf manifest".into(),
            detail: e.to_string(),
        })?;
        Ok(manifest)
    }
}

/// The built-in convention: every AUV carries the baseline artifact set a
/// vertically-sliced capability always produces (API responses, a UI
/// screenshot, and a performance trace). Domain-specific AUVs add to this
/// list at override time.
pub fn default_manifest() -> AuvManifest {
    let mut auvs = BTreeMap::new();
    // Example baseline entries; real projects override/extend these via
    // a YAML sidecar, but the shape below is what every AUV is assumed to
    // produce unless its override says otherwise.
    auvs.insert(
        "default".to_string(),
        vec![
            ArtifactRequirement::plain("api/response.json"),
            ArtifactRequirement::plain("ui/screenshot.png"),
            ArtifactRequirement::lighthouse("perf/lighthouse.json"),
        ],
    );
    AuvManifest { auvs }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_manifest_serves_the_baseline_entry() {
        let manifest = default_manifest();
        let reqs = manifest.required_for("default").unwrap();
        assert_eq!(reqs.len(), 3);
        assert!(reqs.iter().any(|r| r.lighthouse_like));
    }

    #[test]
    fn unknown_auv_is_rejected() {
        let manifest = default_manifest();
        let err = manifest.required_for("AUV-9999").unwrap_err();
        assert!(matches!(err, DomainError::UnknownAuv(id) if id == "AUV-9999"));
    }

    #[test]
    fn overrides_fully_replace_the_default_entry() {
        let base = default_manifest();
        let mut overrides = AuvManifest::default();
        overrides.auvs.insert("default".into(), vec![ArtifactRequirement::plain("custom/out.json")]);

        let merged = base.merged_with(overrides);
        let reqs = merged.required_for("default").unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].path, "custom/out.json");
    }

    #[test]
    fn missing_override_file_yields_empty_manifest() {
        let path = std::path::PathBuf::from("/nonexistent/cvf-manifest-overrides.yaml");
        let manifest = AuvManifest::load_overrides(&path).unwrap();
        assert!(manifest.auvs.is_empty());
    }
}
