//! Artifact manifest entities.

use serde::{Deserialize, Serialize};

/// One entry in a run's artifact manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the tenant's run directory.
    pub path: String,
    pub declared_type: String,
    pub size_bytes: u64,
    pub checksum_sha256: String,
}

/// The set of artifacts produced by one node's executor invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub entries: Vec<ManifestEntry>,
}

impl ArtifactManifest {
    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }
}
