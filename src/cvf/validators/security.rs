//! Security scan and visual-diff validators, reading the reports the
//! `security.scan`/`secrets.scan` and `visual-capture`/`visual-compare`
//! executors write.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;

/// Shape of a security/secrets scan summary artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySummary {
    #[serde(default)]
    pub high: u32,
    #[serde(default)]
    pub critical: u32,
    #[serde(default)]
    pub leaked_secrets: u32,
}

pub fn evaluate_security(path: &Path) -> DomainResult<Option<String>> {
    let bytes = std::fs::read(path)?;
    let summary: SecuritySummary = serde_json::from_slice(&bytes)?;
    if summary.high > 0 || summary.critical > 0 || summary.leaked_secrets > 0 {
        return Ok(Some(format!(
            "security scan found {} high, {} critical, {} leaked secrets",
            summary.high, summary.critical, summary.leaked_secrets
        )));
    }
    Ok(None)
}

/// Shape of a visual-diff summary artifact written by `visual-compare`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualDiffSummary {
    pub routes: Vec<VisualRouteResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualRouteResult {
    pub route: String,
    pub passed: bool,
    #[serde(default)]
    pub diff_pixels: u64,
}

pub fn evaluate_visual(path: &Path) -> DomainResult<Option<String>> {
    let bytes = std::fs::read(path)?;
    let summary: VisualDiffSummary = serde_json::from_slice(&bytes)?;
    let failed: Vec<&str> = summary
        .routes
        .iter()
        .filter(|r| !r.passed)
        .map(|r| r.route.as_str())
        .collect();
    if failed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(format!("visual regression on routes: {}", failed.join(", "))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_on_leaked_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("security-summary.json");
        std::fs::write(&path, serde_json::json!({ "high": 0, "critical": 0, "leaked_secrets": 1 }).to_string()).unwrap();
        assert!(evaluate_security(&path).unwrap().is_some());
    }

    #[test]
    fn passes_with_zero_findings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("security-summary.json");
        std::fs::write(&path, serde_json::json!({ "high": 0, "critical": 0, "leaked_secrets": 0 }).to_string()).unwrap();
        assert!(evaluate_security(&path).unwrap().is_none());
    }

    #[test]
    fn blocks_on_any_failed_visual_route() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visual-diff.json");
        std::fs::write(
            &path,
            serde_json::json!({ "routes": [{ "route": "/", "passed": true }, { "route": "/cart", "passed": false, "diff_pixels": 900 }] })
                .to_string(),
        )
        .unwrap();
        let msg = evaluate_visual(&path).unwrap();
        assert!(msg.unwrap().contains("/cart"));
    }
}
