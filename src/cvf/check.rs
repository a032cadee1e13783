//! The evidence-gate top-level operation:
//! `check(auv_id, { strict, domains? }) -> { passed, details[] }`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

use super::manifest::AuvManifest;
use super::validators::{domain as domain_validators, perf, security, DomainCode, PerfBudget};

/// Which domain-specific validators to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Data,
    Charts,
    Seo,
    Media,
    Db,
}

impl Domain {
    fn code(self) -> DomainCode {
        match self {
            Domain::Data => DomainCode::Data,
            Domain::Charts => DomainCode::Charts,
            Domain::Seo => DomainCode::Seo,
            Domain::Media => DomainCode::Media,
            Domain::Db => DomainCode::Db,
        }
    }
}

/// One entry in a [`CheckResult`]: either a missing/malformed artifact, a
/// threshold violation, or a plain pass, tagged with the exit-code class a
/// caller should surface for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDetail {
    pub check: String,
    pub passed: bool,
    pub exit_code: u16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub passed: bool,
    pub details: Vec<CheckDetail>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub strict: bool,
    pub domains: Option<Vec<Domain>>,
    pub perf_budget: PerfBudget,
}

/// Filenames (relative to an AUV's tenant root) whose presence auto-enables
/// a domain's validators when `domains` is not given explicitly.
const AUTO_DETECT: &[(&str, Domain)] = &[
    ("insights.json", Domain::Data),
    ("reports/seo/audit.json", Domain::Seo),
    ("media/compose-metadata.json", Domain::Media),
    ("db/migration-result.json", Domain::Db),
];

fn auto_detect_domains(auv_root: &Path) -> Vec<Domain> {
    let mut found = Vec::new();
    for (rel, domain) in AUTO_DETECT {
        if auv_root.join(rel).is_file() {
            found.push(*domain);
        }
    }
    let charts_dir = auv_root.join("charts");
    if charts_dir.is_dir() {
        let has_png = std::fs::read_dir(&charts_dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .any(|e| e.path().extension().and_then(|s| s.to_str()) == Some("png"))
            })
            .unwrap_or(false);
        if has_png {
            found.push(Domain::Charts);
        }
    }
    found
}

/// Run the evidence gate for one AUV.
///
/// `auv_root` is the AUV's artifact directory (already tenant-scoped by the
/// caller); `manifest` resolves which artifacts are required.
pub fn check(auv_id: &str, auv_root: &Path, manifest: &AuvManifest, opts: &CheckOptions) -> DomainResult<CheckResult> {
    let mut details = Vec::new();
    let required = manifest.required_for(auv_id)?;

    for req in required {
        let path = auv_root.join(&req.path);
        let detail = verify_artifact(&req.path, &path, req.lighthouse_like);
        details.push(detail);
    }

    if opts.strict {
        run_strict_checks(auv_root, opts, &mut details);
    }

    let passed = details.iter().all(|d| d.passed);
    Ok(CheckResult { passed, details })
}

fn verify_artifact(rel_path: &str, path: &Path, lighthouse_like: bool) -> CheckDetail {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => {
            return CheckDetail {
                check: format!("artifact:{rel_path}"),
                passed: false,
                exit_code: 103,
                message: format!("required artifact missing: {rel_path}"),
            }
        }
    };
    if metadata.len() == 0 {
        return CheckDetail {
            check: format!("artifact:{rel_path}"),
            passed: false,
            exit_code: 103,
            message: format!("required artifact is empty: {rel_path}"),
        };
    }
    if lighthouse_like {
        let parsed = std::fs::read(path)
            .map_err(DomainError::from)
            .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).map_err(DomainError::from));
        let score_ok = parsed
            .as_ref()
            .ok()
            .and_then(|v| v.pointer("/categories/performance/score"))
            .and_then(serde_json::Value::as_f64)
            .is_some();
        if !score_ok {
            return CheckDetail {
                check: format!("artifact:{rel_path}"),
                passed: false,
                exit_code: 102,
                message: format!("{rel_path} missing categories.performance.score"),
            };
        }
    }
    CheckDetail {
        check: format!("artifact:{rel_path}"),
        passed: true,
        exit_code: 0,
        message: "present".into(),
    }
}

fn run_strict_checks(auv_root: &Path, opts: &CheckOptions, details: &mut Vec<CheckDetail>) {
    let security_path = auv_root.join("security-summary.json");
    if security_path.is_file() {
        push_result(details, "security", 103, security::evaluate_security(&security_path));
    }

    let visual_path = auv_root.join("visual-diff.json");
    if visual_path.is_file() {
        push_result(details, "visual", 303, security::evaluate_visual(&visual_path));
    }

    let perf_path = auv_root.join("perf/lighthouse.json");
    if perf_path.is_file() && !opts.perf_budget.metrics.is_empty() {
        match perf::evaluate(&perf_path, &opts.perf_budget) {
            Ok(violations) if violations.is_empty() => details.push(CheckDetail {
                check: "perf".into(),
                passed: true,
                exit_code: 0,
                message: "within budget".into(),
            }),
            Ok(violations) => {
                let message = violations
                    .iter()
                    .map(|v| format!("{} +{:.1}%", v.metric, v.overage_pct))
                    .collect::<Vec<_>>()
                    .join(", ");
                details.push(CheckDetail {
                    check: "perf".into(),
                    passed: false,
                    exit_code: 102,
                    message,
                })
            }
            Err(e) => details.push(CheckDetail {
                check: "perf".into(),
                passed: false,
                exit_code: 102,
                message: e.to_string(),
            }),
        }
    }

    let domains = opts.domains.clone().unwrap_or_else(|| auto_detect_domains(auv_root));
    for d in domains {
        run_domain_check(auv_root, d, details);
    }
}

fn push_result(details: &mut Vec<CheckDetail>, name: &str, exit_code: u16, result: DomainResult<Option<String>>) {
    match result {
        Ok(None) => details.push(CheckDetail {
            check: name.into(),
            passed: true,
            exit_code: 0,
            message: "ok".into(),
        }),
        Ok(Some(message)) => details.push(CheckDetail {
            check: name.into(),
            passed: false,
            exit_code,
            message,
        }),
        Err(e) => details.push(CheckDetail {
            check: name.into(),
            passed: false,
            exit_code,
            message: e.to_string(),
        }),
    }
}

fn run_domain_check(auv_root: &Path, d: Domain, details: &mut Vec<CheckDetail>) {
    let (name, path, result): (&str, PathBuf, DomainResult<Option<String>>) = match d {
        Domain::Data => ("data", auv_root.join("insights.json"), domain_validators::evaluate_data(&auv_root.join("insights.json"))),
        Domain::Charts => (
            "charts",
            auv_root.join("charts/meta.json"),
            domain_validators::evaluate_charts(&auv_root.join("charts/meta.json")),
        ),
        Domain::Seo => (
            "seo",
            auv_root.join("reports/seo/audit.json"),
            domain_validators::evaluate_seo(&auv_root.join("reports/seo/audit.json")),
        ),
        Domain::Media => (
            "media",
            auv_root.join("media/compose-metadata.json"),
            domain_validators::evaluate_media(&auv_root.join("media/compose-metadata.json")),
        ),
        Domain::Db => (
            "db",
            auv_root.join("db/migration-result.json"),
            domain_validators::evaluate_db(&auv_root.join("db/migration-result.json")),
        ),
    };
    if !path.is_file() {
        details.push(CheckDetail {
            check: name.into(),
            passed: false,
            exit_code: d.code() as u16,
            message: format!("{name} artifact missing at {}", path.display()),
        });
        return;
    }
    push_result(details, name, d.code() as u16, result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cvf::manifest::ArtifactRequirement;
    use std::collections::BTreeMap;

    fn manifest_with(auv_id: &str, reqs: Vec<ArtifactRequirement>) -> AuvManifest {
        let mut auvs = BTreeMap::new();
        auvs.insert(auv_id.to_string(), reqs);
        AuvManifest { auvs }
    }

    #[test]
    fn missing_required_artifact_fails_with_103() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest_with("demo-auv", vec![ArtifactRequirement::plain("api/response.json")]);
        let result = check("demo-auv", dir.path(), &manifest, &CheckOptions::default()).unwrap();
        assert!(!result.passed);
        assert_eq!(result.details[0].exit_code, 103);
    }

    #[test]
    fn unknown_auv_is_a_hard_fail() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = AuvManifest::default();
        let err = check("missing-auv", dir.path(), &manifest, &CheckOptions::default()).unwrap_err();
        assert!(matches!(err, DomainError::UnknownAuv(_)));
    }

    #[test]
    fn strict_mode_blocks_on_missing_seo_canonical() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("reports/seo")).unwrap();
        std::fs::write(
            dir.path().join("reports/seo/audit.json"),
            serde_json::json!({
                "broken_links": 0,
                "canonical_coverage_pct": 50.0,
                "missing_meta_tags": [],
                "missing_og_tags": []
            })
            .to_string(),
        )
        .unwrap();
        let manifest = manifest_with("seo-auv", vec![]);
        let opts = CheckOptions {
            strict: true,
            domains: Some(vec![Domain::Seo]),
            ..Default::default()
        };
        let result = check("seo-auv", dir.path(), &manifest, &opts).unwrap();
        assert!(!result.passed);
        let seo_detail = result.details.iter().find(|d| d.check == "seo").unwrap();
        assert_eq!(seo_detail.exit_code, 307);
    }

    #[test]
    fn auto_detects_data_domain_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("insights.json"),
            serde_json::json!({ "row_count": 10, "metric_count": 2, "checksum_manifest": ["a"] }).to_string(),
        )
        .unwrap();
        let manifest = manifest_with("data-auv", vec![]);
        let opts = CheckOptions {
            strict: true,
            domains: None,
            ..Default::default()
        };
        let result = check("data-auv", dir.path(), &manifest, &opts).unwrap();
        assert!(result.passed);
        assert!(result.details.iter().any(|d| d.check == "data"));
    }
}
