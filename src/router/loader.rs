//! Loads `registry.yaml`/`policies.yaml` from a project root into a
//! [`ToolRegistry`]/[`PolicyBundle`] pair. Schema-validates each file before deserializing into the
//! typed struct, then runs [`super::validate::validate`] across both,
//! returning its orphan-tool warnings to the caller.
//!
//! A deployment with no `registry.yaml`/`policies.yaml` at its project root
//! gets an empty registry and an empty policy bundle: every capability
//! request is then rejected for lack of candidates rather than silently
//! routed: the router is fail-closed by default when unconfigured.

use std::path::{Path, PathBuf};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::policy::PolicyBundle;
use crate::domain::models::tool::ToolRegistry;
use crate::infrastructure::schema::{policy_schema, registry_schema, validate_against_schema};

use super::validate;

/// Load, schema-validate, and cross-validate the registry and policy bundle
/// for `project_root`. Returns the pair plus any orphan-tool warnings.
pub fn load(project_root: &Path) -> DomainResult<(ToolRegistry, PolicyBundle, Vec<String>)> {
    let registry = load_registry(&project_root.join("registry.yaml"))?;
    let policies = load_policies(&project_root.join("policies.yaml"))?;
    let warnings = validate(&registry, &policies)?;
    Ok((registry, policies, warnings))
}

fn load_registry(path: &PathBuf) -> DomainResult<ToolRegistry> {
    let Ok(bytes) = std::fs::read(path) else {
        return Ok(ToolRegistry::default());
    };
    let value: serde_json::Value = serde_yaml::from_slice(&bytes).map_err(|e| schema_err("registry.yaml", &e.to_string()))?;
    if let Err(errors) = validate_against_schema(&registry_schema(), &value) {
        return Err(schema_err("registry.yaml", &errors.join("; ")));
    }
    serde_json::from_value(value).map_err(|e| schema_err("registry.yaml", &e.to_string()))
}

fn load_policies(path: &PathBuf) -> DomainResult<PolicyBundle> {
    let Ok(bytes) = std::fs::read(path) else {
        return Ok(PolicyBundle::empty());
    };
    let value: serde_json::Value = serde_yaml::from_slice(&bytes).map_err(|e| schema_err("policies.yaml", &e.to_string()))?;
    if let Err(errors) = validate_against_schema(&policy_schema(), &value) {
        return Err(schema_err("policies.yaml", &errors.join("; ")));
    }
    serde_json::from_value(value).map_err(|e| schema_err("policies.yaml", &e.to_string()))
}

fn schema_err(subject: &str, detail: &str) -> DomainError {
    DomainError::SchemaError {
        subject: subject.to_string(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_default_to_empty_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, policies, warnings) = load(dir.path()).unwrap();
        assert!(registry.tools.is_empty());
        assert!(policies.capability_map.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn malformed_registry_is_rejected_at_load_time() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("registry.yaml"), "tools:\n  playwright:\n    id: playwright\n").unwrap();

        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, DomainError::SchemaError { .. }));
    }

    #[test]
    fn well_formed_files_load_and_cross_validate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("registry.yaml"),
            "tools:\n  playwright:\n    id: playwright\n    tier: primary\n    capabilities: [browser.automation]\n    cost_model:\n      kind: flat_per_run\n      usd: 0.0\n    api_key_env: null\n    side_effects: []\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("policies.yaml"),
            "capability_map:\n  browser.automation: [playwright]\ntier_defaults:\n  prefer_tier: primary\n  default_budget_usd: 1.0\n  secondary_default_budget_usd: 0.5\n  require_secondary_consent: true\nagents: {}\ntenants: {}\nsafety:\n  allow_production_mutations: false\n  require_test_mode_for: []\nsecondary:\n  budget_overrides: {}\n",
        )
        .unwrap();

        let (registry, policies, warnings) = load(dir.path()).unwrap();
        assert!(registry.contains("playwright"));
        assert_eq!(policies.candidates_for("browser.automation"), ["playwright"]);
        assert!(warnings.is_empty());
    }
}
