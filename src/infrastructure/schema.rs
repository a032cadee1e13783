//! JSON Schema validation for file-boundary documents: the tool registry
//! and policy bundle loaded at startup, and the tenant status snapshot
//! written by `engine emit-status`. Schemas are intentionally loose about nested
//! tagged-enum shapes (cost model, fallback strategy) and strict about the
//! envelope every document must carry, so a malformed file is caught
//! before it reaches `serde_json::from_value`, without the schema and the
//! Rust types drifting out of lockstep on every new variant.

use jsonschema::JSONSchema;
use serde_json::{json, Value};

/// Validate `instance` against `schema`, returning the validator's error
/// messages joined into one string per failure.
pub fn validate_against_schema(schema: &Value, instance: &Value) -> Result<(), Vec<String>> {
    let compiled = JSONSchema::compile(schema).expect("schema constants are well-formed JSON Schema");
    let result = compiled.validate(instance);
    if let Err(errors) = result {
        Err(errors.map(|e| e.to_string()).collect())
    } else {
        Ok(())
    }
}

/// Shape of `registry.yaml`.
pub fn registry_schema() -> Value {
    json!({
        "type": "object",
        "required": ["tools"],
        "properties": {
            "tools": {
                "type": "object",
                "additionalProperties": {
                    "type": "object",
                    "required": ["id", "tier", "capabilities", "cost_model", "side_effects"],
                    "properties": {
                        "id": { "type": "string", "minLength": 1 },
                        "tier": { "enum": ["primary", "secondary"] },
                        "capabilities": { "type": "array", "items": { "type": "string" } },
                        "cost_model": { "type": "object" },
                        "api_key_env": { "type": ["string", "null"] },
                        "side_effects": { "type": "array" }
                    }
                }
            }
        }
    })
}

/// Shape of `policies.yaml`.
pub fn policy_schema() -> Value {
    json!({
        "type": "object",
        "required": ["capability_map", "tier_defaults", "agents", "tenants", "safety", "secondary"],
        "properties": {
            "capability_map": {
                "type": "object",
                "additionalProperties": { "type": "array", "items": { "type": "string" } }
            },
            "tier_defaults": {
                "type": "object",
                "required": ["default_budget_usd", "secondary_default_budget_usd", "require_secondary_consent"],
                "properties": {
                    "prefer_tier": { "enum": ["primary", "secondary", null] },
                    "default_budget_usd": { "type": "number" },
                    "secondary_default_budget_usd": { "type": "number" },
                    "require_secondary_consent": { "type": "boolean" }
                }
            },
            "agents": { "type": "object" },
            "tenants": {
                "type": "object",
                "additionalProperties": {
                    "type": "object",
                    "required": ["budget_ceiling_usd", "allowed_capabilities"],
                    "properties": {
                        "budget_ceiling_usd": { "type": "number" },
                        "allowed_capabilities": { "type": "array", "items": { "type": "string" } }
                    }
                }
            },
            "safety": { "type": "object" },
            "secondary": { "type": "object" },
            "on_missing_primary": { "type": "object" }
        }
    })
}

/// Shape of `reports/status.json`, the tenant-aware status snapshot.
pub fn status_schema() -> Value {
    json!({
        "type": "object",
        "required": ["tenant", "generated_at", "queue"],
        "properties": {
            "tenant": { "type": "string", "minLength": 1 },
            "generated_at": { "type": "string" },
            "queue": {
                "type": "object",
                "required": ["waiting", "active", "completed", "failed", "cancelled", "paused", "is_paused"],
                "properties": {
                    "waiting": { "type": "integer", "minimum": 0 },
                    "active": { "type": "integer", "minimum": 0 },
                    "completed": { "type": "integer", "minimum": 0 },
                    "failed": { "type": "integer", "minimum": 0 },
                    "cancelled": { "type": "integer", "minimum": 0 },
                    "paused": { "type": "integer", "minimum": 0 },
                    "is_paused": { "type": "boolean" }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_is_valid() {
        let instance = json!({ "tools": {} });
        assert!(validate_against_schema(&registry_schema(), &instance).is_ok());
    }

    #[test]
    fn registry_tool_missing_tier_is_rejected() {
        let instance = json!({
            "tools": {
                "playwright": {
                    "id": "playwright",
                    "capabilities": ["browser.automation"],
                    "cost_model": { "kind": "flat_per_run", "usd": 0.0 },
                    "side_effects": []
                }
            }
        });
        assert!(validate_against_schema(&registry_schema(), &instance).is_err());
    }

    #[test]
    fn well_formed_policy_bundle_is_valid() {
        let instance = json!({
            "capability_map": { "browser.automation": ["playwright"] },
            "tier_defaults": {
                "prefer_tier": "primary",
                "default_budget_usd": 1.0,
                "secondary_default_budget_usd": 0.5,
                "require_secondary_consent": true
            },
            "agents": {},
            "tenants": {},
            "safety": { "allow_production_mutations": false, "require_test_mode_for": [] },
            "secondary": { "budget_overrides": {} }
        });
        assert!(validate_against_schema(&policy_schema(), &instance).is_ok());
    }

    #[test]
    fn status_snapshot_matches_emitted_shape() {
        let instance = json!({
            "tenant": "acme",
            "generated_at": "2026-01-01T00:00:00Z",
            "queue": {
                "waiting": 1, "active": 0, "completed": 2, "failed": 0,
                "cancelled": 0, "paused": 0, "is_paused": false
            }
        });
        assert!(validate_against_schema(&status_schema(), &instance).is_ok());
    }
}
