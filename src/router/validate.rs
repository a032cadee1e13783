//! Load-time validation of a tool registry and policy bundle. Run once
//! when the router is constructed, before
//! any `plan_tools` call, so `plan_tools` itself never has to handle a
//! dangling tool reference.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::policy::PolicyBundle;
use crate::domain::models::tool::ToolRegistry;

/// Check every tool-id referenced by the capability map or an agent
/// allowlist actually exists in the registry, and that every tool's
/// `api_key_env` (if set) names a plausible environment variable.
///
/// Returns orphan-tool warnings on success: tool ids the registry defines
/// but no capability map entry or agent allowlist ever references. Orphans
/// aren't an error, just dead registry weight worth flagging.
pub fn validate(registry: &ToolRegistry, policies: &PolicyBundle) -> DomainResult<Vec<String>> {
    let mut problems = Vec::new();

    let referenced = policies.referenced_tool_ids();
    for tool_id in &referenced {
        if !registry.contains(tool_id) {
            problems.push(format!("policy references unknown tool '{tool_id}'"));
        }
    }

    for (capability, candidates) in &policies.capability_map {
        if candidates.is_empty() {
            problems.push(format!("capability '{capability}' has an empty candidate list"));
        }
    }

    for tool in registry.tools.values() {
        if let Some(env_var) = &tool.api_key_env {
            if env_var.trim().is_empty() {
                problems.push(format!("tool '{}' has an empty api_key_env", tool.id));
            }
        }
        if tool.capabilities.is_empty() {
            problems.push(format!("tool '{}' declares no capabilities", tool.id));
        }
    }

    if !problems.is_empty() {
        return Err(DomainError::SchemaError {
            subject: "router policy bundle".into(),
            detail: problems.join("; "),
        });
    }

    let warnings = registry
        .tools
        .keys()
        .filter(|id| !referenced.contains(*id))
        .map(|id| format!("tool '{id}' is registered but unreferenced by any capability or allowlist"))
        .collect();
    Ok(warnings)
}
