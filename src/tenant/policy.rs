//! Tenant policy enforcement at enqueue time.
//!
//! Pure checks over a [`PolicyBundle`] and a job payload's constraints; no
//! I/O. The queue's submission path calls [`authorize_enqueue`] before a
//! job is durably recorded, so a rejected submission never produces a
//! side effect beyond an audit event.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::job::JobPayload;
use crate::domain::models::policy::PolicyBundle;

/// Claims asserted by an authenticated submitter: identity plus a tenant
/// claim, and whether the identity carries `queue_admin`.
#[derive(Debug, Clone)]
pub struct AuthClaims {
    pub subject: String,
    pub tenant: Option<String>,
    pub can_enqueue: bool,
    pub can_administer: bool,
}

impl AuthClaims {
    /// The unauthenticated default when `AUTH_REQUIRED` is off: every
    /// permission is implicitly granted, since auth itself is optional.
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".into(),
            tenant: None,
            can_enqueue: true,
            can_administer: true,
        }
    }
}

pub struct TenantAuthorizer;

impl TenantAuthorizer {
    /// `enqueue_jobs` gate plus the claimed-tenant-equals-job-tenant check.
    pub fn authorize_submission(claims: &AuthClaims, job_tenant: &str) -> DomainResult<()> {
        if !claims.can_enqueue {
            return Err(DomainError::PermissionDenied("missing enqueue_jobs permission".into()));
        }
        if let Some(claimed_tenant) = &claims.tenant {
            if claimed_tenant != job_tenant && !claims.can_administer {
                return Err(DomainError::PermissionDenied(format!(
                    "identity is scoped to tenant '{claimed_tenant}', cannot submit for '{job_tenant}'"
                )));
            }
        }
        Ok(())
    }

    /// `queue_admin` gate for pause/resume/cancel/clean/drain.
    pub fn authorize_admin(claims: &AuthClaims) -> DomainResult<()> {
        if !claims.can_administer {
            return Err(DomainError::PermissionDenied("missing queue_admin permission".into()));
        }
        Ok(())
    }
}

/// Pre-enqueue tenant policy checks: reject if the requested
/// budget exceeds the tenant's ceiling, or if any required capability
/// falls outside the tenant's allowed set.
pub fn authorize_enqueue(payload: &JobPayload, policies: &PolicyBundle) -> DomainResult<()> {
    let Some(ceiling) = policies.tenant_ceiling(&payload.tenant) else {
        // No ceiling configured for this tenant: nothing to enforce.
        return Ok(());
    };

    if let Some(constraints) = &payload.constraints {
        if let Some(budget) = constraints.budget_usd {
            if budget > ceiling.budget_ceiling_usd {
                return Err(DomainError::TenantPolicyViolation(format!(
                    "requested budget {budget:.2} exceeds tenant ceiling {:.2}",
                    ceiling.budget_ceiling_usd
                )));
            }
        }
        for capability in &constraints.required_capabilities {
            if !ceiling.allowed_capabilities.contains(capability) {
                return Err(DomainError::TenantPolicyViolation(format!(
                    "capability '{capability}' is not in tenant's allowed set"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::job::Constraints;
    use crate::domain::models::policy::{OnMissingPrimary, SafetyFlags, SecondaryOverrides, TenantCeiling, TierDefaults};
    use std::collections::{BTreeMap, BTreeSet};

    fn policies_with_ceiling(tenant: &str, budget: f64, allowed: &[&str]) -> PolicyBundle {
        let mut tenants = BTreeMap::new();
        tenants.insert(
            tenant.to_string(),
            TenantCeiling {
                budget_ceiling_usd: budget,
                allowed_capabilities: allowed.iter().map(|s| (*s).to_string()).collect(),
            },
        );
        PolicyBundle {
            capability_map: BTreeMap::new(),
            tier_defaults: TierDefaults {
                prefer_tier: None,
                default_budget_usd: 1.0,
                secondary_default_budget_usd: 0.5,
                require_secondary_consent: true,
            },
            agents: BTreeMap::new(),
            tenants,
            safety: SafetyFlags::default(),
            secondary: SecondaryOverrides::default(),
            on_missing_primary: OnMissingPrimary::RejectCapability,
        }
    }

    #[test]
    fn rejects_capability_outside_tenant_allowed_set() {
        let policies = policies_with_ceiling("beta-inc", 1.0, &["web.perf_audit"]);
        let payload = JobPayload {
            job_type: "run-graph".into(),
            graph_file: "graph.yaml".into(),
            tenant: "beta-inc".into(),
            run_id: None,
            priority: 0,
            constraints: Some(Constraints {
                budget_usd: None,
                required_capabilities: vec!["deploy.k8s".into()],
            }),
            env: BTreeMap::new(),
            metadata: BTreeMap::new(),
        };
        let err = authorize_enqueue(&payload, &policies).unwrap_err();
        assert!(matches!(err, DomainError::TenantPolicyViolation(_)));
    }

    #[test]
    fn rejects_budget_above_ceiling() {
        let policies = policies_with_ceiling("beta-inc", 1.0, &[]);
        let payload = JobPayload {
            job_type: "run-graph".into(),
            graph_file: "graph.yaml".into(),
            tenant: "beta-inc".into(),
            run_id: None,
            priority: 0,
            constraints: Some(Constraints {
                budget_usd: Some(5.0),
                required_capabilities: vec![],
            }),
            env: BTreeMap::new(),
            metadata: BTreeMap::new(),
        };
        let err = authorize_enqueue(&payload, &policies).unwrap_err();
        assert!(matches!(err, DomainError::TenantPolicyViolation(_)));
    }

    #[test]
    fn tenant_without_ceiling_passes() {
        let policies = policies_with_ceiling("beta-inc", 1.0, &[]);
        let payload = JobPayload {
            job_type: "run-graph".into(),
            graph_file: "graph.yaml".into(),
            tenant: "gamma-inc".into(),
            run_id: None,
            priority: 0,
            constraints: Some(Constraints {
                budget_usd: Some(500.0),
                required_capabilities: vec!["anything".into()],
            }),
            env: BTreeMap::new(),
            metadata: BTreeMap::new(),
        };
        assert!(authorize_enqueue(&payload, &policies).is_ok());
    }
}
