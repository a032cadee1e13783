//! Maps domain outcomes to the process exit codes scripts branch on.

use crate::cvf::CheckDetail;
use crate::domain::errors::DomainError;

pub const SUCCESS: i32 = 0;
pub const GENERIC_FAILURE: i32 = 1;
pub const USAGE_ERROR: i32 = 2;
pub const BROWSER_TESTS_FAILED: i32 = 101;
pub const PERF_AUDIT_FAILED: i32 = 102;
pub const CVF_GATE_FAILED: i32 = 103;
pub const VISUAL_REGRESSION: i32 = 303;
pub const BROKER_UNAVAILABLE: i32 = 401;
pub const PERMISSION_DENIED: i32 = 405;
pub const RESUME_MISSING: i32 = 406;
pub const JOB_CANCELLED: i32 = 407;
pub const JOB_TIMEOUT: i32 = 408;
pub const INVALID_PAYLOAD: i32 = 409;

/// Exit code for a graph-run or AUV failure.
pub fn for_domain_error(err: &DomainError) -> i32 {
    match err {
        DomainError::UsageError(_) | DomainError::SchemaError { .. } | DomainError::CycleDetected(_) => USAGE_ERROR,
        DomainError::PermissionDenied(_) | DomainError::TenantPolicyViolation(_) => PERMISSION_DENIED,
        DomainError::ResumeStateMissing(_) => RESUME_MISSING,
        DomainError::JobCancelled(_) => JOB_CANCELLED,
        DomainError::JobTimeout(_) => JOB_TIMEOUT,
        DomainError::BrokerUnavailable(_) => BROKER_UNAVAILABLE,
        DomainError::CvfArtifactMissing { .. } | DomainError::CvfValidatorFailed { .. } | DomainError::UnknownAuv(_) => {
            CVF_GATE_FAILED
        }
        _ => GENERIC_FAILURE,
    }
}

/// Exit code for a failed `check` result: the first failing detail's own
/// class if it is one of the domain-validator/perf/visual codes, else the
/// generic CVF gate code.
pub fn for_check_details(details: &[CheckDetail]) -> i32 {
    details
        .iter()
        .find(|d| !d.passed)
        .map(|d| i32::from(d.exit_code))
        .unwrap_or(CVF_GATE_FAILED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_missing_maps_to_its_own_code() {
        assert_eq!(for_domain_error(&DomainError::ResumeStateMissing("RUN-1".into())), RESUME_MISSING);
    }

    #[test]
    fn cvf_errors_map_to_gate_failed() {
        assert_eq!(
            for_domain_error(&DomainError::CvfArtifactMissing {
                auv_id: "AUV-0001".into(),
                path: "report.json".into(),
            }),
            CVF_GATE_FAILED
        );
        assert_eq!(for_domain_error(&DomainError::UnknownAuv("AUV-9999".into())), CVF_GATE_FAILED);
    }

    #[test]
    fn unclassified_errors_fall_back_to_generic_failure() {
        assert_eq!(for_domain_error(&DomainError::DatabaseError("connection reset".into())), GENERIC_FAILURE);
    }

    #[test]
    fn all_details_passing_returns_gate_failed_as_unreachable_default() {
        let details = vec![CheckDetail {
            check: "lighthouse".into(),
            passed: true,
            exit_code: 0,
            message: "ok".into(),
        }];
        assert_eq!(for_check_details(&details), CVF_GATE_FAILED);
    }

    #[test]
    fn first_failing_detail_determines_the_code() {
        let details = vec![
            CheckDetail {
                check: "lighthouse".into(),
                passed: true,
                exit_code: 0,
                message: "ok".into(),
            },
            CheckDetail {
                check: "visual".into(),
                passed: false,
                exit_code: VISUAL_REGRESSION as u16,
                message: "diff exceeds threshold".into(),
            },
        ];
        assert_eq!(for_check_details(&details), VISUAL_REGRESSION);
    }
}
