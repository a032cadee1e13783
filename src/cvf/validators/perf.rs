//! Performance budget validator, reading the `perf-audit` executor's
//! lighthouse-like report.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;

/// Per-metric budget, expressed as the maximum allowed value. Metrics not
/// listed here are not enforced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerfBudget {
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerfViolation {
    pub metric: String,
    pub budget: f64,
    pub actual: f64,
    pub overage_pct: f64,
}

/// Parse a `lighthouse.json`-like artifact and compare its headline
/// metrics against `budget`, returning every metric that overages.
pub fn evaluate(path: &Path, budget: &PerfBudget) -> DomainResult<Vec<PerfViolation>> {
    let bytes = std::fs::read(path)?;
    let report: serde_json::Value = serde_json::from_slice(&bytes)?;

    let score = report
        .pointer("/categories/performance/score")
        .and_then(serde_json::Value::as_f64);
    if score.is_none() {
        return Err(crate::domain::errors::DomainError::CvfValidatorFailed {
            domain: "perf".into(),
            detail: format!("{} is missing categories.performance.score", path.display()),
        });
    }

    let mut violations = Vec::new();
    for (metric, &max_allowed) in &budget.metrics {
        let pointer = format!("/audits/{metric}/numericValue");
        if let Some(actual) = report.pointer(&pointer).and_then(serde_json::Value::as_f64) {
            if actual > max_allowed {
                let overage_pct = ((actual - max_allowed) / max_allowed) * 100.0;
                violations.push(PerfViolation {
                    metric: metric.clone(),
                    budget: max_allowed,
                    actual,
                    overage_pct,
                });
            }
        }
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_metric_over_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lighthouse.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "categories": { "performance": { "score": 0.8 } },
                "audits": { "largest-contentful-paint": { "numericValue": 4000.0 } }
            })
            .to_string(),
        )
        .unwrap();

        let mut budget = PerfBudget::default();
        budget.metrics.insert("largest-contentful-paint".into(), 2500.0);

        let violations = evaluate(&path, &budget).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].overage_pct > 0.0);
    }

    #[test]
    fn missing_performance_score_is_a_validator_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lighthouse.json");
        std::fs::write(&path, serde_json::json!({ "categories": {} }).to_string()).unwrap();
        let err = evaluate(&path, &PerfBudget::default()).unwrap_err();
        assert!(matches!(err, crate::domain::errors::DomainError::CvfValidatorFailed { .. }));
    }
}
