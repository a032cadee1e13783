//! Graph spec model.
//!
//! Each node type is a tagged variant with its own parameter struct, rather
//! than a polymorphic hierarchy; the runner only ever needs `dependencies`,
//! `timeout`, `resource_tags`, and `attempts` off the envelope.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use uuid::Uuid;

/// Executor node types known to the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeParams {
    Server {
        port: Option<u16>,
    },
    BrowserTest {
        spec_path: String,
    },
    ApiTest {
        spec_path: String,
    },
    PerfAudit {
        target_url: String,
    },
    VisualCapture {
        routes: Vec<String>,
    },
    VisualCompare {
        baseline_dir: String,
    },
    SecurityScan {
        target: String,
    },
    SecretsScan {
        paths: Vec<String>,
    },
    DataIngest {
        source: String,
    },
    DataInsights {
        dataset: String,
    },
    ChartRender {
        dataset: String,
    },
    AudioTts {
        script: String,
    },
    VideoCompose {
        clips: Vec<String>,
    },
    SeoAudit {
        urls: Vec<String>,
    },
    DbMigration {
        migrations_dir: String,
    },
    SubagentGateway {
        agent_id: String,
        requested_capabilities: Vec<String>,
    },
    WorkSimulation {
        duration_ms: u64,
    },
}

impl NodeParams {
    /// The executor registry dispatch key for this node's type.
    pub fn node_type(&self) -> &'static str {
        match self {
            NodeParams::Server { .. } => "server",
            NodeParams::BrowserTest { .. } => "browser-test",
            NodeParams::ApiTest { .. } => "api-test",
            NodeParams::PerfAudit { .. } => "perf-audit",
            NodeParams::VisualCapture { .. } => "visual-capture",
            NodeParams::VisualCompare { .. } => "visual-compare",
            NodeParams::SecurityScan { .. } => "security.scan",
            NodeParams::SecretsScan { .. } => "secrets.scan",
            NodeParams::DataIngest { .. } => "data.ingest",
            NodeParams::DataInsights { .. } => "data.insights",
            NodeParams::ChartRender { .. } => "chart.render",
            NodeParams::AudioTts { .. } => "audio.tts",
            NodeParams::VideoCompose { .. } => "video.compose",
            NodeParams::SeoAudit { .. } => "seo.audit",
            NodeParams::DbMigration { .. } => "db.migration",
            NodeParams::SubagentGateway { .. } => "subagent-gateway",
            NodeParams::WorkSimulation { .. } => "work_simulation",
        }
    }
}

/// One node in a graph spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: Uuid,
    /// Human-readable label, used in logs and reports.
    #[serde(default)]
    pub label: Option<String>,
    pub params: NodeParams,
    #[serde(default)]
    pub dependencies: BTreeSet<Uuid>,
    /// Mutual-exclusion tags; nodes sharing a tag never run concurrently
    /// within one runner.
    #[serde(default)]
    pub resource_tags: BTreeSet<String>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

impl NodeSpec {
    pub fn effective_timeout(&self, graph_default_ms: u64) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(graph_default_ms))
    }

    pub fn effective_max_retries(&self, graph_default: u32) -> u32 {
        self.max_retries.unwrap_or(graph_default)
    }
}

/// The top-level graph spec loaded from a project's graph file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSpec {
    pub project_id: String,
    pub default_timeout_ms: u64,
    pub default_max_retries: u32,
    pub nodes: Vec<NodeSpec>,
}

impl GraphSpec {
    /// Validate structural invariants that must hold before scheduling:
    /// no duplicate node ids, no dependency on a non-existent node.
    /// Cycle detection lives in `graph::dag` since it needs the full
    /// adjacency structure.
    pub fn validate_structure(&self) -> Result<(), crate::domain::DomainError> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(crate::domain::DomainError::SchemaError {
                    subject: "graph".into(),
                    detail: format!("duplicate node id {}", node.id),
                });
            }
        }
        for node in &self.nodes {
            for dep in &node.dependencies {
                if !seen.contains(dep) {
                    return Err(crate::domain::DomainError::SchemaError {
                        subject: "graph".into(),
                        detail: format!(
                            "node {} depends on non-existent node {}",
                            node.id, dep
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: Uuid, deps: &[Uuid]) -> NodeSpec {
        NodeSpec {
            id,
            label: None,
            params: NodeParams::WorkSimulation { duration_ms: 1 },
            dependencies: deps.iter().copied().collect(),
            resource_tags: BTreeSet::new(),
            timeout_ms: None,
            max_retries: None,
        }
    }

    #[test]
    fn node_type_matches_the_executor_registry_keys() {
        assert_eq!(NodeParams::Server { port: None }.node_type(), "server");
        assert_eq!(NodeParams::DataIngest { source: "s".into() }.node_type(), "data.ingest");
        assert_eq!(NodeParams::SubagentGateway { agent_id: "a".into(), requested_capabilities: vec![] }.node_type(), "subagent-gateway");
    }

    #[test]
    fn effective_timeout_and_retries_fall_back_to_graph_defaults() {
        let n = node(Uuid::from_u128(1), &[]);
        assert_eq!(n.effective_timeout(5000), Duration::from_millis(5000));
        assert_eq!(n.effective_max_retries(2), 2);

        let mut overridden = node(Uuid::from_u128(2), &[]);
        overridden.timeout_ms = Some(9000);
        overridden.max_retries = Some(7);
        assert_eq!(overridden.effective_timeout(5000), Duration::from_millis(9000));
        assert_eq!(overridden.effective_max_retries(2), 7);
    }

    #[test]
    fn duplicate_node_ids_are_rejected() {
        let id = Uuid::from_u128(1);
        let graph = GraphSpec {
            project_id: "p".into(),
            default_timeout_ms: 1000,
            default_max_retries: 0,
            nodes: vec![node(id, &[]), node(id, &[])],
        };
        assert!(graph.validate_structure().is_err());
    }

    #[test]
    fn dependency_on_unknown_node_is_rejected() {
        let a = Uuid::from_u128(1);
        let ghost = Uuid::from_u128(99);
        let graph = GraphSpec {
            project_id: "p".into(),
            default_timeout_ms: 1000,
            default_max_retries: 0,
            nodes: vec![node(a, &[ghost])],
        };
        assert!(graph.validate_structure().is_err());
    }

    #[test]
    fn well_formed_graph_validates() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let graph = GraphSpec {
            project_id: "p".into(),
            default_timeout_ms: 1000,
            default_max_retries: 0,
            nodes: vec![node(a, &[]), node(b, &[a])],
        };
        assert!(graph.validate_structure().is_ok());
    }
}
