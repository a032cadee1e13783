//! Per-executor circuit breaker.
//!
//! Scoped to a node type or a resource tag rather than to a task chain or
//! agent: repeated executor failures for `browser-test` nodes, say, should
//! stop burning worker slots on more `browser-test` nodes while leaving
//! unrelated node types running.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
    pub success_threshold: u32,
    pub failure_window: Duration,
    pub enabled: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::minutes(2),
            success_threshold: 2,
            failure_window: Duration::minutes(10),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// What a circuit is scoped to. A node-type circuit governs one executor
/// kind (e.g. `browser-test`); a resource-tag circuit governs one mutual
/// exclusion tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CircuitScope {
    NodeType(String),
    ResourceTag(String),
}

impl CircuitScope {
    pub fn node_type(node_type: impl Into<String>) -> Self {
        Self::NodeType(node_type.into())
    }

    pub fn resource_tag(tag: impl Into<String>) -> Self {
        Self::ResourceTag(tag.into())
    }
}

#[derive(Debug, Clone)]
struct FailureRecord {
    timestamp: DateTime<Utc>,
    error: String,
}

#[derive(Debug, Clone)]
struct CircuitBreaker {
    state: CircuitState,
    failures: Vec<FailureRecord>,
    half_open_successes: u32,
    opened_at: Option<DateTime<Utc>>,
    open_count: u32,
}

impl CircuitBreaker {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: Vec::new(),
            half_open_successes: 0,
            opened_at: None,
            open_count: 0,
        }
    }

    fn record_failure(&mut self, error: String, config: &CircuitBreakerConfig) {
        self.failures.push(FailureRecord {
            timestamp: Utc::now(),
            error,
        });
        let cutoff = Utc::now() - config.failure_window;
        self.failures.retain(|f| f.timestamp > cutoff);

        if self.state == CircuitState::HalfOpen
            || (self.state == CircuitState::Closed
                && self.failures.len() as u32 >= config.failure_threshold)
        {
            self.open();
        }
    }

    fn record_success(&mut self, config: &CircuitBreakerConfig) {
        if self.state == CircuitState::HalfOpen {
            self.half_open_successes += 1;
            if self.half_open_successes >= config.success_threshold {
                self.close();
            }
        }
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Utc::now());
        self.half_open_successes = 0;
        self.open_count += 1;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.opened_at = None;
        self.half_open_successes = 0;
        self.failures.clear();
    }

    fn allows(&mut self, config: &CircuitBreakerConfig) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let Some(opened_at) = self.opened_at else {
                    return false;
                };
                if Utc::now() > opened_at + config.open_timeout {
                    self.state = CircuitState::HalfOpen;
                    self.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CircuitCheckResult {
    Allowed,
    Blocked {
        opened_at: DateTime<Utc>,
        retry_after: DateTime<Utc>,
    },
}

impl CircuitCheckResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CircuitStats {
    pub scope: String,
    pub state: &'static str,
    pub failure_count: usize,
    pub open_count: u32,
}

/// Tracks one circuit per (node type, resource tag) the runner has seen.
/// Shared across the worker pool via `Arc`.
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    circuits: Arc<RwLock<HashMap<CircuitScope, CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn check(&self, scope: CircuitScope) -> CircuitCheckResult {
        if !self.config.enabled {
            return CircuitCheckResult::Allowed;
        }
        let mut circuits = self.circuits.write().await;
        let circuit = circuits.entry(scope).or_insert_with(CircuitBreaker::new);
        if circuit.allows(&self.config) {
            CircuitCheckResult::Allowed
        } else {
            let opened_at = circuit.opened_at.unwrap_or_else(Utc::now);
            CircuitCheckResult::Blocked {
                opened_at,
                retry_after: opened_at + self.config.open_timeout,
            }
        }
    }

    pub async fn record_failure(&self, scope: CircuitScope, error: impl Into<String>) {
        if !self.config.enabled {
            return;
        }
        let mut circuits = self.circuits.write().await;
        circuits
            .entry(scope)
            .or_insert_with(CircuitBreaker::new)
            .record_failure(error.into(), &self.config);
    }

    pub async fn record_success(&self, scope: CircuitScope) {
        if !self.config.enabled {
            return;
        }
        let mut circuits = self.circuits.write().await;
        if let Some(circuit) = circuits.get_mut(&scope) {
            circuit.record_success(&self.config);
        }
    }

    pub async fn stats(&self) -> Vec<CircuitStats> {
        let circuits = self.circuits.read().await;
        circuits
            .iter()
            .map(|(scope, circuit)| CircuitStats {
                scope: match scope {
                    CircuitScope::NodeType(t) => format!("node_type:{t}"),
                    CircuitScope::ResourceTag(t) => format!("resource_tag:{t}"),
                },
                state: match circuit.state {
                    CircuitState::Closed => "closed",
                    CircuitState::Open => "open",
                    CircuitState::HalfOpen => "half_open",
                },
                failure_count: circuit.failures.len(),
                open_count: circuit.open_count,
            })
            .collect()
    }
}
