//! Swarm1 durable orchestration engine.
//!
//! The core of the system: a dependency-aware graph runner
//! ([`graph`]), a capability-governed tool router ([`router`]), a durable
//! multi-tenant job queue ([`queue`]), an evidence gate ([`cvf`]), and the
//! tenant/observability/auth scaffolding they all sit on. The CLI
//! ([`cli`]) is thin glue over this core: an external collaborator of
//! the engine rather than the engine itself.

pub mod auth;
pub mod cli;
pub mod config;
pub mod cvf;
pub mod domain;
pub mod executors;
pub mod graph;
pub mod infrastructure;
pub mod observability;
pub mod queue;
pub mod router;
pub mod tenant;

pub use domain::errors::{DomainError, DomainResult};
