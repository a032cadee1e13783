//! Domain layer for the durable orchestration engine.
//!
//! Pure business logic and data model: no I/O, no `tokio`, no `sqlx`. The
//! rest of the crate (`router`, `graph`, `queue`, `executors`, `cvf`,
//! `tenant`, `observability`) builds on top of these types and the `ports`
//! traits without the domain layer ever depending back on them.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, FailureClass};
