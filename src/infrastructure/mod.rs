//! Infrastructure layer: adapters for external dependencies (logging,
//! schema validation at file boundaries).
//!
//! Durable storage for run state, the job queue, and tenant artifacts lives
//! under the crate's own `queue`, `graph`, and `tenant` modules instead of
//! here, since those are core to this engine rather than swappable
//! adapters.

pub mod logging;
pub mod schema;
