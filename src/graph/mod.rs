//! The dependency-aware graph runner.
//!
//! `dag` holds pure graph algorithms (topological order, cycle detection,
//! execution waves); `state_store` persists run state atomically;
//! `circuit_breaker` is the additive per-node-type failure circuit;
//! `runner` ties them together into the bounded-concurrency scheduler.

pub mod circuit_breaker;
pub mod dag;
pub mod runner;
pub mod state_store;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry, CircuitScope};
pub use dag::{execution_waves, topological_order};
pub use runner::{ExecutorRegistry, GraphRunner, RunOptions, RunOutcome};
pub use state_store::{new_run_id, FsRunStateStore};
