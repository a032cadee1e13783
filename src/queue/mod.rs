//! The persistent, multi-tenant job queue: SQLite-backed broker, worker
//! claim/lock/renew loop, and the admin surface used by
//! `engine pause/resume/cancel/clean/metrics`.

pub mod connection;
pub mod repository;
pub mod worker;

pub use connection::{connect, migrate};
pub use repository::{recover_stalled, SqliteJobRepository};
pub use worker::{QueueAdmin, QueueMetrics, Worker, WorkerConfig};
