//! Append-only observability trail.
//!
//! One emitter, one consumer per tailer: no log framework here, just
//! line-buffered JSONL under OS append semantics. `hooks` is the run-event
//! trail (`observability/hooks.jsonl`); `ledger` is the per-session spend
//! ledger (`observability/ledgers/<session>.jsonl`).

pub mod hooks;
pub mod ledger;

pub use hooks::JsonlEventSink;
pub use ledger::JsonlLedgerSink;
