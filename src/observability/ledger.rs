//! `observability/ledgers/<session>.jsonl` spend ledger sink.
//!
//! One file per session, same append-only JSONL discipline as
//! [`super::hooks::JsonlEventSink`]. Kept as a distinct sink (rather than
//! routing spend events through the general event sink) because the
//! router's decision record and the ledger serve different audiences: the
//! ledger is a flat, per-session cost trail meant to be summed directly.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::observability::SpendLedgerEvent;
use crate::domain::ports::LedgerSink;

pub struct JsonlLedgerSink {
    root: PathBuf,
    open_files: Mutex<std::collections::HashMap<String, std::fs::File>>,
}

impl JsonlLedgerSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            open_files: Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.root.join("ledgers").join(format!("{session_id}.jsonl"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl LedgerSink for JsonlLedgerSink {
    async fn record(&self, event: SpendLedgerEvent) -> DomainResult<()> {
        let path = self.path_for(&event.session_id);
        let line = serde_json::to_string(&event)?;

        let mut guard = self.open_files.lock().expect("ledger sink mutex poisoned");
        if !guard.contains_key(&event.session_id) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            guard.insert(event.session_id.clone(), file);
        }
        let file = guard.get_mut(&event.session_id).expect("just inserted");
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }
}

/// Sum the total estimated cost recorded for a session, by replaying its
/// ledger file. Used by `engine metrics` and tenant budget reporting.
pub fn session_total_usd(root: &Path, session_id: &str) -> DomainResult<f64> {
    let path = root.join("ledgers").join(format!("{session_id}.jsonl"));
    if !path.exists() {
        return Ok(0.0);
    }
    let contents = std::fs::read_to_string(path)?;
    let mut total = 0.0;
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let event: SpendLedgerEvent = serde_json::from_str(line)?;
        total += event.estimated_cost_usd;
    }
    Ok(total)
}
