//! `observability/hooks.jsonl` event sink.
//!
//! Grounded in `infrastructure::logging::audit::AuditLogger`: an
//! append-mode file behind a mutex, one JSON object per line, flushed
//! after every write. Generalized from a fixed `AuditEvent` shape to the
//! free-form [`ObservabilityEvent`] carrying correlation ids plus a
//! payload, since the run-event trail must accept events from the router,
//! runner, queue, and CVF gate alike.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::observability::ObservabilityEvent;
use crate::domain::ports::EventSink;

/// Append-only JSONL sink for [`ObservabilityEvent`]s. Multiple workers
/// may hold their own handle pointed at the same path; OS append
/// semantics guarantee line-boundary atomicity for writes under a few KB.
pub struct JsonlEventSink {
    path: PathBuf,
    file: Arc<Mutex<Option<std::fs::File>>>,
}

impl JsonlEventSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_open(&self) -> DomainResult<()> {
        let mut guard = self.file.lock().expect("hooks sink mutex poisoned");
        if guard.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        *guard = Some(file);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSink for JsonlEventSink {
    async fn emit(&self, event: ObservabilityEvent) -> DomainResult<()> {
        self.ensure_open()?;
        let line = serde_json::to_string(&event)?;
        let mut guard = self.file.lock().expect("hooks sink mutex poisoned");
        let file = guard.as_mut().expect("just ensured open");
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::observability::CorrelationIds;

    #[tokio::test]
    async fn appends_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observability/hooks.jsonl");
        let sink = JsonlEventSink::new(&path);

        sink.emit(ObservabilityEvent::new(
            "node.started",
            CorrelationIds {
                run_id: Some("run-1".into()),
                ..Default::default()
            },
            serde_json::json!({ "node_id": "abc" }),
        ))
        .await
        .unwrap();
        sink.emit(ObservabilityEvent::new("node.succeeded", CorrelationIds::default(), serde_json::json!({})))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let _: serde_json::Value = serde_json::from_str(line).expect("each line is valid JSON");
        }
    }
}
