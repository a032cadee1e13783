//! The executor registry: one implementation per node type, each a
//! deterministic local stand-in producing the artifact shapes the
//! CVF validators expect. The runner dispatches by `NodeParams::node_type`
//! and never inspects an executor's internals.

mod artifact_io;
mod domain_executors;
mod subagent;
mod test_executors;

use std::sync::Arc;

use crate::domain::ports::Executor;
use crate::graph::ExecutorRegistry;

pub use domain_executors::{
    AudioTtsExecutor, ChartRenderExecutor, DataIngestExecutor, DataInsightsExecutor, DbMigrationExecutor, SeoAuditExecutor,
    VideoComposeExecutor,
};
pub use subagent::{SubagentGatewayExecutor, WorkSimulationExecutor};
pub use test_executors::{
    ApiTestExecutor, BrowserTestExecutor, PerfAuditExecutor, SecretsScanExecutor, SecurityScanExecutor, ServerExecutor,
    VisualCaptureExecutor, VisualCompareExecutor,
};

/// Build the default registry with every node type wired to its stand-in
/// implementation.
pub fn build_registry() -> ExecutorRegistry {
    let mut registry: ExecutorRegistry = ExecutorRegistry::new();
    registry.insert("server", Arc::new(ServerExecutor) as Arc<dyn Executor>);
    registry.insert("browser-test", Arc::new(BrowserTestExecutor));
    registry.insert("api-test", Arc::new(ApiTestExecutor));
    registry.insert("perf-audit", Arc::new(PerfAuditExecutor));
    registry.insert("visual-capture", Arc::new(VisualCaptureExecutor));
    registry.insert("visual-compare", Arc::new(VisualCompareExecutor));
    registry.insert("security.scan", Arc::new(SecurityScanExecutor));
    registry.insert("secrets.scan", Arc::new(SecretsScanExecutor));
    registry.insert("data.ingest", Arc::new(DataIngestExecutor));
    registry.insert("data.insights", Arc::new(DataInsightsExecutor));
    registry.insert("chart.render", Arc::new(ChartRenderExecutor));
    registry.insert("audio.tts", Arc::new(AudioTtsExecutor));
    registry.insert("video.compose", Arc::new(VideoComposeExecutor));
    registry.insert("seo.audit", Arc::new(SeoAuditExecutor));
    registry.insert("db.migration", Arc::new(DbMigrationExecutor));
    registry.insert("subagent-gateway", Arc::new(SubagentGatewayExecutor));
    registry.insert("work_simulation", Arc::new(WorkSimulationExecutor));
    registry
}
