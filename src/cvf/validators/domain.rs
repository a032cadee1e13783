//! Domain-specific validators (exit-code classes 305-309): data, charts,
//! seo, media, db. Each returns `Ok(None)` when it passes or
//! `Ok(Some(message))` naming the first violation found.

use std::path::Path;

use serde::Deserialize;

use crate::domain::errors::DomainResult;

/// Exit-code class a domain validator maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainCode {
    Data = 305,
    Charts = 306,
    Seo = 307,
    Media = 308,
    Db = 309,
}

#[derive(Debug, Deserialize)]
struct DataInsights {
    row_count: u64,
    metric_count: u64,
    #[serde(default)]
    checksum_manifest: Vec<String>,
}

pub fn evaluate_data(path: &Path) -> DomainResult<Option<String>> {
    let insights: DataInsights = serde_json::from_slice(&std::fs::read(path)?)?;
    if insights.row_count == 0 {
        return Ok(Some("data insights report zero rows".into()));
    }
    if insights.metric_count == 0 {
        return Ok(Some("data insights report zero metrics".into()));
    }
    if insights.checksum_manifest.is_empty() {
        return Ok(Some("data insights missing checksum manifest".into()));
    }
    Ok(None)
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    width: u32,
    height: u32,
    #[serde(default)]
    distinct_colors: u32,
}

pub fn evaluate_charts(path: &Path) -> DomainResult<Option<String>> {
    let meta: ChartMeta = serde_json::from_slice(&std::fs::read(path)?)?;
    if meta.width < 200 || meta.height < 150 {
        return Ok(Some(format!("chart dimensions too small: {}x{}", meta.width, meta.height)));
    }
    if meta.distinct_colors < 2 {
        return Ok(Some("chart content lacks diversity (single color)".into()));
    }
    Ok(None)
}

#[derive(Debug, Deserialize)]
struct SeoAudit {
    broken_links: u32,
    canonical_coverage_pct: f64,
    #[serde(default)]
    missing_meta_tags: Vec<String>,
    #[serde(default)]
    missing_og_tags: Vec<String>,
}

pub fn evaluate_seo(path: &Path) -> DomainResult<Option<String>> {
    let audit: SeoAudit = serde_json::from_slice(&std::fs::read(path)?)?;
    if audit.broken_links > 0 {
        return Ok(Some(format!("{} broken links found", audit.broken_links)));
    }
    if audit.canonical_coverage_pct < 100.0 {
        return Ok(Some(format!("canonical coverage at {:.1}%", audit.canonical_coverage_pct)));
    }
    if !audit.missing_meta_tags.is_empty() {
        return Ok(Some(format!("missing required meta tags: {}", audit.missing_meta_tags.join(", "))));
    }
    if !audit.missing_og_tags.is_empty() {
        return Ok(Some(format!("missing required OG tags: {}", audit.missing_og_tags.join(", "))));
    }
    Ok(None)
}

#[derive(Debug, Deserialize)]
struct MediaComposition {
    expected_duration_s: f64,
    actual_duration_s: f64,
    has_audio_track: bool,
    resolution: (u32, u32),
}

pub fn evaluate_media(path: &Path) -> DomainResult<Option<String>> {
    let media: MediaComposition = serde_json::from_slice(&std::fs::read(path)?)?;
    let variance_pct = ((media.actual_duration_s - media.expected_duration_s).abs() / media.expected_duration_s) * 100.0;
    if variance_pct > 5.0 {
        return Ok(Some(format!("duration variance {variance_pct:.1}% exceeds 5%")));
    }
    if !media.has_audio_track {
        return Ok(Some("media composition has no audio track".into()));
    }
    if media.resolution.0 < 1280 || media.resolution.1 < 720 {
        return Ok(Some(format!("resolution {}x{} below 720p", media.resolution.0, media.resolution.1)));
    }
    Ok(None)
}

#[derive(Debug, Deserialize)]
struct DbMigrationResult {
    engine: String,
    applied_count: u32,
    failed_count: u32,
    validation_query_pass_rate: f64,
}

pub fn evaluate_db(path: &Path) -> DomainResult<Option<String>> {
    let result: DbMigrationResult = serde_json::from_slice(&std::fs::read(path)?)?;
    if result.engine.trim().is_empty() {
        return Ok(Some("db migration result missing engine".into()));
    }
    if result.failed_count > 0 {
        return Ok(Some(format!("{} migrations failed", result.failed_count)));
    }
    if result.applied_count == 0 {
        return Ok(Some("no migrations were applied".into()));
    }
    if result.validation_query_pass_rate < 1.0 {
        return Ok(Some(format!(
            "validation query pass rate {:.1}% below 100%",
            result.validation_query_pass_rate * 100.0
        )));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seo_flags_missing_canonical_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "broken_links": 0,
                "canonical_coverage_pct": 80.0,
                "missing_meta_tags": [],
                "missing_og_tags": []
            })
            .to_string(),
        )
        .unwrap();
        let msg = evaluate_seo(&path).unwrap();
        assert!(msg.unwrap().contains("canonical"));
    }

    #[test]
    fn db_flags_failed_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migration-result.json");
        std::fs::write(
            &path,
            serde_json::json!({ "engine": "sqlite", "applied_count": 3, "failed_count": 1, "validation_query_pass_rate": 1.0 }).to_string(),
        )
        .unwrap();
        assert!(evaluate_db(&path).unwrap().unwrap().contains("failed"));
    }

    #[test]
    fn charts_flags_low_color_diversity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart-meta.json");
        std::fs::write(&path, serde_json::json!({ "width": 640, "height": 480, "distinct_colors": 1 }).to_string()).unwrap();
        assert!(evaluate_charts(&path).unwrap().unwrap().contains("diversity"));
    }
}
