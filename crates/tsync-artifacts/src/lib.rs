use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tsync_runtime::RunReport;
use uuid::Uuid;

pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub dry_run: bool,
    pub config_hash: Option<String>,
    pub started_at_utc: DateTime<Utc>,
    pub finished_at_utc: DateTime<Utc>,
    pub intents: usize,
    pub failures: usize,
    pub artifacts: ArtifactList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactList {
    pub manifest_json: String,
    pub report_json: String,
    pub intents_jsonl: String,
}

pub struct RunArtifacts {
    pub run_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub report_path: PathBuf,
    pub intents_path: PathBuf,
}

/// Write `exports_root/<run_id>/{manifest.json, report.json, intents.jsonl}`.
///
/// Files are overwritten; a run id is never reused.
pub fn write_run_artifacts(exports_root: &Path, report: &RunReport) -> Result<RunArtifacts> {
    let run_dir = exports_root.join(report.run_id.to_string());
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create exports dir failed: {}", run_dir.display()))?;

    let report_path = run_dir.join("report.json");
    write_json(&report_path, report)?;

    // One intent per line, in dispatch order.
    let intents_path = run_dir.join("intents.jsonl");
    let mut buf: Vec<u8> = Vec::new();
    for intent in &report.intents {
        serde_json::to_writer(&mut buf, intent).context("serialize intent failed")?;
        buf.push(b'\n');
    }
    let mut f = fs::File::create(&intents_path)
        .with_context(|| format!("create intents failed: {}", intents_path.display()))?;
    f.write_all(&buf)
        .with_context(|| format!("write intents failed: {}", intents_path.display()))?;

    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        run_id: report.run_id,
        dry_run: report.dry_run,
        config_hash: report.config_hash.clone(),
        started_at_utc: report.started_at_utc,
        finished_at_utc: report.finished_at_utc,
        intents: report.intents.len(),
        failures: report.failure_count(),
        artifacts: ArtifactList {
            manifest_json: "manifest.json".to_string(),
            report_json: "report.json".to_string(),
            intents_jsonl: "intents.jsonl".to_string(),
        },
    };
    let manifest_path = run_dir.join("manifest.json");
    write_json(&manifest_path, &manifest)?;

    Ok(RunArtifacts {
        run_dir,
        manifest_path,
        report_path,
        intents_path,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize failed: {}", path.display()))?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write failed: {}", path.display()))
}
