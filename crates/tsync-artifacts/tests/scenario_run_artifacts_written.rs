use anyhow::Result;
use chrono::Utc;
use std::fs;
use tempfile::tempdir;
use tsync_reconcile::{Entry, WriteIntent};
use tsync_runtime::{DispatchStatus, IntentRecord, RunReport};
use tsync_source::SourceSummary;
use uuid::Uuid;

fn report() -> RunReport {
    let now = Utc::now();
    RunReport {
        run_id: Uuid::new_v4(),
        started_at_utc: now,
        finished_at_utc: now,
        dry_run: false,
        config_hash: Some("cafebabe".into()),
        membership: "prefix".into(),
        capacity: 50,
        source: SourceSummary {
            source: "csv".into(),
            records: 3,
            pages: 1,
            truncation: None,
        },
        destination_fetch_error: None,
        destination_lists: 1,
        record_issues: vec![],
        snapshot_issues: vec![],
        warnings: vec![],
        types: vec![],
        intents: vec![
            IntentRecord::new(
                "Server",
                WriteIntent::UpdateList {
                    id: "t/1".into(),
                    label: "Server-1".into(),
                    entries: vec![Entry::keyword("web-1")],
                },
                DispatchStatus::Applied,
            ),
            IntentRecord::new(
                "Server",
                WriteIntent::CreateList {
                    label: "Server-2".into(),
                    entries: vec![Entry::keyword("web-2")],
                },
                DispatchStatus::Rejected {
                    status: 500,
                    body: "boom".into(),
                },
            ),
        ],
    }
}

#[test]
fn scenario_run_artifacts_written() -> Result<()> {
    let tmp = tempdir()?;
    let report = report();

    let out = tsync_artifacts::write_run_artifacts(tmp.path(), &report)?;

    assert_eq!(out.run_dir, tmp.path().join(report.run_id.to_string()));
    assert!(out.manifest_path.exists());
    assert!(out.report_path.exists());

    let manifest: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out.manifest_path)?)?;
    assert_eq!(manifest["run_id"].as_str().unwrap(), report.run_id.to_string());
    assert_eq!(manifest["intents"], 2);
    assert_eq!(manifest["failures"], 1);
    assert_eq!(manifest["config_hash"], "cafebabe");

    let lines: Vec<serde_json::Value> = fs::read_to_string(&out.intents_path)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["op"], "update");
    assert_eq!(lines[1]["outcome"], "rejected");
    assert_eq!(lines[1]["status"], 500);

    let full: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out.report_path)?)?;
    assert_eq!(full["source"]["records"], 3);
    Ok(())
}

#[test]
fn empty_pass_writes_empty_jsonl() -> Result<()> {
    let tmp = tempdir()?;
    let mut report = report();
    report.intents.clear();

    let out = tsync_artifacts::write_run_artifacts(tmp.path(), &report)?;
    assert_eq!(fs::read_to_string(out.intents_path)?, "");
    Ok(())
}
