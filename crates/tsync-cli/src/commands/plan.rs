//! `tsync plan`: offline reconciliation of local files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tsync_reconcile::snapshot_adapter::normalize_json;
use tsync_reconcile::{
    aggregate, reconcile, DestinationSnapshot, MembershipRule, RecordIssue, ReconcilePlan,
    ReconcilePolicy, SnapshotIssue,
};
use tsync_source::parse_csv_records;

#[derive(Serialize)]
struct PlanOutput {
    record_issues: Vec<RecordIssue>,
    snapshot_issues: Vec<SnapshotIssue>,
    #[serde(flatten)]
    plan: ReconcilePlan,
}

pub fn run_plan(csv: &Path, lists: Option<&Path>, membership: &str) -> Result<()> {
    let membership: MembershipRule = membership.parse()?;

    let file =
        fs::File::open(csv).with_context(|| format!("open csv failed: {}", csv.display()))?;
    let records = parse_csv_records(file)?;
    let agg = aggregate(records);

    let (snapshot, snapshot_issues) = match lists {
        Some(p) => {
            let raw = fs::read_to_string(p)
                .with_context(|| format!("read lists failed: {}", p.display()))?;
            normalize_json(&raw).with_context(|| format!("parse lists failed: {}", p.display()))?
        }
        None => (DestinationSnapshot::empty(), Vec::new()),
    };

    let plan = reconcile(&agg.group, snapshot, ReconcilePolicy::with_membership(membership));

    let out = PlanOutput {
        record_issues: agg.issues,
        snapshot_issues,
        plan,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("serialize plan failed")?
    );
    Ok(())
}
