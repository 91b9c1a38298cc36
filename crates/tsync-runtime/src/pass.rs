use std::fmt;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use tsync_config::{FetchErrorPolicy, SyncSettings};
use tsync_destination::{
    apply, render, DestinationError, DestinationReader, DestinationWriter, WriteOutcome,
};
use tsync_reconcile::snapshot_adapter::normalize;
use tsync_reconcile::{aggregate, Aggregation, ReconcilePolicy, Reconciler, WriteIntent};
use tsync_source::{SourceError, SourceFetcher, SourceSummary};
use uuid::Uuid;

use crate::report::{DispatchStatus, IntentRecord, RunReport, TypeSummary};

// ----- Options -----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOptions {
    pub dry_run: bool,
    /// Minimum gap between consecutive real writes. Ignored in dry-run.
    pub write_delay: Duration,
    pub on_fetch_error: FetchErrorPolicy,
    pub policy: ReconcilePolicy,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            write_delay: Duration::from_secs(1),
            on_fetch_error: FetchErrorPolicy::Abort,
            policy: ReconcilePolicy::default(),
        }
    }
}

impl PassOptions {
    pub fn from_settings(s: &SyncSettings) -> Self {
        Self {
            dry_run: s.run.dry_run,
            write_delay: s.destination.write_delay,
            on_fetch_error: s.destination.on_fetch_error,
            policy: ReconcilePolicy::with_membership(s.membership),
        }
    }
}

// ----- Errors -----

/// Failures that stop a pass before anything is planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassError {
    Source(SourceError),
    DestinationFetch(DestinationError),
}

impl fmt::Display for PassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassError::Source(e) => write!(f, "PASS_SOURCE_FAILED: {e}"),
            PassError::DestinationFetch(e) => write!(f, "PASS_DESTINATION_FETCH_FAILED: {e}"),
        }
    }
}

impl std::error::Error for PassError {}

// ----- Pass -----

/// One sequential reconciliation pass over borrowed collaborators.
pub struct SyncPass<'a> {
    source: &'a dyn SourceFetcher,
    reader: &'a dyn DestinationReader,
    writer: &'a dyn DestinationWriter,
    opts: PassOptions,
    config_hash: Option<String>,
}

impl<'a> SyncPass<'a> {
    pub fn new(
        source: &'a dyn SourceFetcher,
        reader: &'a dyn DestinationReader,
        writer: &'a dyn DestinationWriter,
        opts: PassOptions,
    ) -> Self {
        Self {
            source,
            reader,
            writer,
            opts,
            config_hash: None,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub async fn run(&self) -> Result<RunReport, PassError> {
        let run_id = Uuid::new_v4();
        let started_at_utc = Utc::now();
        let opts = self.opts;
        info!(%run_id, dry_run = opts.dry_run, source = self.source.name(), "sync pass started");

        // --- Source ---
        let batch = self.source.fetch().await.map_err(|e| {
            error!(error = %e, "source fetch failed");
            PassError::Source(e)
        })?;
        let source = SourceSummary::of(self.source.name(), &batch);
        if let Some(why) = &source.truncation {
            warn!(records = source.records, reason = %why, "source fetch truncated");
        }

        let Aggregation { group, issues } = aggregate(batch.records);
        for issue in &issues {
            warn!(%issue, "source record skipped");
        }
        info!(
            types = group.len(),
            labels = group.label_count(),
            skipped = issues.len(),
            "source aggregated"
        );

        // --- Destination ---
        let mut destination_fetch_error = None;
        let raw = match self.reader.fetch_lists().await {
            Ok(raw) => raw,
            Err(e) => match opts.on_fetch_error {
                FetchErrorPolicy::Abort => {
                    error!(error = %e, "destination fetch failed; aborting pass");
                    return Err(PassError::DestinationFetch(e));
                }
                FetchErrorPolicy::ProceedEmpty => {
                    warn!(error = %e, "destination fetch failed; planning against an empty destination");
                    destination_fetch_error = Some(e.to_string());
                    Vec::new()
                }
            },
        };

        let (snapshot, snapshot_issues) = normalize(raw);
        for issue in &snapshot_issues {
            warn!(%issue, excluded = issue.is_exclusion(), "destination list issue");
        }
        let destination_lists = snapshot.len();

        // --- Plan and dispatch, one type at a time ---
        let mut reconciler = Reconciler::new(snapshot, opts.policy);
        let warnings = reconciler.ambiguities(&group);
        for w in &warnings {
            warn!(warning = %w, "membership ambiguity");
        }

        let mut types = Vec::with_capacity(group.len());
        let mut intents = Vec::new();
        let mut writes_sent: usize = 0;

        for tl in group.iter() {
            let plan = reconciler.plan_type(&tl.type_name, &tl.labels);
            for w in &plan.warnings {
                warn!(type_name = %tl.type_name, warning = %w, "plan warning");
            }
            info!(
                type_name = %tl.type_name,
                labels = plan.labels,
                missing = plan.missing,
                updates = plan.updates(),
                creates = plan.creates(),
                "type planned"
            );
            types.push(TypeSummary::from(&plan));

            for intent in plan.intents {
                let status = if opts.dry_run {
                    dry_run(&intent)
                } else {
                    if writes_sent > 0 && !opts.write_delay.is_zero() {
                        tokio::time::sleep(opts.write_delay).await;
                    }
                    writes_sent += 1;
                    self.dispatch(&intent).await
                };
                intents.push(IntentRecord::new(&tl.type_name, intent, status));
            }
        }

        let report = RunReport {
            run_id,
            started_at_utc,
            finished_at_utc: Utc::now(),
            dry_run: opts.dry_run,
            config_hash: self.config_hash.clone(),
            membership: opts.policy.membership.as_str().to_string(),
            capacity: opts.policy.capacity.get(),
            source,
            destination_fetch_error,
            destination_lists,
            record_issues: issues,
            snapshot_issues,
            warnings,
            types,
            intents,
        };

        info!(
            %run_id,
            intents = report.intents.len(),
            applied = report.applied_count(),
            failed = report.failure_count(),
            "sync pass finished"
        );
        Ok(report)
    }

    async fn dispatch(&self, intent: &WriteIntent) -> DispatchStatus {
        debug!(op = intent.op_name(), label = intent.label(), "dispatching");
        match apply(self.writer, intent).await {
            Ok(WriteOutcome::Applied) => DispatchStatus::Applied,
            Ok(WriteOutcome::Rejected { status, body }) => {
                warn!(op = intent.op_name(), label = intent.label(), status, "write rejected");
                DispatchStatus::Rejected { status, body }
            }
            Err(e) => {
                warn!(op = intent.op_name(), label = intent.label(), error = %e, "write failed");
                DispatchStatus::TransportError {
                    message: e.to_string(),
                }
            }
        }
    }
}

fn dry_run(intent: &WriteIntent) -> DispatchStatus {
    match render(intent) {
        Ok(payload) => {
            info!(
                op = intent.op_name(),
                label = intent.label(),
                entries = intent.entries().len(),
                "dry-run: would send\n{payload}"
            );
            DispatchStatus::DryRun { payload }
        }
        Err(e) => DispatchStatus::RenderFailed {
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_follow_settings() {
        let cfg = json!({
            "source": { "kind": "csv", "csv_path": "a.csv" },
            "destination": {
                "base_url": "https://d.example.com",
                "write_delay_ms": 5,
                "on_fetch_error": "proceed_empty"
            },
            "reconcile": { "membership": "delimited" },
            "run": { "dry_run": true }
        });
        let s = SyncSettings::from_config_json(&cfg).unwrap();
        let o = PassOptions::from_settings(&s);
        assert!(o.dry_run);
        assert_eq!(o.write_delay, Duration::from_millis(5));
        assert_eq!(o.on_fetch_error, FetchErrorPolicy::ProceedEmpty);
        assert_eq!(o.policy.membership.as_str(), "delimited");
        assert_eq!(o.policy.capacity.get(), 50);
    }

    #[test]
    fn pass_error_display_carries_code() {
        let e = PassError::DestinationFetch(DestinationError::Transport("refused".into()));
        assert!(e.to_string().starts_with("PASS_DESTINATION_FETCH_FAILED"));
    }
}
