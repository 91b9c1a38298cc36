use chrono::{DateTime, Utc};
use serde::Serialize;
use tsync_reconcile::{Entry, PlanWarning, RecordIssue, SnapshotIssue, TypePlan, WriteIntent};
use tsync_source::SourceSummary;
use uuid::Uuid;

/// What happened to one intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchStatus {
    Applied,
    Rejected { status: u16, body: String },
    TransportError { message: String },
    /// Dry-run: the payload that would have been sent.
    DryRun { payload: String },
    RenderFailed { message: String },
}

impl DispatchStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DispatchStatus::Rejected { .. }
                | DispatchStatus::TransportError { .. }
                | DispatchStatus::RenderFailed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentRecord {
    pub type_name: String,
    pub op: &'static str,
    pub id: Option<String>,
    pub label: String,
    pub entries: Vec<Entry>,
    #[serde(flatten)]
    pub status: DispatchStatus,
}

impl IntentRecord {
    pub fn new(type_name: &str, intent: WriteIntent, status: DispatchStatus) -> Self {
        let op = intent.op_name();
        let (id, label, entries) = match intent {
            WriteIntent::UpdateList { id, label, entries } => (Some(id), label, entries),
            WriteIntent::CreateList { label, entries } => (None, label, entries),
        };
        Self {
            type_name: type_name.to_string(),
            op,
            id,
            label,
            entries,
            status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeSummary {
    pub type_name: String,
    pub labels: usize,
    pub existing_lists: usize,
    pub spare_capacity: usize,
    pub missing: usize,
    pub updates: usize,
    pub creates: usize,
    pub warnings: Vec<PlanWarning>,
}

impl From<&TypePlan> for TypeSummary {
    fn from(p: &TypePlan) -> Self {
        Self {
            type_name: p.type_name.clone(),
            labels: p.labels,
            existing_lists: p.existing_lists,
            spare_capacity: p.spare_capacity,
            missing: p.missing,
            updates: p.updates(),
            creates: p.creates(),
            warnings: p.warnings.clone(),
        }
    }
}

/// Aggregated outcome of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at_utc: DateTime<Utc>,
    pub finished_at_utc: DateTime<Utc>,
    pub dry_run: bool,
    pub config_hash: Option<String>,
    pub membership: String,
    pub capacity: usize,
    pub source: SourceSummary,
    /// Set when the destination read failed and the pass proceeded empty.
    pub destination_fetch_error: Option<String>,
    pub destination_lists: usize,
    pub record_issues: Vec<RecordIssue>,
    pub snapshot_issues: Vec<SnapshotIssue>,
    pub warnings: Vec<PlanWarning>,
    pub types: Vec<TypeSummary>,
    pub intents: Vec<IntentRecord>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &IntentRecord> {
        self.intents.iter().filter(|i| i.status.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn applied_count(&self) -> usize {
        self.intents
            .iter()
            .filter(|i| i.status == DispatchStatus::Applied)
            .count()
    }

    /// `true` if anything at all deserves an operator's attention.
    pub fn has_problems(&self) -> bool {
        self.failure_count() > 0
            || self.source.truncation.is_some()
            || self.destination_fetch_error.is_some()
            || !self.record_issues.is_empty()
            || self.snapshot_issues.iter().any(SnapshotIssue::is_exclusion)
    }
}
