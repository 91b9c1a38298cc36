//! Deterministic in-memory collaborators for pass scenarios.
//!
//! No network I/O. [`InMemoryDestination`] applies writes to its own lists so
//! a second pass sees the result of the first.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tsync_destination::{DestinationError, DestinationReader, DestinationWriter, WriteOutcome};
use tsync_reconcile::snapshot_adapter::{RawDestinationList, RawEntry};
use tsync_reconcile::{Entry, SourceRecord, ENTRY_KIND_KEYWORD};
use tsync_source::{SourceBatch, SourceError, SourceFetcher};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Source that returns a fixed batch (or a fixed error) on every fetch.
#[derive(Debug, Clone)]
pub struct StaticSource {
    result: Result<SourceBatch, SourceError>,
}

impl StaticSource {
    pub fn new(records: Vec<SourceRecord>) -> Self {
        Self {
            result: Ok(SourceBatch::complete(records, 1)),
        }
    }

    /// `(type, label)` pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(t, l)| SourceRecord::new(*t, *l))
                .collect(),
        )
    }

    pub fn truncated(mut self, reason: impl Into<String>) -> Self {
        if let Ok(batch) = &mut self.result {
            batch.truncation = Some(reason.into());
        }
        self
    }

    pub fn failing(err: SourceError) -> Self {
        Self { result: Err(err) }
    }
}

#[async_trait::async_trait]
impl SourceFetcher for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self) -> Result<SourceBatch, SourceError> {
        self.result.clone()
    }
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

/// One writer call as the destination saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    Update {
        id: String,
        label: String,
        entries: Vec<Entry>,
    },
    Create {
        label: String,
        entries: Vec<Entry>,
    },
}

impl WriteCall {
    pub fn label(&self) -> &str {
        match self {
            WriteCall::Update { label, .. } | WriteCall::Create { label, .. } => label,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        match self {
            WriteCall::Update { entries, .. } | WriteCall::Create { entries, .. } => entries,
        }
    }
}

/// Scripted response for the next writer call.
#[derive(Debug, Clone)]
pub enum ScriptedWrite {
    Reject { status: u16, body: String },
    Transport(String),
}

#[derive(Debug, Default)]
struct State {
    lists: Vec<RawDestinationList>,
    next_id: u64,
    calls: Vec<WriteCall>,
    fetches: usize,
    fetch_error: Option<DestinationError>,
    script: VecDeque<Option<ScriptedWrite>>,
}

/// Destination reader and writer backed by a `Vec` of lists.
///
/// Created lists get ids `mem/1`, `mem/2`, ... Updates replace the entries of
/// the list with the given id. Scripted failures leave the lists untouched.
#[derive(Debug, Default)]
pub struct InMemoryDestination {
    state: Mutex<State>,
}

impl InMemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing list of keyword entries.
    pub fn with_list(self, id: &str, label: &str, texts: &[&str]) -> Self {
        let entities = texts
            .iter()
            .map(|t| RawEntry {
                kind: Some(ENTRY_KIND_KEYWORD.to_string()),
                text: Some(t.to_string()),
                ..RawEntry::default()
            })
            .collect();
        self.with_raw(RawDestinationList {
            id: Some(id.to_string()),
            label: Some(label.to_string()),
            entities: Some(entities),
        })
    }

    pub fn with_raw(self, list: RawDestinationList) -> Self {
        self.lock().lists.push(list);
        self
    }

    /// Every `fetch_lists` fails with `err`.
    pub fn failing_fetch(self, err: DestinationError) -> Self {
        self.lock().fetch_error = Some(err);
        self
    }

    /// Queue responses for upcoming writes, in call order. `None` means the
    /// write succeeds normally.
    pub fn script(self, responses: impl IntoIterator<Item = Option<ScriptedWrite>>) -> Self {
        self.lock().script.extend(responses);
        self
    }

    pub fn calls(&self) -> Vec<WriteCall> {
        self.lock().calls.clone()
    }

    pub fn fetches(&self) -> usize {
        self.lock().fetches
    }

    pub fn lists(&self) -> Vec<RawDestinationList> {
        self.lock().lists.clone()
    }

    /// Entry texts of the list with `label`, in stored order.
    pub fn texts(&self, label: &str) -> Option<Vec<String>> {
        self.lock()
            .lists
            .iter()
            .find(|l| l.label.as_deref() == Some(label))
            .map(|l| {
                l.entities
                    .iter()
                    .flatten()
                    .filter_map(|e| e.text.clone())
                    .collect()
            })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from the asserts.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, call: WriteCall) -> Result<WriteOutcome, DestinationError> {
        let mut st = self.lock();
        st.calls.push(call.clone());

        match st.script.pop_front().flatten() {
            Some(ScriptedWrite::Reject { status, body }) => {
                return Ok(WriteOutcome::Rejected { status, body })
            }
            Some(ScriptedWrite::Transport(msg)) => return Err(DestinationError::Transport(msg)),
            None => {}
        }

        match call {
            WriteCall::Update { id, entries, .. } => {
                let target = st.lists.iter_mut().find(|l| l.id.as_deref() == Some(id.as_str()));
                let Some(list) = target else {
                    return Ok(WriteOutcome::Rejected {
                        status: 404,
                        body: format!("no list with id {id}"),
                    });
                };
                list.entities = Some(entries.iter().map(raw_entry).collect());
            }
            WriteCall::Create { label, entries } => {
                st.next_id += 1;
                let id = format!("mem/{}", st.next_id);
                st.lists.push(RawDestinationList {
                    id: Some(id),
                    label: Some(label),
                    entities: Some(entries.iter().map(raw_entry).collect()),
                });
            }
        }
        Ok(WriteOutcome::Applied)
    }
}

fn raw_entry(e: &Entry) -> RawEntry {
    RawEntry {
        kind: e.kind.clone(),
        text: e.text.clone(),
        extra: e.extra.clone(),
    }
}

#[async_trait::async_trait]
impl DestinationReader for InMemoryDestination {
    async fn fetch_lists(&self) -> Result<Vec<RawDestinationList>, DestinationError> {
        let mut st = self.lock();
        st.fetches += 1;
        match &st.fetch_error {
            Some(e) => Err(e.clone()),
            None => Ok(st.lists.clone()),
        }
    }
}

#[async_trait::async_trait]
impl DestinationWriter for InMemoryDestination {
    async fn update(
        &self,
        id: &str,
        label: &str,
        entries: &[Entry],
    ) -> Result<WriteOutcome, DestinationError> {
        self.record(WriteCall::Update {
            id: id.to_string(),
            label: label.to_string(),
            entries: entries.to_vec(),
        })
    }

    async fn create(
        &self,
        label: &str,
        entries: &[Entry],
    ) -> Result<WriteOutcome, DestinationError> {
        self.record(WriteCall::Create {
            label: label.to_string(),
            entries: entries.to_vec(),
        })
    }
}

/// `n` labels `"{prefix}-{i}"`, zero-padded so they sort in creation order.
pub fn numbered(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}-{i:03}")).collect()
}
