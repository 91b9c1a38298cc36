//! Snapshot adapter: deserialize the destination's list wire format and
//! normalize it into [`DestinationList`]s.
//!
//! # Purpose
//! The destination returns its lists as loosely-typed JSON. This module keeps
//! the *raw* shape (every field optional) and a single [`normalize`] function
//! that turns it into the [`DestinationSnapshot`] the engine reconciles
//! against.
//!
//! # Policy
//! A malformed list is a local problem of that list only: it is excluded from
//! reconciliation and reported as a [`SnapshotIssue`]; the rest of the
//! snapshot is still usable. Excluded lists that carry a label keep that label
//! reserved so no new list is ever named after it.
//!
//! Entries are never invented or rewritten. Entities without a `text` (a
//! publication, a topic) are kept as they are: they take up capacity and are
//! written back on a full-replace update, but never match a source label.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{DestinationList, Entry};

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// Everything [`normalize`] can find wrong with a raw list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotIssue {
    /// The list has no (or a blank) label. Excluded.
    MissingLabel { position: usize, id: Option<String> },
    /// The list has no id and therefore cannot be updated. Excluded.
    MissingId { label: String },
    /// The list has no entries collection at all. Excluded.
    MissingEntries { label: String },
    /// Repeated entry texts were dropped; the list itself is kept.
    DuplicateEntries { label: String, dropped: Vec<String> },
}

impl SnapshotIssue {
    /// `true` when the list was left out of reconciliation.
    pub fn is_exclusion(&self) -> bool {
        !matches!(self, SnapshotIssue::DuplicateEntries { .. })
    }
}

impl std::fmt::Display for SnapshotIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingLabel { position, id } => match id {
                Some(id) => write!(f, "destination list #{position} (id '{id}') has no label"),
                None => write!(f, "destination list #{position} has no label"),
            },
            Self::MissingId { label } => write!(f, "destination list '{label}' has no id"),
            Self::MissingEntries { label } => {
                write!(f, "destination list '{label}' has no entries collection")
            }
            Self::DuplicateEntries { label, dropped } => write!(
                f,
                "destination list '{label}' repeats {} entry text(s); duplicates dropped",
                dropped.len()
            ),
        }
    }
}

impl std::error::Error for SnapshotIssue {}

// ---------------------------------------------------------------------------
// Raw wire-level structs  (destination JSON → these → internal types)
// ---------------------------------------------------------------------------

/// Wire-level entry. Unknown attributes are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire-level list as returned by the destination read endpoint.
///
/// Unknown fields are ignored (`deny_unknown_fields` is NOT set).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDestinationList {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub entities: Option<Vec<RawEntry>>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// In-memory view of the destination for one pass.
///
/// `reserved_labels` holds every label known to exist at the destination,
/// including those of excluded lists; new list names must avoid all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationSnapshot {
    pub lists: Vec<DestinationList>,
    pub reserved_labels: BTreeSet<String>,
}

impl DestinationSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_lists(lists: Vec<DestinationList>) -> Self {
        let reserved_labels = lists.iter().map(|l| l.label.clone()).collect();
        Self {
            lists,
            reserved_labels,
        }
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn find(&self, label: &str) -> Option<&DestinationList> {
        self.lists.iter().find(|l| l.label == label)
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Repeated texts are dropped after their first occurrence. Text-less
/// entities are never deduplicated.
fn normalize_entries(raw: Vec<RawEntry>) -> (Vec<Entry>, Vec<String>) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries: Vec<Entry> = Vec::with_capacity(raw.len());
    let mut dropped: Vec<String> = Vec::new();

    for e in raw {
        if let Some(text) = &e.text {
            if !seen.insert(text.clone()) {
                dropped.push(text.clone());
                continue;
            }
        }
        entries.push(Entry {
            kind: e.kind,
            text: e.text,
            extra: e.extra,
        });
    }

    (entries, dropped)
}

/// Normalize raw destination lists into a [`DestinationSnapshot`].
///
/// Lists keep the order the destination returned them in; packing relies on
/// that order. Issues are returned alongside the snapshot, one per affected
/// list (plus one for dropped duplicates).
pub fn normalize(raw: Vec<RawDestinationList>) -> (DestinationSnapshot, Vec<SnapshotIssue>) {
    let mut snapshot = DestinationSnapshot::empty();
    let mut issues: Vec<SnapshotIssue> = Vec::new();

    for (position, r) in raw.into_iter().enumerate() {
        let id = non_blank(r.id);
        let Some(label) = non_blank(r.label) else {
            issues.push(SnapshotIssue::MissingLabel { position, id });
            continue;
        };
        snapshot.reserved_labels.insert(label.clone());

        let Some(id) = id else {
            issues.push(SnapshotIssue::MissingId { label });
            continue;
        };
        let Some(raw_entries) = r.entities else {
            issues.push(SnapshotIssue::MissingEntries { label });
            continue;
        };

        let (entries, dropped) = normalize_entries(raw_entries);
        if !dropped.is_empty() {
            issues.push(SnapshotIssue::DuplicateEntries {
                label: label.clone(),
                dropped,
            });
        }
        snapshot
            .lists
            .push(DestinationList::new(Some(id), label, entries));
    }

    (snapshot, issues)
}

/// Convenience wrapper: `json_str → Vec<RawDestinationList> → snapshot`.
pub fn normalize_json(
    json: &str,
) -> Result<(DestinationSnapshot, Vec<SnapshotIssue>), serde_json::Error> {
    let raw: Vec<RawDestinationList> = serde_json::from_str(json)?;
    Ok(normalize(raw))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_lists_pass_through_in_order() {
        let json = r#"[
            {"id":"t/2","label":"Server-2","type":"customTopic","entities":[
                {"type":"customKeyword","text":"db-1"}
            ]},
            {"id":"t/1","label":"Server-1","entities":[]}
        ]"#;
        let (snap, issues) = normalize_json(json).unwrap();
        assert!(issues.is_empty());
        assert_eq!(snap.lists.len(), 2);
        assert_eq!(snap.lists[0].label, "Server-2");
        assert_eq!(snap.lists[0].id.as_deref(), Some("t/2"));
        assert_eq!(snap.lists[0].entries[0].text(), Some("db-1"));
        assert_eq!(snap.lists[1].label, "Server-1");
    }

    #[test]
    fn list_without_label_is_excluded() {
        let json = r#"[{"id":"t/9","entities":[]}]"#;
        let (snap, issues) = normalize_json(json).unwrap();
        assert!(snap.is_empty());
        assert!(snap.reserved_labels.is_empty());
        assert_eq!(
            issues,
            vec![SnapshotIssue::MissingLabel {
                position: 0,
                id: Some("t/9".into())
            }]
        );
    }

    #[test]
    fn list_without_entries_is_excluded_but_label_reserved() {
        let json = r#"[{"id":"t/1","label":"Server-1"}]"#;
        let (snap, issues) = normalize_json(json).unwrap();
        assert!(snap.is_empty());
        assert!(snap.reserved_labels.contains("Server-1"));
        assert_eq!(
            issues,
            vec![SnapshotIssue::MissingEntries {
                label: "Server-1".into()
            }]
        );
        assert!(issues[0].is_exclusion());
    }

    #[test]
    fn list_without_id_is_excluded() {
        let json = r#"[{"label":"Server-1","entities":[]}]"#;
        let (snap, issues) = normalize_json(json).unwrap();
        assert!(snap.is_empty());
        assert_eq!(
            issues,
            vec![SnapshotIssue::MissingId {
                label: "Server-1".into()
            }]
        );
    }

    #[test]
    fn textless_entities_keep_the_list() {
        let json = r#"[
            {"id":"t/1","label":"Server-1","entities":[
                {"type":"customKeyword","text":"a"},
                {"type":"publication","id":"feed/x"},
                {"type":"publication","id":"feed/y"}
            ]}
        ]"#;
        let (snap, issues) = normalize_json(json).unwrap();
        assert!(issues.is_empty());
        let l = &snap.lists[0];
        assert_eq!(l.entries.len(), 3);
        assert_eq!(l.entries[1].text(), None);
        assert_eq!(l.entries[2].extra.get("id").and_then(|v| v.as_str()), Some("feed/y"));
    }

    #[test]
    fn duplicate_texts_are_dropped_and_reported() {
        let json = r#"[{"id":"t/1","label":"Server-1","entities":[
            {"type":"customKeyword","text":"a"},
            {"type":"customKeyword","text":"b"},
            {"type":"customKeyword","text":"a"}
        ]}]"#;
        let (snap, issues) = normalize_json(json).unwrap();
        assert_eq!(snap.lists[0].entries.len(), 2);
        assert_eq!(
            issues,
            vec![SnapshotIssue::DuplicateEntries {
                label: "Server-1".into(),
                dropped: vec!["a".into()]
            }]
        );
        assert!(!issues[0].is_exclusion());
    }

    #[test]
    fn unknown_entry_attributes_survive_normalization() {
        let json = r#"[{"id":"t/1","label":"Server-1","entities":[
            {"type":"customKeyword","text":"a","id":"kw/a","weight":2}
        ]}]"#;
        let (snap, _) = normalize_json(json).unwrap();
        let e = &snap.lists[0].entries[0];
        assert_eq!(e.extra.get("id").and_then(|v| v.as_str()), Some("kw/a"));
        assert_eq!(e.extra.get("weight").and_then(|v| v.as_i64()), Some(2));
    }
}
