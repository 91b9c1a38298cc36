use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Maximum number of entries a destination list may hold.
pub const LIST_CAPACITY: usize = 50;

/// Entry kind written for every label this engine adds.
pub const ENTRY_KIND_KEYWORD: &str = "customKeyword";

/// List kind sent with every update/create payload.
pub const LIST_KIND_TOPIC: &str = "customTopic";

/// One record as produced by a source fetch. Either field may be absent;
/// the aggregator reports and skips such records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub type_name: Option<String>,
    pub label: Option<String>,
}

impl SourceRecord {
    pub fn new(type_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            label: Some(label.into()),
        }
    }
}

/// Labels of one source type in first-seen order. Duplicates are allowed here;
/// they are collapsed against destination state during reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeLabels {
    pub type_name: String,
    pub labels: Vec<String>,
}

/// type name -> labels, preserving the order in which types were first seen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TypeGroup {
    groups: Vec<TypeLabels>,
    #[serde(skip)]
    index: BTreeMap<String, usize>,
}

impl TypeGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, type_name: &str, label: impl Into<String>) {
        let label = label.into();
        match self.index.get(type_name) {
            Some(&i) => {
                if let Some(g) = self.groups.get_mut(i) {
                    g.labels.push(label);
                }
            }
            None => {
                self.index.insert(type_name.to_string(), self.groups.len());
                self.groups.push(TypeLabels {
                    type_name: type_name.to_string(),
                    labels: vec![label],
                });
            }
        }
    }

    pub fn labels(&self, type_name: &str) -> Option<&[String]> {
        let i = *self.index.get(type_name)?;
        self.groups.get(i).map(|g| g.labels.as_slice())
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.type_name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeLabels> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total labels across all types, duplicates included.
    pub fn label_count(&self) -> usize {
        self.groups.iter().map(|g| g.labels.len()).sum()
    }
}

impl<S: Into<String>, L: Into<String>> FromIterator<(S, L)> for TypeGroup {
    fn from_iter<I: IntoIterator<Item = (S, L)>>(iter: I) -> Self {
        let mut group = TypeGroup::new();
        for (t, l) in iter {
            let t: String = t.into();
            group.push(&t, l);
        }
        group
    }
}

/// A single entity attached to a destination list.
///
/// Keyword entries carry a `text`. Other entities (publications, topics)
/// may not; they still occupy a slot and are written back as received.
/// Attributes beyond `type`/`text` are carried in `extra`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Self::new(ENTRY_KIND_KEYWORD, text)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// A destination list after normalization. `id` is `None` for lists this
/// pass has planned but the destination has not yet created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationList {
    pub id: Option<String>,
    pub label: String,
    pub entries: Vec<Entry>,
}

impl DestinationList {
    pub fn new(id: Option<String>, label: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            id,
            label: label.into(),
            entries,
        }
    }

    /// Texts of the entries that have one.
    pub fn texts(&self) -> BTreeSet<&str> {
        self.entries.iter().filter_map(Entry::text).collect()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e.text() == Some(text))
    }

    /// Room left before `capacity`, counting every entity. Lists that already
    /// exceed it have none.
    pub fn spare(&self, capacity: usize) -> usize {
        capacity.saturating_sub(self.entries.len())
    }
}

/// A planned write against the destination, decoupled from dispatch.
///
/// Updates always carry the list's **full** resulting entries: the destination
/// replaces the list wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteIntent {
    UpdateList {
        id: String,
        label: String,
        entries: Vec<Entry>,
    },
    CreateList {
        label: String,
        entries: Vec<Entry>,
    },
}

impl WriteIntent {
    pub fn label(&self) -> &str {
        match self {
            WriteIntent::UpdateList { label, .. } | WriteIntent::CreateList { label, .. } => label,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        match self {
            WriteIntent::UpdateList { entries, .. } | WriteIntent::CreateList { entries, .. } => {
                entries
            }
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, WriteIntent::CreateList { .. })
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            WriteIntent::UpdateList { .. } => "update",
            WriteIntent::CreateList { .. } => "create",
        }
    }
}

/// Non-fatal observations made while planning.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// A list label matches more than one type of this run under the active
    /// membership rule; it is treated as belonging to each of them.
    AmbiguousMembership {
        label: String,
        type_names: Vec<String>,
    },
    /// A matching list has no destination id yet (it is created by this same
    /// pass), so it was not considered for packing.
    PendingListSkipped { label: String },
}

impl std::fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanWarning::AmbiguousMembership { label, type_names } => write!(
                f,
                "list '{label}' matches several types {type_names:?}; membership is ambiguous"
            ),
            PlanWarning::PendingListSkipped { label } => {
                write!(f, "list '{label}' has no id yet; skipped for packing")
            }
        }
    }
}
