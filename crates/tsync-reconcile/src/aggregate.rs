//! Source aggregation: flat records -> labels grouped by type.

use serde::{Deserialize, Serialize};

use crate::{SourceRecord, TypeGroup};

/// Why a source record was skipped. `index` is the record's position in the
/// fetched sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordIssue {
    MissingType { index: usize },
    MissingLabel { index: usize, type_name: String },
}

impl std::fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordIssue::MissingType { index } => {
                write!(f, "source record #{index} has no type name")
            }
            RecordIssue::MissingLabel { index, type_name } => {
                write!(f, "source record #{index} (type '{type_name}') has no label")
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub group: TypeGroup,
    pub issues: Vec<RecordIssue>,
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.trim().is_empty())
}

/// Group labels by type. A malformed record is reported and skipped; it never
/// stops the remaining records from being processed.
pub fn aggregate<I>(records: I) -> Aggregation
where
    I: IntoIterator<Item = SourceRecord>,
{
    let mut out = Aggregation::default();

    for (index, rec) in records.into_iter().enumerate() {
        let Some(type_name) = non_blank(rec.type_name.as_deref()) else {
            out.issues.push(RecordIssue::MissingType { index });
            continue;
        };
        let Some(label) = non_blank(rec.label.as_deref()) else {
            out.issues.push(RecordIssue::MissingLabel {
                index,
                type_name: type_name.to_string(),
            });
            continue;
        };
        out.group.push(type_name, label);
    }

    out
}
