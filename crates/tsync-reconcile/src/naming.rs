//! Sequential list naming: `"{type}-{n}"`.
//!
//! Counts are never persisted on their own. They are derived from the live
//! destination snapshot every pass, then advanced in memory as lists are
//! planned.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Numeric suffix of `label` when it has the exact shape `"{type_name}-{n}"`.
pub fn list_suffix(label: &str, type_name: &str) -> Option<u32> {
    let rest = label.strip_prefix(type_name)?.strip_prefix('-')?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// type name -> highest list index known for that type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ListCounts {
    counts: BTreeMap<String, u32>,
}

impl ListCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the count for `type_name` from the labels of its existing lists.
    ///
    /// The base is the larger of the number of lists and the highest observed
    /// `"{type}-{n}"` suffix, so gaps in the numbering never lead to reuse.
    pub fn observe<'a, I>(&mut self, type_name: &str, labels: I) -> u32
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut n_lists: u32 = 0;
        let mut max_suffix: u32 = 0;
        for l in labels {
            n_lists = n_lists.saturating_add(1);
            if let Some(s) = list_suffix(l, type_name) {
                max_suffix = max_suffix.max(s);
            }
        }
        let base = n_lists.max(max_suffix);
        self.counts.insert(type_name.to_string(), base);
        base
    }

    pub fn get(&self, type_name: &str) -> u32 {
        self.counts.get(type_name).copied().unwrap_or(0)
    }

    /// Advance the count and return the next free label. Labels present in
    /// `taken` are skipped.
    pub fn next_label(&mut self, type_name: &str, taken: &BTreeSet<String>) -> String {
        let mut n = self.get(type_name).saturating_add(1);
        let mut label = format!("{type_name}-{n}");
        while taken.contains(&label) {
            n = n.saturating_add(1);
            label = format!("{type_name}-{n}");
        }
        self.counts.insert(type_name.to_string(), n);
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_requires_exact_shape() {
        assert_eq!(list_suffix("Server-3", "Server"), Some(3));
        assert_eq!(list_suffix("Server-03", "Server"), Some(3));
        assert_eq!(list_suffix("Server", "Server"), None);
        assert_eq!(list_suffix("Server-", "Server"), None);
        assert_eq!(list_suffix("Server-a1", "Server"), None);
        assert_eq!(list_suffix("ServerRack-2", "Server"), None);
    }

    #[test]
    fn base_is_list_count_when_numbering_is_dense() {
        let mut c = ListCounts::new();
        assert_eq!(c.observe("Server", ["Server-1", "Server-2"]), 2);
        assert_eq!(c.next_label("Server", &BTreeSet::new()), "Server-3");
        assert_eq!(c.next_label("Server", &BTreeSet::new()), "Server-4");
    }

    #[test]
    fn base_follows_highest_suffix_across_gaps() {
        let mut c = ListCounts::new();
        assert_eq!(c.observe("Server", ["Server-1", "Server-7"]), 7);
        assert_eq!(c.next_label("Server", &BTreeSet::new()), "Server-8");
    }

    #[test]
    fn taken_labels_are_skipped() {
        let mut c = ListCounts::new();
        c.observe("Asset", ["Asset"]);
        let taken: BTreeSet<String> = ["Asset-2".to_string(), "Asset-3".to_string()].into();
        assert_eq!(c.next_label("Asset", &taken), "Asset-4");
        assert_eq!(c.get("Asset"), 4);
    }

    #[test]
    fn unseen_type_starts_at_one() {
        let mut c = ListCounts::new();
        assert_eq!(c.observe("Asset", std::iter::empty()), 0);
        assert_eq!(c.next_label("Asset", &BTreeSet::new()), "Asset-1");
    }
}
