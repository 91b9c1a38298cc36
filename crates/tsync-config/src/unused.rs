//! Config keys nothing reads.
//!
//! Each source kind has a table of JSON-pointer prefixes the settings reader
//! consumes. A prefix covers a leaf when it equals it or ends at a segment
//! boundary of it: `/run` covers `/run/dry_run` but not `/runtime`.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedKeyReport {
    pub source_kind: &'static str,
    /// Sorted leaf pointers no prefix covers.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Prefixes read by `SyncSettings::from_config_json` for `kind`.
pub fn consumed_pointers(kind: SourceKind) -> &'static [&'static str] {
    match kind {
        SourceKind::ObjectQuery => &[
            "/source/kind",
            "/source/base_url",
            "/source/query",
            "/source/page_size",
            "/source/token_env",
            "/source/request_timeout_secs",
            "/destination",
            "/reconcile/membership",
            "/run",
        ],
        SourceKind::Csv => &[
            "/source/kind",
            "/source/csv_path",
            "/destination",
            "/reconcile/membership",
            "/run",
        ],
    }
}

/// List the leaves of `config_json` that `kind` does not read. Under
/// [`UnusedKeyPolicy::Fail`] a non-empty list is an error.
pub fn report_unused_keys(
    kind: SourceKind,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let prefixes = consumed_pointers(kind);
    let mut unused: Vec<String> = crate::leaves(config_json)
        .into_iter()
        .map(|(ptr, _)| ptr)
        .filter(|ptr| !prefixes.iter().any(|p| covers(p, ptr)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        source_kind: kind.as_str(),
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let shown: Vec<&str> = report
            .unused_leaf_pointers
            .iter()
            .take(12)
            .map(String::as_str)
            .collect();
        bail!(
            "CONFIG_UNUSED_KEYS (source={}): {} key(s) are not read: {}",
            report.source_kind,
            report.unused_leaf_pointers.len(),
            shown.join(", ")
        );
    }
    Ok(report)
}

fn covers(prefix: &str, leaf: &str) -> bool {
    leaf.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefix_covers_only_whole_segments() {
        assert!(covers("/run", "/run/dry_run"));
        assert!(covers("/run", "/run"));
        assert!(!covers("/run", "/runtime/x"));
        assert!(!covers("/source/query", "/source/query_v2"));
    }

    #[test]
    fn csv_kind_flags_object_query_keys() {
        let cfg = json!({
            "source": {"kind": "csv", "csv_path": "a.csv", "query": "x"},
            "destination": {"base_url": "https://d.example.com"}
        });
        let r = report_unused_keys(SourceKind::Csv, &cfg, UnusedKeyPolicy::Warn).unwrap();
        assert_eq!(r.unused_leaf_pointers, vec!["/source/query"]);
        assert!(report_unused_keys(SourceKind::Csv, &cfg, UnusedKeyPolicy::Fail).is_err());
    }
}
