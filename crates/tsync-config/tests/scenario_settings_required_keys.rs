//! Required settings fail closed before any network activity.
//!
//! Failure tests for credentials use sentinel env var names that are never
//! set anywhere, so no test mutates the process environment.

use tsync_config::{
    load_layered_yaml_from_strings, resolve_secrets, FetchErrorPolicy, SyncSettings,
};
use tsync_reconcile::MembershipRule;

const FULL_YAML: &str = r#"
source:
  base_url: "https://jira.example.com"
  query: "objectType IN (Server)"
  page_size: 100
  token_env: "TSYNC_SENTINEL_SRC_UNSET_7Q"
  request_timeout_secs: 10
destination:
  base_url: "https://feedly.example.com/v3/collections/abc/feeds"
  token_env: "TSYNC_SENTINEL_DST_UNSET_7Q"
  write_delay_ms: 250
  on_fetch_error: proceed_empty
reconcile:
  membership: delimited
run:
  dry_run: true
  exports_dir: "out"
"#;

fn settings(yaml: &str) -> anyhow::Result<SyncSettings> {
    let loaded = load_layered_yaml_from_strings(&[yaml])?;
    SyncSettings::from_config_json(&loaded.config_json)
}

#[test]
fn full_config_is_read_verbatim() {
    let s = settings(FULL_YAML).unwrap();
    assert_eq!(s.destination.write_delay.as_millis(), 250);
    assert_eq!(s.destination.on_fetch_error, FetchErrorPolicy::ProceedEmpty);
    assert_eq!(s.membership, MembershipRule::Delimited);
    assert!(s.run.dry_run);
    assert_eq!(s.run.exports_dir.to_string_lossy(), "out");
    match &s.source {
        tsync_config::settings::SourceSettings::ObjectQuery(q) => {
            assert_eq!(q.page_size, 100);
            assert_eq!(q.request_timeout.as_secs(), 10);
        }
        other => panic!("unexpected source {other:?}"),
    }
}

#[test]
fn each_required_key_is_enforced() {
    for (key, line) in [
        ("/source/base_url", "  base_url: \"https://jira.example.com\"\n"),
        ("/source/query", "  query: \"objectType IN (Server)\"\n"),
        ("/source/page_size", "  page_size: 100\n"),
    ] {
        let yaml = FULL_YAML.replacen(line, "", 1);
        let err = settings(&yaml).unwrap_err().to_string();
        assert!(err.contains(&format!("CONFIG_MISSING_KEY {key}")), "{key}: {err}");
    }

    let yaml = FULL_YAML.replace(
        "  base_url: \"https://feedly.example.com/v3/collections/abc/feeds\"\n",
        "",
    );
    let err = settings(&yaml).unwrap_err().to_string();
    assert!(err.contains("CONFIG_MISSING_KEY /destination/base_url"), "{err}");
}

#[test]
fn zero_page_size_is_invalid() {
    let yaml = FULL_YAML.replace("page_size: 100", "page_size: 0");
    let err = settings(&yaml).unwrap_err().to_string();
    assert!(err.contains("CONFIG_INVALID_VALUE /source/page_size"), "{err}");
}

#[test]
fn unknown_enum_values_are_invalid() {
    let yaml = FULL_YAML.replace("membership: delimited", "membership: suffix");
    let err = settings(&yaml).unwrap_err().to_string();
    assert!(err.contains("CONFIG_INVALID_VALUE /reconcile/membership"), "{err}");

    let yaml = FULL_YAML.replace("on_fetch_error: proceed_empty", "on_fetch_error: retry");
    let err = settings(&yaml).unwrap_err().to_string();
    assert!(err.contains("CONFIG_INVALID_VALUE /destination/on_fetch_error"), "{err}");

    let yaml = FULL_YAML.replacen("source:\n", "source:\n  kind: ldap\n", 1);
    let err = settings(&yaml).unwrap_err().to_string();
    assert!(err.contains("CONFIG_INVALID_VALUE /source/kind"), "{err}");
}

#[test]
fn csv_kind_requires_csv_path() {
    let yaml = "source:\n  kind: csv\ndestination:\n  base_url: \"https://d.example.com\"\n";
    let err = settings(yaml).unwrap_err().to_string();
    assert!(err.contains("CONFIG_MISSING_KEY /source/csv_path"), "{err}");
}

#[test]
fn missing_credential_names_the_variable_only() {
    let s = settings(FULL_YAML).unwrap();
    let err = resolve_secrets(&s).unwrap_err().to_string();
    assert!(err.contains("SECRETS_MISSING"), "{err}");
    assert!(err.contains("TSYNC_SENTINEL_SRC_UNSET_7Q"), "{err}");
}

#[test]
fn resolved_secrets_debug_is_redacted() {
    let s = settings(FULL_YAML).unwrap();
    let resolved =
        tsync_config::resolve_secrets_with(&s, |_| Some("tok-123456789".into())).unwrap();
    let dbg = format!("{resolved:?}");
    assert!(dbg.contains("<REDACTED>"));
    assert!(!dbg.contains("tok-123456789"));
}
