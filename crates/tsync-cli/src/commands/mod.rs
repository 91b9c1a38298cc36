//! Command handlers for the `tsync` binary.
//!
//! Shared config helpers live here; command-specific logic lives in the
//! submodules.

pub mod plan;
pub mod sync;

use anyhow::{Context, Result};
use tracing::warn;
use tsync_config::{
    load_layered_yaml, report_unused_keys, resolve_secrets, LoadedConfig, SyncSettings,
    UnusedKeyPolicy, UnusedKeyReport,
};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load layered config and validate typed settings. Fails before any network
/// activity.
pub fn load_settings(config_paths: &[String]) -> Result<(LoadedConfig, SyncSettings)> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    let settings = SyncSettings::from_config_json(&loaded.config_json)
        .context("invalid sync settings")?;
    Ok((loaded, settings))
}

pub fn unused_keys(
    loaded: &LoadedConfig,
    settings: &SyncSettings,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let report = report_unused_keys(settings.source.kind(), &loaded.config_json, policy)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "config key is not read by anything");
    }
    Ok(report)
}

/// `tsync config-check`: settings, credentials and unused keys.
pub fn config_check(config_paths: &[String], strict: bool) -> Result<()> {
    let (loaded, settings) = load_settings(config_paths)?;

    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let unused = unused_keys(&loaded, &settings, policy)?;

    // Resolved only to prove presence; values are dropped immediately.
    let _secrets = resolve_secrets(&settings)?;

    println!("config_hash={}", loaded.config_hash);
    println!("source_kind={}", settings.source.kind().as_str());
    println!("membership={}", settings.membership.as_str());
    println!("dry_run={}", settings.run.dry_run);
    println!("unused_keys={}", unused.unused_leaf_pointers.len());
    for ptr in &unused.unused_leaf_pointers {
        println!("unused={ptr}");
    }
    println!("config_ok=true");
    Ok(())
}
