//! Typed settings read from the merged config JSON.
//!
//! Every pointer read here must also appear in [`crate::consumed_pointers`].
//! Validation happens once, before any network activity: a missing required
//! key is `CONFIG_MISSING_KEY`, a present key with a bad value is
//! `CONFIG_INVALID_VALUE`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tsync_reconcile::MembershipRule;

pub const DEFAULT_SOURCE_TOKEN_ENV: &str = "TSYNC_SOURCE_TOKEN";
pub const DEFAULT_DESTINATION_TOKEN_ENV: &str = "TSYNC_DESTINATION_TOKEN";
pub const DEFAULT_WRITE_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_EXPORTS_DIR: &str = "exports";

// ----- Enums -----

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    ObjectQuery,
    Csv,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::ObjectQuery => "object_query",
            SourceKind::Csv => "csv",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "object_query" => Some(SourceKind::ObjectQuery),
            "csv" => Some(SourceKind::Csv),
            _ => None,
        }
    }
}

/// What the pass does when the destination lists cannot be read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorPolicy {
    /// Stop before planning; nothing is written.
    #[default]
    Abort,
    /// Plan against an empty destination (create-only).
    ProceedEmpty,
}

impl FetchErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorPolicy::Abort => "abort",
            FetchErrorPolicy::ProceedEmpty => "proceed_empty",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Some(FetchErrorPolicy::Abort),
            "proceed_empty" => Some(FetchErrorPolicy::ProceedEmpty),
            _ => None,
        }
    }
}

// ----- Settings -----

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectQuerySettings {
    pub base_url: String,
    pub query: String,
    pub page_size: u32,
    pub token_env: String,
    pub request_timeout: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSettings {
    ObjectQuery(ObjectQuerySettings),
    Csv { path: PathBuf },
}

impl SourceSettings {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceSettings::ObjectQuery(_) => SourceKind::ObjectQuery,
            SourceSettings::Csv { .. } => SourceKind::Csv,
        }
    }

    /// Env var name of the source bearer credential, when the source needs one.
    pub fn token_env(&self) -> Option<&str> {
        match self {
            SourceSettings::ObjectQuery(q) => Some(&q.token_env),
            SourceSettings::Csv { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestinationSettings {
    pub base_url: String,
    pub token_env: String,
    pub write_delay: Duration,
    pub on_fetch_error: FetchErrorPolicy,
    pub request_timeout: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSettings {
    pub dry_run: bool,
    pub exports_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncSettings {
    pub source: SourceSettings,
    pub destination: DestinationSettings,
    pub membership: MembershipRule,
    pub run: RunSettings,
}

impl SyncSettings {
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let kind = match opt_str(config, "/source/kind")? {
            None => SourceKind::default(),
            Some(s) => match SourceKind::parse(&s) {
                Some(k) => k,
                None => bail!(
                    "CONFIG_INVALID_VALUE /source/kind='{s}'; expected one of: object_query | csv"
                ),
            },
        };

        let source = match kind {
            SourceKind::ObjectQuery => {
                let page_size = req_u64(config, "/source/page_size")?;
                if page_size == 0 || page_size > u64::from(u32::MAX) {
                    bail!("CONFIG_INVALID_VALUE /source/page_size={page_size}; must be > 0");
                }
                SourceSettings::ObjectQuery(ObjectQuerySettings {
                    base_url: req_str(config, "/source/base_url")?,
                    query: req_str(config, "/source/query")?,
                    page_size: page_size as u32,
                    token_env: opt_str(config, "/source/token_env")?
                        .unwrap_or_else(|| DEFAULT_SOURCE_TOKEN_ENV.to_string()),
                    request_timeout: timeout(config, "/source/request_timeout_secs")?,
                })
            }
            SourceKind::Csv => SourceSettings::Csv {
                path: PathBuf::from(req_str(config, "/source/csv_path")?),
            },
        };

        let on_fetch_error = match opt_str(config, "/destination/on_fetch_error")? {
            None => FetchErrorPolicy::default(),
            Some(s) => match FetchErrorPolicy::parse(&s) {
                Some(p) => p,
                None => bail!(
                    "CONFIG_INVALID_VALUE /destination/on_fetch_error='{s}'; \
                     expected one of: abort | proceed_empty"
                ),
            },
        };

        let destination = DestinationSettings {
            base_url: req_str(config, "/destination/base_url")?,
            token_env: opt_str(config, "/destination/token_env")?
                .unwrap_or_else(|| DEFAULT_DESTINATION_TOKEN_ENV.to_string()),
            write_delay: Duration::from_millis(
                opt_u64(config, "/destination/write_delay_ms")?.unwrap_or(DEFAULT_WRITE_DELAY_MS),
            ),
            on_fetch_error,
            request_timeout: timeout(config, "/destination/request_timeout_secs")?,
        };

        let membership = match opt_str(config, "/reconcile/membership")? {
            None => MembershipRule::default(),
            Some(s) => match s.parse::<MembershipRule>() {
                Ok(m) => m,
                Err(e) => bail!("CONFIG_INVALID_VALUE /reconcile/membership: {e}"),
            },
        };

        let run = RunSettings {
            dry_run: opt_bool(config, "/run/dry_run")?.unwrap_or(false),
            exports_dir: PathBuf::from(
                opt_str(config, "/run/exports_dir")?
                    .unwrap_or_else(|| DEFAULT_EXPORTS_DIR.to_string()),
            ),
        };

        Ok(Self {
            source,
            destination,
            membership,
            run,
        })
    }
}

// ----- Pointer readers -----

fn opt_str(config: &Value, pointer: &str) -> Result<Option<String>> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => bail!("CONFIG_INVALID_VALUE {pointer}={other}; expected a string"),
    }
}

fn req_str(config: &Value, pointer: &str) -> Result<String> {
    match opt_str(config, pointer)? {
        Some(s) => Ok(s),
        None => bail!("CONFIG_MISSING_KEY {pointer}"),
    }
}

fn opt_u64(config: &Value, pointer: &str) -> Result<Option<u64>> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_u64() {
            Some(n) => Ok(Some(n)),
            None => bail!("CONFIG_INVALID_VALUE {pointer}={v}; expected a non-negative integer"),
        },
    }
}

fn req_u64(config: &Value, pointer: &str) -> Result<u64> {
    match opt_u64(config, pointer)? {
        Some(n) => Ok(n),
        None => bail!("CONFIG_MISSING_KEY {pointer}"),
    }
}

fn opt_bool(config: &Value, pointer: &str) -> Result<Option<bool>> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => bail!("CONFIG_INVALID_VALUE {pointer}={other}; expected true or false"),
    }
}

fn timeout(config: &Value, pointer: &str) -> Result<Duration> {
    let secs = opt_u64(config, pointer)?.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if secs == 0 {
        bail!("CONFIG_INVALID_VALUE {pointer}=0; must be > 0");
    }
    Ok(Duration::from_secs(secs))
}
