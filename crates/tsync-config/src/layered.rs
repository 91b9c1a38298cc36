//! Layered loading: read, merge, guard, hash.

use std::fs;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Credential shapes that must never appear as a literal config value.
/// Config files name the env var that holds a token instead.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "glpat-",
    "xoxb-",
    "ATATT", // Atlassian API token
    "eyJ",   // JWT
    "Bearer ",
];

/// Shorter strings are never treated as credentials.
const SECRET_MIN_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// SHA-256 (hex) of `canonical_json`.
    pub config_hash: String,
    /// Compact JSON with object keys sorted.
    pub canonical_json: String,
    pub config_json: Value,
}

/// Read `paths` in order and merge them; later files win.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("CONFIG_READ_FAILED path={p}")))
        .collect::<Result<Vec<String>>>()?;
    let docs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&docs)
}

pub fn load_layered_yaml_from_strings(docs: &[&str]) -> Result<LoadedConfig> {
    if docs.is_empty() {
        bail!("CONFIG_EMPTY: at least one config document is required");
    }

    let mut merged = Value::Object(Map::new());
    for (i, doc) in docs.iter().enumerate() {
        let parsed: serde_yaml::Value = serde_yaml::from_str(doc)
            .with_context(|| format!("CONFIG_INVALID_SYNTAX document #{i}"))?;
        let layer = serde_json::to_value(parsed)
            .with_context(|| format!("CONFIG_INVALID_SYNTAX document #{i} is not JSON-compatible"))?;
        overlay(&mut merged, layer);
    }

    reject_secret_literals(&merged)?;

    // serde_json's default map keeps keys sorted, so this is canonical.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));

    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; anything else in `layer` replaces `base`.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (k, v) in layer {
                match base.get_mut(&k) {
                    Some(slot) => overlay(slot, v),
                    None => {
                        base.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

fn reject_secret_literals(v: &Value) -> Result<()> {
    let hit = crate::leaves(v)
        .into_iter()
        .find(|(_, leaf)| leaf.as_str().is_some_and(looks_like_secret));
    match hit {
        Some((ptr, _)) => bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED"),
        None => Ok(()),
    }
}

fn looks_like_secret(s: &str) -> bool {
    let s = s.trim();
    s.len() >= SECRET_MIN_LEN && SECRET_PREFIXES.iter().any(|p| s.starts_with(p))
}
