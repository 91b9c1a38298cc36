//! Bearer credential resolution.
//!
//! # Contract
//! - Config stores only **env var NAMES** (`/source/token_env`,
//!   `/destination/token_env`).
//! - Callers resolve once at start-up and pass [`ResolvedSecrets`] into the
//!   HTTP clients; nothing else reads these variables.
//! - `Debug` redacts values. Errors name the variable, never the value.

use anyhow::{bail, Result};

use crate::settings::SyncSettings;

/// Credentials for one pass. **Values are redacted in `Debug` output.**
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// `None` when the configured source needs no credential (CSV).
    pub source_token: Option<String>,
    pub destination_token: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("source_token", &self.source_token.as_ref().map(|_| "<REDACTED>"))
            .field("destination_token", &"<REDACTED>")
            .finish()
    }
}

/// Resolve a named environment variable. Blank values count as unset.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve both credentials from the process environment.
pub fn resolve_secrets(settings: &SyncSettings) -> Result<ResolvedSecrets> {
    resolve_secrets_with(settings, resolve_env)
}

/// Same as [`resolve_secrets`] with an explicit variable lookup.
pub fn resolve_secrets_with<F>(settings: &SyncSettings, lookup: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let source_token = match settings.source.token_env() {
        None => None,
        Some(var) => match lookup(var) {
            Some(v) => Some(v),
            None => bail!(
                "SECRETS_MISSING source={}: required env var '{}' (source bearer token) \
                 is not set or empty",
                settings.source.kind().as_str(),
                var,
            ),
        },
    };

    let var = &settings.destination.token_env;
    let Some(destination_token) = lookup(var) else {
        bail!(
            "SECRETS_MISSING: required env var '{}' (destination bearer token) \
             is not set or empty",
            var,
        );
    };

    Ok(ResolvedSecrets {
        source_token,
        destination_token,
    })
}
