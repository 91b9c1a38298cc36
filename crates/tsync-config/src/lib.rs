//! Configuration for `tsync`.
//!
//! YAML (or JSON) documents are merged in order into one JSON value, checked
//! for pasted credentials, hashed, and then read into [`SyncSettings`].
//! Credentials themselves come from the environment ([`resolve_secrets`]).

mod layered;
pub mod secrets;
pub mod settings;
mod unused;

pub use layered::{load_layered_yaml, load_layered_yaml_from_strings, LoadedConfig};
pub use secrets::{resolve_secrets, resolve_secrets_with, ResolvedSecrets};
pub use settings::{FetchErrorPolicy, SourceKind, SyncSettings};
pub use unused::{consumed_pointers, report_unused_keys, UnusedKeyPolicy, UnusedKeyReport};

/// Every scalar leaf of `v` with its JSON pointer, in map-key order.
/// A scalar root is reported as `/`.
pub(crate) fn leaves(v: &serde_json::Value) -> Vec<(String, &serde_json::Value)> {
    use serde_json::Value;

    fn walk<'v>(v: &'v Value, at: &mut String, out: &mut Vec<(String, &'v Value)>) {
        let mark = at.len();
        match v {
            Value::Object(map) => {
                for (k, child) in map {
                    at.push('/');
                    at.push_str(&k.replace('~', "~0").replace('/', "~1"));
                    walk(child, at, out);
                    at.truncate(mark);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    at.push('/');
                    at.push_str(&i.to_string());
                    walk(child, at, out);
                    at.truncate(mark);
                }
            }
            scalar => {
                let ptr = if at.is_empty() { "/".to_string() } else { at.clone() };
                out.push((ptr, scalar));
            }
        }
    }

    let mut out = Vec::new();
    walk(v, &mut String::new(), &mut out);
    out
}
