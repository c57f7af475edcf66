//! Reads the locally persisted provider configuration to decide whether the
//! user holds their own API key.
//!
//! The file is a JSON object keyed by provider id:
//!
//! ```json
//! { "openai": { "apiKey": "sk-...", "model": "gpt-4o" }, "anthropic": {} }
//! ```
//!
//! Any entry with a non-blank `apiKey` counts as a bypass credential.  A
//! missing or malformed file means "no credential"; it is never an error.

use std::path::PathBuf;

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    path: PathBuf,
}

impl ProviderCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Re-read the file and report whether any provider has a key.
    pub fn has_any_key(&self) -> bool {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => any_non_empty_key(&raw),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %self.path.display(), error = %e, "provider config unreadable");
                }
                false
            }
        }
    }
}

/// `true` when some entry of the JSON object (or array) carries a non-blank
/// string `apiKey`.
pub fn any_non_empty_key(raw: &str) -> bool {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "provider config is not valid JSON, assuming no key");
            return false;
        }
    };

    let entries: Box<dyn Iterator<Item = &Value> + '_> = match &parsed {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => return false,
    };

    let found = entries
        .filter_map(|entry| entry.get("apiKey").and_then(Value::as_str))
        .any(|key| !key.trim().is_empty());
    found
}
