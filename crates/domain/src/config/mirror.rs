use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client-side quota mirror
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the mirror gets its quota numbers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MirrorBackend {
    /// The shared counter served by a quotagate gateway.
    #[default]
    Remote,
    /// A per-machine counter persisted to `local_state_path`.
    Local,
}

/// Client-side settings.  The limit and the reset timezone come from
/// `[quota]`, the same values the server uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub backend: MirrorBackend,
    /// Gateway base URL for the remote backend.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Bound on every backend call.  Expiry is treated as a network error.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    /// How often the mirror re-reads the store to pick up other users'
    /// consumption.
    #[serde(default = "d_refresh_secs")]
    pub refresh_interval_secs: u64,
    /// Countdown tick.
    #[serde(default = "d_tick_ms")]
    pub tick_interval_ms: u64,
    /// JSON object of `provider_id -> { "apiKey": ... }`.
    #[serde(default = "d_provider_config_path")]
    pub provider_config_path: PathBuf,
    /// Counter file for the local backend.
    #[serde(default = "d_local_state_path")]
    pub local_state_path: PathBuf,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            backend: MirrorBackend::default(),
            base_url: d_base_url(),
            timeout_ms: d_timeout_ms(),
            refresh_interval_secs: d_refresh_secs(),
            tick_interval_ms: d_tick_ms(),
            provider_config_path: d_provider_config_path(),
            local_state_path: d_local_state_path(),
        }
    }
}

fn d_base_url() -> String {
    "http://127.0.0.1:3210".into()
}
fn d_timeout_ms() -> u64 {
    10_000
}
fn d_refresh_secs() -> u64 {
    30
}
fn d_tick_ms() -> u64 {
    1000
}
fn d_provider_config_path() -> PathBuf {
    PathBuf::from("./data/model-configs.json")
}
fn d_local_state_path() -> PathBuf {
    PathBuf::from("./data/local-quota.json")
}
