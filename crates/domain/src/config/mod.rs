mod mirror;
mod observability;
mod quota;
mod server;

pub use mirror::*;
pub use observability::*;
pub use quota::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |severity, field: &str, message: &str| {
            errors.push(ConfigError {
                severity,
                field: field.into(),
                message: message.into(),
            });
        };

        if self.server.port == 0 {
            push(ConfigSeverity::Error, "server.port", "port must be greater than 0");
        }
        if self.server.host.is_empty() {
            push(ConfigSeverity::Error, "server.host", "host must not be empty");
        }
        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*" {
            push(
                ConfigSeverity::Warning,
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            );
        }

        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 {
                push(
                    ConfigSeverity::Error,
                    "server.rate_limit.requests_per_second",
                    "requests_per_second must be greater than 0",
                );
            }
            if rl.burst_size == 0 {
                push(
                    ConfigSeverity::Error,
                    "server.rate_limit.burst_size",
                    "burst_size must be greater than 0",
                );
            }
        }

        if self.quota.daily_limit == 0 {
            push(
                ConfigSeverity::Warning,
                "quota.daily_limit",
                "daily_limit is 0; every request without its own API key will be refused",
            );
        }
        if self.quota.tz().is_none() {
            push(
                ConfigSeverity::Error,
                "quota.timezone",
                "unknown IANA timezone name",
            );
        }

        if self.mirror.backend == MirrorBackend::Remote && self.mirror.base_url.trim().is_empty() {
            push(
                ConfigSeverity::Error,
                "mirror.base_url",
                "base_url must not be empty for the remote backend",
            );
        }
        if self.mirror.timeout_ms == 0 {
            push(ConfigSeverity::Error, "mirror.timeout_ms", "timeout must be greater than 0");
        }
        if self.mirror.refresh_interval_secs == 0 {
            push(
                ConfigSeverity::Error,
                "mirror.refresh_interval_secs",
                "refresh interval must be greater than 0",
            );
        }
        if self.mirror.tick_interval_ms == 0 {
            push(
                ConfigSeverity::Error,
                "mirror.tick_interval_ms",
                "tick interval must be greater than 0",
            );
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            push(
                ConfigSeverity::Warning,
                "observability.sample_rate",
                "sample_rate outside [0.0, 1.0] is clamped by the exporter",
            );
        }

        errors
    }
}
