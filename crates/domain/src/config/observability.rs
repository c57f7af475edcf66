use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `[observability]`: the gateway always logs JSON to stdout; spans are
/// also shipped to a collector once `otlp_endpoint` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Collector address, gRPC.  Unset or blank means no export.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Reported as `service.name`.
    #[serde(default = "d_service_name")]
    pub service_name: String,

    /// Fraction of traces exported.  See [`sample_ratio`](Self::sample_ratio).
    #[serde(default = "d_sample_rate")]
    pub sample_rate: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: d_service_name(),
            sample_rate: d_sample_rate(),
        }
    }
}

impl ObservabilityConfig {
    /// The endpoint to export to.  A blank value counts as unset so a
    /// templated config can leave it empty.
    pub fn export_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// `sample_rate` clamped to `0.0..=1.0`; NaN exports nothing.
    pub fn sample_ratio(&self) -> f64 {
        if self.sample_rate.is_nan() {
            0.0
        } else {
            self.sample_rate.clamp(0.0, 1.0)
        }
    }
}

fn d_service_name() -> String {
    "quotagate".into()
}

fn d_sample_rate() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: ObservabilityConfig = toml::from_str("").unwrap();
        assert!(cfg.otlp_endpoint.is_none());
        assert_eq!(cfg.service_name, "quotagate");
        assert!((cfg.sample_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialize_with_endpoint() {
        let toml_str = r#"
            otlp_endpoint = "http://localhost:4317"
            service_name = "quota-edge"
            sample_rate = 0.5
        "#;
        let cfg: ObservabilityConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.otlp_endpoint.as_deref(), Some("http://localhost:4317"));
        assert_eq!(cfg.service_name, "quota-edge");
        assert!((cfg.sample_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn blank_endpoint_disables_export() {
        let cfg = ObservabilityConfig {
            otlp_endpoint: Some("   ".into()),
            ..ObservabilityConfig::default()
        };
        assert_eq!(cfg.export_endpoint(), None);

        let cfg = ObservabilityConfig {
            otlp_endpoint: Some(" http://otel:4317 ".into()),
            ..ObservabilityConfig::default()
        };
        assert_eq!(cfg.export_endpoint(), Some("http://otel:4317"));
    }

    #[test]
    fn sample_ratio_is_clamped() {
        let with = |rate: f64| ObservabilityConfig {
            sample_rate: rate,
            ..ObservabilityConfig::default()
        };
        assert_eq!(with(1.5).sample_ratio(), 1.0);
        assert_eq!(with(-0.2).sample_ratio(), 0.0);
        assert_eq!(with(0.25).sample_ratio(), 0.25);
        assert_eq!(with(f64::NAN).sample_ratio(), 0.0);
    }
}
