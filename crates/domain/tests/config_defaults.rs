use qg_domain::config::{Config, ConfigSeverity, MirrorBackend};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn default_config_validates_cleanly() {
    let config = Config::default();
    assert!(config.validate().is_empty());
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8080

[quota]
daily_limit = 50
timezone = "UTC"

[mirror]
backend = "local"
refresh_interval_secs = 10
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.quota.daily_limit, 50);
    assert_eq!(config.mirror.backend, MirrorBackend::Local);
    assert_eq!(config.mirror.refresh_interval_secs, 10);
    assert!(config.validate().is_empty());
}

#[test]
fn unknown_timezone_is_an_error() {
    let toml_str = r#"
[quota]
timezone = "Atlantis/Capital"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.field == "quota.timezone" && i.severity == ConfigSeverity::Error));
}

#[test]
fn zero_limit_is_only_a_warning() {
    let toml_str = r#"
[quota]
daily_limit = 0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, ConfigSeverity::Warning);
}

#[test]
fn zero_intervals_are_errors() {
    let toml_str = r#"
[server]
port = 0

[mirror]
tick_interval_ms = 0
refresh_interval_secs = 0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let fields: Vec<String> = config.validate().into_iter().map(|i| i.field).collect();
    assert!(fields.contains(&"server.port".to_string()));
    assert!(fields.contains(&"mirror.tick_interval_ms".to_string()));
    assert!(fields.contains(&"mirror.refresh_interval_secs".to_string()));
}

#[test]
fn zero_rate_limit_values_are_errors() {
    let toml_str = r#"
[server.rate_limit]
requests_per_second = 0
burst_size = 0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
    assert!(fields.contains(&"server.rate_limit.requests_per_second"));
    assert!(fields.contains(&"server.rate_limit.burst_size"));
    assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Error));
}
