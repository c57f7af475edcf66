pub mod config;
pub mod prompt;
pub mod quota;

use clap::{Parser, Subcommand};

/// quotagate: a shared daily quota for AI-backed actions.
#[derive(Debug, Parser)]
#[command(name = "quotagate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the quota server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Query or consume the quota through the configured mirror backend.
    #[command(subcommand)]
    Quota(QuotaCommand),
    /// Print the system prompt for a model.
    Prompt {
        /// Model id (e.g. "claude-opus-4-5"). Omit for the default prompt.
        #[arg(long)]
        model: Option<String>,
        /// Use the minimal (unstyled) diagram style.
        #[arg(long)]
        minimal: bool,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

#[derive(Debug, Subcommand)]
pub enum QuotaCommand {
    /// Sync once and print the mirror's view as JSON.
    Status,
    /// Take one unit of the shared quota.
    Consume {
        /// Claim an own API key: the quota is not consumed.
        #[arg(long)]
        own_key: bool,
    },
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `QG_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.
///
/// [`Config`]: qg_domain::config::Config
pub fn load_config() -> anyhow::Result<(qg_domain::config::Config, String)> {
    let config_path = std::env::var("QG_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

/// Parse `path`, or return defaults when it does not exist.
pub fn load_config_from(path: &str) -> anyhow::Result<qg_domain::config::Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(qg_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))
}
