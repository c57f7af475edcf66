//! `quotagate quota`: exercise the configured mirror backend from a shell.

use std::sync::Arc;

use anyhow::Context;

use qg_domain::clock::SystemClock;
use qg_domain::config::Config;
use qg_domain::quota::{ConsumeOutcome, ConsumeResponse};
use qg_mirror::{ConsumeDecision, QuotaMirror};

/// Sync once and print the view.  A failed sync still prints (stale) state.
pub async fn status(config: &Config) -> anyhow::Result<()> {
    let mirror = QuotaMirror::from_config(config, Arc::new(SystemClock)).context("building quota mirror")?;
    mirror.refresh().await;
    let view = mirror.view();
    if view.last_synced_at.is_none() {
        eprintln!("warning: could not reach the quota backend, showing local defaults");
    }
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

/// Consume one unit.  Returns `false` when the quota is exhausted.
///
/// `--own-key` sends the bypass claim straight to the backend; otherwise the
/// mirror decides, honouring any key in the provider config file.
pub async fn consume(config: &Config, own_key: bool) -> anyhow::Result<bool> {
    if own_key {
        let backend = qg_mirror::create_backend(config, Arc::new(SystemClock))
            .context("building quota backend")?;
        let outcome = backend
            .consume(true)
            .await
            .context("quota backend did not answer")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&ConsumeResponse::from(&outcome))?
        );
        return Ok(!matches!(outcome, ConsumeOutcome::Exhausted { .. }));
    }

    let mirror = QuotaMirror::from_config(config, Arc::new(SystemClock)).context("building quota mirror")?;
    let decision = mirror.check_and_consume().await;
    let view = mirror.view();
    match &decision {
        ConsumeDecision::Bypassed => println!("bypassed: own API key configured, quota not consumed"),
        ConsumeDecision::Granted => println!(
            "granted: {}/{} used, {} remaining, resets in {}",
            view.used, view.limit, view.remaining, view.time_until_reset
        ),
        ConsumeDecision::Unverified => {
            println!("allowed: quota backend unreachable, consumption not recorded")
        }
        ConsumeDecision::Denied {
            message,
            reset_in_ms,
        } => println!(
            "denied: {message}, resets in {}",
            qg_domain::clock::format_time_remaining(*reset_in_ms)
        ),
    }
    Ok(decision.is_allowed())
}
