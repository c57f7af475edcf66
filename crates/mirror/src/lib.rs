//! `qg-mirror`: client side of the shared daily quota.
//!
//! Provides the [`QuotaBackend`] trait that abstracts over where the
//! counter lives, two implementations of it, and the [`QuotaMirror`] that
//! a UI process holds: a local copy of the numbers, the bypass override for
//! users with their own API key, and a countdown to the next reset.
//!
//! # Backend selection
//!
//! Use [`create_backend`] to build the implementation named by the
//! `mirror.backend` config field:
//!
//! | Backend  | Implementation        | Counter is shared by            |
//! |----------|-----------------------|---------------------------------|
//! | `remote` | `RemoteQuotaBackend`  | every client of one gateway     |
//! | `local`  | `LocalQuotaBackend`   | processes on this machine only  |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use qg_domain::clock::SystemClock;
//! use qg_domain::config::Config;
//! use qg_mirror::QuotaMirror;
//!
//! # async fn example() -> qg_domain::error::Result<()> {
//! let mirror = QuotaMirror::from_config(&Config::default(), Arc::new(SystemClock))?;
//! mirror.refresh().await;
//! if mirror.check_and_consume().await.is_allowed() {
//!     // run the AI-backed action
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod credentials;
pub mod local;
pub mod mirror;
pub mod remote;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use backend::QuotaBackend;
pub use credentials::ProviderCredentials;
pub use local::LocalQuotaBackend;
pub use mirror::{ConsumeDecision, QuotaMirror, QuotaView};
pub use remote::{from_reqwest, RemoteQuotaBackend};

use std::sync::Arc;

use chrono_tz::Tz;

use qg_domain::clock::Clock;
use qg_domain::config::{Config, MirrorBackend, QuotaConfig};
use qg_domain::error::{Error, Result};

/// Create the [`QuotaBackend`] named by `cfg.mirror.backend`.
///
/// The local backend counts against `cfg.quota.daily_limit` and rolls over
/// at midnight in `cfg.quota.timezone`; the remote one gets both from the
/// gateway.
pub fn create_backend(cfg: &Config, clock: Arc<dyn Clock>) -> Result<Arc<dyn QuotaBackend>> {
    let mirror = &cfg.mirror;
    match mirror.backend {
        MirrorBackend::Remote => {
            tracing::info!(base_url = %mirror.base_url, "using remote quota backend");
            Ok(Arc::new(RemoteQuotaBackend::new(mirror)?))
        }
        MirrorBackend::Local => {
            tracing::info!(
                path = %mirror.local_state_path.display(),
                limit = cfg.quota.daily_limit,
                "using local quota backend"
            );
            Ok(Arc::new(LocalQuotaBackend::new(
                &mirror.local_state_path,
                cfg.quota.daily_limit,
                quota_tz(&cfg.quota)?,
                clock,
            )))
        }
    }
}

pub(crate) fn quota_tz(cfg: &QuotaConfig) -> Result<Tz> {
    cfg.tz()
        .ok_or_else(|| Error::Config(format!("unknown timezone {:?}", cfg.timezone)))
}
