use std::sync::Arc;

use qg_domain::clock::Clock;
use qg_domain::config::Config;

use crate::runtime::quota::QuotaStore;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub quota: Arc<QuotaStore>,
}

impl AppState {
    /// Build the quota store from `config.quota`. Fails on an unknown timezone.
    pub fn new(config: Arc<Config>, clock: Arc<dyn Clock>) -> qg_domain::error::Result<Self> {
        let quota = QuotaStore::from_config(&config.quota, clock)?;
        Ok(Self {
            config,
            quota: Arc::new(quota),
        })
    }
}
