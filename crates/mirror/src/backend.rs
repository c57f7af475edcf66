//! The `QuotaBackend` trait: the `{read, consume}` capability every quota
//! source offers, whether it is a remote gateway or a local file.

use async_trait::async_trait;
use qg_domain::error::Result;
use qg_domain::quota::{ConsumeOutcome, QuotaSnapshot};

/// Abstraction over where the quota counter lives.
///
/// Implementations may talk to a quotagate gateway, a local state file, or
/// a test double.  Exhaustion is an `Ok(ConsumeOutcome::Exhausted)`, never an
/// error; errors mean the backend could not give a verdict.
#[async_trait]
pub trait QuotaBackend: Send + Sync {
    /// Short name for logs (`"remote"`, `"local"`).
    fn name(&self) -> &'static str;

    /// Current usage (GET /quota).
    async fn read(&self) -> Result<QuotaSnapshot>;

    /// Take one unit unless `has_own_credential` (POST /quota/consume).
    async fn consume(&self, has_own_credential: bool) -> Result<ConsumeOutcome>;
}
