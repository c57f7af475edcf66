//! The shared daily quota store.
//!
//! [`QuotaStore`] is the single source of truth for how many AI-backed
//! actions have been taken today across all users.  It is in-memory and
//! lock-protected; a process restart silently resets it.  The counter rolls
//! over lazily: every `read` and `consume` first compares the stored day
//! against the current civil date in the configured timezone, so an idle
//! process still resets correctly across midnight.

use std::sync::Arc;

use chrono_tz::Tz;
use parking_lot::Mutex;

use qg_domain::clock::{civil_day, ms_until_next_midnight, Clock};
use qg_domain::config::QuotaConfig;
use qg_domain::error::{Error, Result};
use qg_domain::quota::{ConsumeOutcome, DailyCounter, QuotaSnapshot};
use qg_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// QuotaStore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-memory shared daily quota.
///
/// Thread-safe: the rollover check, the exhaustion check and the increment
/// all happen under one `parking_lot::Mutex` guard, so two concurrent
/// consumes can never both take the last unit.
pub struct QuotaStore {
    limit: u32,
    tz: Tz,
    clock: Arc<dyn Clock>,
    counter: Mutex<DailyCounter>,
}

impl QuotaStore {
    /// Start a fresh counter for today.
    pub fn new(limit: u32, tz: Tz, clock: Arc<dyn Clock>) -> Self {
        let today = civil_day(clock.now(), tz);
        Self {
            limit,
            tz,
            clock,
            counter: Mutex::new(DailyCounter::new(today)),
        }
    }

    /// Build a store from `[quota]` config.
    pub fn from_config(cfg: &QuotaConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let tz = cfg
            .tz()
            .ok_or_else(|| Error::Config(format!("unknown timezone {:?}", cfg.timezone)))?;
        Ok(Self::new(cfg.daily_limit, tz, clock))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Current usage.  Only mutation is a pending day rollover.
    pub fn read(&self) -> QuotaSnapshot {
        let now = self.clock.now();
        let mut counter = self.counter.lock();
        self.roll_over(&mut counter, now);
        QuotaSnapshot::new(&counter, self.limit, ms_until_next_midnight(now, self.tz))
    }

    /// Take one unit unless the caller has its own credential.
    ///
    /// The flag is trusted as given; there is no way to verify it here.
    pub fn consume(&self, has_own_credential: bool) -> ConsumeOutcome {
        let now = self.clock.now();
        let reset_in_ms = ms_until_next_midnight(now, self.tz);

        let mut counter = self.counter.lock();
        self.roll_over(&mut counter, now);

        if has_own_credential {
            TraceEvent::QuotaBypassed {
                day: counter.date.to_string(),
                used: counter.count,
            }
            .emit();
            return ConsumeOutcome::Bypassed;
        }

        if !counter.try_consume(self.limit) {
            TraceEvent::QuotaExhausted {
                day: counter.date.to_string(),
                used: counter.count,
                limit: self.limit,
                reset_in_ms,
            }
            .emit();
            return ConsumeOutcome::exhausted(QuotaSnapshot::new(&counter, self.limit, reset_in_ms));
        }

        TraceEvent::QuotaConsumed {
            day: counter.date.to_string(),
            used: counter.count,
            limit: self.limit,
        }
        .emit();
        ConsumeOutcome::Granted(QuotaSnapshot::new(&counter, self.limit, reset_in_ms))
    }

    // ── Private ──────────────────────────────────────────────────────

    fn roll_over(&self, counter: &mut DailyCounter, now: chrono::DateTime<chrono::Utc>) {
        let previous = *counter;
        if counter.roll_to(civil_day(now, self.tz)) {
            TraceEvent::QuotaRollover {
                previous_day: previous.date.to_string(),
                day: counter.date.to_string(),
                previous_count: previous.count,
            }
            .emit();
        }
    }
}
