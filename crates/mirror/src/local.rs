//! File-backed implementation of [`QuotaBackend`].
//!
//! For deployments without a gateway: each machine keeps its own daily
//! counter in a small JSON file (`{"date": "YYYY-MM-DD", "count": N}`).
//! The counter follows exactly the same rollover and limit rules as the
//! gateway's store because both go through [`DailyCounter`].

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

use qg_domain::clock::{civil_day, ms_until_next_midnight, Clock};
use qg_domain::error::{Error, Result};
use qg_domain::quota::{ConsumeOutcome, DailyCounter, QuotaSnapshot};
use qg_domain::trace::TraceEvent;

use crate::backend::QuotaBackend;

pub struct LocalQuotaBackend {
    file: Arc<CounterFile>,
    clock: Arc<dyn Clock>,
}

/// The state file plus the rules for reading it.  Every method does
/// blocking I/O and runs on the blocking pool.
struct CounterFile {
    path: PathBuf,
    limit: u32,
    tz: Tz,
    /// Serializes load-modify-save within this process.
    lock: Mutex<()>,
}

impl LocalQuotaBackend {
    pub fn new(path: impl Into<PathBuf>, limit: u32, tz: Tz, clock: Arc<dyn Clock>) -> Self {
        Self {
            file: Arc::new(CounterFile {
                path: path.into(),
                limit,
                tz,
                lock: Mutex::new(()),
            }),
            clock,
        }
    }

    /// Run `f` under the file lock on the blocking pool.
    async fn with_file<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&CounterFile) -> Result<T> + Send + 'static,
    {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || {
            let _guard = file.lock.lock();
            f(&file)
        })
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
    }
}

impl CounterFile {
    /// Load the persisted counter.  A missing or unreadable file starts a
    /// fresh day rather than failing.
    fn load(&self, today: NaiveDate) -> DailyCounter {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return DailyCounter::new(today),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "reading local quota state failed");
                return DailyCounter::new(today);
            }
        };
        match serde_json::from_str(&raw) {
            Ok(counter) => counter,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "local quota state is corrupt, starting fresh");
                DailyCounter::new(today)
            }
        }
    }

    /// Write via a temp file + rename so a crash never leaves half a file.
    fn save(&self, counter: &DailyCounter) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(counter)?)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Load and roll the counter to today, persisting a rollover.
    fn current(&self, now: DateTime<Utc>) -> Result<DailyCounter> {
        let today = civil_day(now, self.tz);
        let mut counter = self.load(today);
        let previous = counter;
        if counter.roll_to(today) {
            TraceEvent::QuotaRollover {
                previous_day: previous.date.to_string(),
                day: counter.date.to_string(),
                previous_count: previous.count,
            }
            .emit();
            self.save(&counter)?;
        }
        Ok(counter)
    }

    fn snapshot(&self, counter: &DailyCounter, now: DateTime<Utc>) -> QuotaSnapshot {
        QuotaSnapshot::new(counter, self.limit, ms_until_next_midnight(now, self.tz))
    }
}

#[async_trait]
impl QuotaBackend for LocalQuotaBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn read(&self) -> Result<QuotaSnapshot> {
        let now = self.clock.now();
        self.with_file(move |file| {
            let counter = file.current(now)?;
            Ok(file.snapshot(&counter, now))
        })
        .await
    }

    async fn consume(&self, has_own_credential: bool) -> Result<ConsumeOutcome> {
        if has_own_credential {
            return Ok(ConsumeOutcome::Bypassed);
        }

        let now = self.clock.now();
        self.with_file(move |file| {
            let mut counter = file.current(now)?;
            if !counter.try_consume(file.limit) {
                return Ok(ConsumeOutcome::exhausted(file.snapshot(&counter, now)));
            }
            file.save(&counter)?;
            Ok(ConsumeOutcome::Granted(file.snapshot(&counter, now)))
        })
        .await
    }
}
