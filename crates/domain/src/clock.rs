//! Civil-day arithmetic in a fixed named timezone.
//!
//! The quota resets at local midnight of one configured zone (not the host's
//! zone), so server and clients agree on the boundary wherever they run.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

/// Timezone used when none is configured.
pub const DEFAULT_TIMEZONE: &str = "Asia/Taipei";

/// Source of "now".  Injected so rollover can be tested without waiting
/// for midnight.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Parse an IANA timezone name.
pub fn parse_tz(name: &str) -> Option<Tz> {
    name.parse::<Tz>().ok()
}

/// Today's civil date in `tz`.
pub fn civil_day(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// The UTC instant of the next local midnight in `tz`.
///
/// **DST handling:** if local midnight does not exist (spring-forward at
/// 00:00) the first existing local minute after it is used; if it is
/// ambiguous the earliest mapping wins.
pub fn next_midnight(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let Some(tomorrow) = civil_day(now, tz).succ_opt() else {
        return now;
    };
    let mut candidate = NaiveDateTime::new(tomorrow, NaiveTime::MIN);

    // Gaps are at most a couple of hours in practice.
    for _ in 0..(4 * 60) {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => candidate += Duration::minutes(1),
        }
    }
    now
}

/// Milliseconds from `now` until the next local midnight in `tz`, floored
/// at zero.
pub fn ms_until_next_midnight(now: DateTime<Utc>, tz: Tz) -> u64 {
    let ms = (next_midnight(now, tz) - now).num_milliseconds();
    ms.max(0) as u64
}

/// Render a duration as zero-padded `HH:MM:SS`.  Hours are not wrapped at
/// 24 and sub-second remainders are dropped.
pub fn format_time_remaining(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
