use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::clock::{parse_tz, DEFAULT_TIMEZONE};
use crate::quota::DEFAULT_DAILY_LIMIT;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shared daily quota
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shared daily quota configuration.
///
/// One counter covers every caller; it resets at local midnight in
/// `timezone`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Units available per civil day.
    #[serde(default = "d_daily_limit")]
    pub daily_limit: u32,
    /// IANA timezone whose midnight resets the counter.
    #[serde(default = "d_timezone")]
    pub timezone: String,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: d_daily_limit(),
            timezone: d_timezone(),
        }
    }
}

impl QuotaConfig {
    /// The parsed timezone, `None` when the name is unknown.
    pub fn tz(&self) -> Option<Tz> {
        parse_tz(&self.timezone)
    }
}

fn d_daily_limit() -> u32 {
    DEFAULT_DAILY_LIMIT
}
fn d_timezone() -> String {
    DEFAULT_TIMEZONE.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_twenty_per_taipei_day() {
        let cfg: QuotaConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.daily_limit, 20);
        assert_eq!(cfg.tz(), Some(chrono_tz::Asia::Taipei));
    }

    #[test]
    fn overrides_parse() {
        let cfg: QuotaConfig = toml::from_str(
            r#"
            daily_limit = 5
            timezone = "Europe/Berlin"
        "#,
        )
        .unwrap();
        assert_eq!(cfg.daily_limit, 5);
        assert_eq!(cfg.tz(), Some(chrono_tz::Europe::Berlin));
    }
}
