//! The shared daily quota: counter state machine and wire format.
//!
//! [`DailyCounter`] is the only piece of mutable quota state.  The gateway
//! keeps one in memory behind a mutex; the mirror's local backend keeps one
//! in a JSON file.  Both read and write it through the same two transitions
//! (`roll_to`, `try_consume`) so the rules cannot drift between them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Units per civil day shared by every user of the quota.
pub const DEFAULT_DAILY_LIMIT: u32 = 20;

/// Request header carrying the caller's "I have my own API key" claim.
/// Only the exact value `"true"` counts as a bypass.
pub const HAS_OWN_API_KEY_HEADER: &str = "x-has-own-api-key";

pub const BYPASS_MESSAGE: &str = "Using own API key, quota not consumed";
pub const EXHAUSTED_MESSAGE: &str = "Daily global quota exhausted";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DailyCounter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Units consumed on one civil day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounter {
    #[serde(alias = "day")]
    pub date: NaiveDate,
    pub count: u32,
}

impl DailyCounter {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            date: today,
            count: 0,
        }
    }

    /// Move the counter to `today`, zeroing it if the day changed.
    ///
    /// Returns `true` when a rollover happened.
    pub fn roll_to(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        self.date = today;
        self.count = 0;
        true
    }

    /// Take one unit if any remain.
    pub fn try_consume(&mut self, limit: u32) -> bool {
        if self.count >= limit {
            return false;
        }
        self.count += 1;
        true
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Snapshot / outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Point-in-time view of the quota, as returned by `GET /quota`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub is_exhausted: bool,
    pub reset_in_ms: u64,
    #[serde(alias = "date")]
    pub day: String,
}

impl QuotaSnapshot {
    /// Derive `remaining` / `is_exhausted` from the counter.
    pub fn new(counter: &DailyCounter, limit: u32, reset_in_ms: u64) -> Self {
        let remaining = limit.saturating_sub(counter.count);
        Self {
            used: counter.count,
            limit,
            remaining,
            is_exhausted: remaining == 0,
            reset_in_ms,
            day: counter.date.to_string(),
        }
    }
}

/// Result of a consume attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Caller claimed its own credential; nothing was counted.
    Bypassed,
    /// One unit was taken.  The snapshot reflects the increment.
    Granted(QuotaSnapshot),
    /// No units left; nothing was counted.  `message` is the store's text.
    Exhausted {
        snapshot: QuotaSnapshot,
        message: String,
    },
}

impl ConsumeOutcome {
    /// Exhaustion with the standard message.
    pub fn exhausted(snapshot: QuotaSnapshot) -> Self {
        ConsumeOutcome::Exhausted {
            snapshot,
            message: EXHAUSTED_MESSAGE.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ConsumeOutcome::Exhausted { .. })
    }

    pub fn snapshot(&self) -> Option<&QuotaSnapshot> {
        match self {
            ConsumeOutcome::Bypassed => None,
            ConsumeOutcome::Granted(s) => Some(s),
            ConsumeOutcome::Exhausted { snapshot, .. } => Some(snapshot),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire body for POST /quota/consume
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// JSON body of a consume response.
///
/// - bypass: `{success, bypassed, message}`
/// - exhausted (429): `{success:false, used, limit, remaining:0, isExhausted:true, resetInMs, message}`
/// - granted: `{success:true, used, limit, remaining, isExhausted, resetInMs}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypassed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_exhausted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_in_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Not part of the response contract; filled in by clients that know it.
    #[serde(default, skip_serializing)]
    pub day: Option<String>,
}

impl From<&ConsumeOutcome> for ConsumeResponse {
    fn from(outcome: &ConsumeOutcome) -> Self {
        match outcome {
            ConsumeOutcome::Bypassed => Self {
                success: true,
                bypassed: Some(true),
                used: None,
                limit: None,
                remaining: None,
                is_exhausted: None,
                reset_in_ms: None,
                message: Some(BYPASS_MESSAGE.into()),
                day: None,
            },
            ConsumeOutcome::Granted(s) => Self {
                success: true,
                bypassed: None,
                used: Some(s.used),
                limit: Some(s.limit),
                remaining: Some(s.remaining),
                is_exhausted: Some(s.is_exhausted),
                reset_in_ms: Some(s.reset_in_ms),
                message: None,
                day: None,
            },
            ConsumeOutcome::Exhausted { snapshot: s, message } => Self {
                success: false,
                bypassed: None,
                used: Some(s.used),
                limit: Some(s.limit),
                remaining: Some(0),
                is_exhausted: Some(true),
                reset_in_ms: Some(s.reset_in_ms),
                message: Some(message.clone()),
                day: None,
            },
        }
    }
}

impl ConsumeResponse {
    /// Rebuild the outcome on the client side.
    ///
    /// Missing counters fall back to the "safe" reading for the outcome:
    /// an exhausted response always reports zero remaining.  A failure
    /// keeps the server's message, or the standard one when it sent none.
    pub fn into_outcome(self) -> ConsumeOutcome {
        if self.success && self.bypassed.unwrap_or(false) {
            return ConsumeOutcome::Bypassed;
        }

        let limit = self.limit.unwrap_or(DEFAULT_DAILY_LIMIT);
        let used = self.used.unwrap_or(0);
        let snapshot = |remaining: u32, is_exhausted: bool| QuotaSnapshot {
            used,
            limit,
            remaining,
            is_exhausted,
            reset_in_ms: self.reset_in_ms.unwrap_or(0),
            day: self.day.clone().unwrap_or_default(),
        };

        if self.success {
            let remaining = self.remaining.unwrap_or(limit.saturating_sub(used));
            ConsumeOutcome::Granted(snapshot(
                remaining,
                self.is_exhausted.unwrap_or(remaining == 0),
            ))
        } else {
            let message = self
                .message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| EXHAUSTED_MESSAGE.into());
            ConsumeOutcome::Exhausted {
                snapshot: snapshot(0, true),
                message,
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
