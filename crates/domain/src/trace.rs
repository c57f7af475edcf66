use serde::Serialize;

/// Structured trace events emitted across all quotagate crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    /// The store noticed a new civil day and zeroed its counter.
    QuotaRollover {
        previous_day: String,
        day: String,
        previous_count: u32,
    },
    QuotaConsumed {
        day: String,
        used: u32,
        limit: u32,
    },
    QuotaBypassed {
        day: String,
        used: u32,
    },
    QuotaExhausted {
        day: String,
        used: u32,
        limit: u32,
        reset_in_ms: u64,
    },
    /// The mirror merged a fresh snapshot from its backend.
    QuotaSynced {
        backend: String,
        used: u32,
        remaining: u32,
        has_bypass_credential: bool,
    },
    /// One request from the remote backend to the quota server.
    QuotaCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "qg_event");
    }
}
