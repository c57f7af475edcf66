//! HTTP implementation of [`QuotaBackend`].
//!
//! `RemoteQuotaBackend` wraps a `reqwest::Client` and talks to a quotagate
//! gateway's `/quota` endpoints.  No retries: the mirror already polls, and
//! a failed consume is allowed through anyway.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use uuid::Uuid;

use qg_domain::config::MirrorConfig;
use qg_domain::error::{Error, Result};
use qg_domain::quota::{ConsumeOutcome, ConsumeResponse, QuotaSnapshot, HAS_OWN_API_KEY_HEADER};
use qg_domain::trace::TraceEvent;

use crate::backend::QuotaBackend;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the shared quota served by a gateway.
///
/// Created once and reused; the underlying `reqwest::Client` pools
/// connections.
#[derive(Debug, Clone)]
pub struct RemoteQuotaBackend {
    http: Client,
    base_url: String,
}

impl RemoteQuotaBackend {
    /// Build a new client from `[mirror]` config.
    pub fn new(cfg: &MirrorConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("X-Client-Type", "quotagate-mirror")
            .header("X-Trace-Id", Uuid::new_v4().to_string())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send once, emit a `QuotaCall` trace, and hand back status + body.
    async fn send(&self, endpoint: &str, rb: RequestBuilder) -> Result<(StatusCode, String)> {
        let start = Instant::now();
        let result = self.decorate(rb).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::QuotaCall {
                    endpoint: endpoint.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                return Err(from_reqwest(e));
            }
        };

        let status = resp.status();
        TraceEvent::QuotaCall {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
            duration_ms,
        }
        .emit();

        let body = resp.text().await.map_err(from_reqwest)?;
        Ok((status, body))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl QuotaBackend for RemoteQuotaBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn read(&self) -> Result<QuotaSnapshot> {
        let endpoint = "GET /quota";
        let (status, body) = self
            .send(endpoint, self.http.get(self.url("/quota")))
            .await?;

        if !status.is_success() {
            return Err(Error::Http(format!("{endpoint} returned {status}: {body}")));
        }
        serde_json::from_str(&body)
            .map_err(|e| Error::Http(format!("failed to parse quota snapshot: {e}: {body}")))
    }

    async fn consume(&self, has_own_credential: bool) -> Result<ConsumeOutcome> {
        let endpoint = "POST /quota/consume";
        let rb = self
            .http
            .post(self.url("/quota/consume"))
            .header(HAS_OWN_API_KEY_HEADER, has_own_credential.to_string());
        let (status, body) = self.send(endpoint, rb).await?;

        // 429 is the expected "exhausted" answer, not a failure.
        if !status.is_success() && status != StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::Http(format!("{endpoint} returned {status}: {body}")));
        }

        let parsed: ConsumeResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Http(format!("failed to parse consume response: {e}: {body}")))?;
        if status == StatusCode::TOO_MANY_REQUESTS && parsed.success {
            return Err(Error::Http(format!(
                "{endpoint} returned 429 with success=true: {body}"
            )));
        }
        Ok(parsed.into_outcome())
    }
}

/// Map a `reqwest` error onto the shared error type.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
