//! Shared daily quota endpoints.
//!
//! - `GET  /quota`: current usage, limit and reset countdown
//! - `POST /quota/consume`: take one unit (or bypass with `x-has-own-api-key: true`)
//!
//! `GET/POST /api/global-quota` are served by the same handlers for clients
//! written against the legacy web front-end paths.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use qg_domain::quota::{ConsumeOutcome, ConsumeResponse, HAS_OWN_API_KEY_HEADER};

use crate::state::AppState;

/// `GET /quota`: rollover check, then the current snapshot.
pub async fn get_quota(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.quota.read())
}

/// `POST /quota/consume`: 200 on grant or bypass, 429 when exhausted.
pub async fn consume(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let has_own_key = has_own_api_key(&headers);
    let outcome = state.quota.consume(has_own_key);

    let status = match outcome {
        ConsumeOutcome::Exhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
        ConsumeOutcome::Bypassed | ConsumeOutcome::Granted(_) => StatusCode::OK,
    };
    (status, Json(ConsumeResponse::from(&outcome))).into_response()
}

/// Only the literal `"true"` counts; anything else (including a missing
/// header) is treated as "no own key".
fn has_own_api_key(headers: &HeaderMap) -> bool {
    headers
        .get(HAS_OWN_API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_must_be_exactly_true() {
        let mut headers = HeaderMap::new();
        assert!(!has_own_api_key(&headers));

        headers.insert(HAS_OWN_API_KEY_HEADER, HeaderValue::from_static("TRUE"));
        assert!(!has_own_api_key(&headers));

        headers.insert(HAS_OWN_API_KEY_HEADER, HeaderValue::from_static("1"));
        assert!(!has_own_api_key(&headers));

        headers.insert(HAS_OWN_API_KEY_HEADER, HeaderValue::from_static("true"));
        assert!(has_own_api_key(&headers));
    }
}
