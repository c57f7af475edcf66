pub mod health;
pub mod quota;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use qg_domain::config::CorsConfig;
use qg_domain::quota::HAS_OWN_API_KEY_HEADER;

use crate::state::AppState;

/// Build the bare API router (no middleware, state not yet attached).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/quota", get(quota::get_quota))
        .route("/quota/consume", axum::routing::post(quota::consume))
        // Legacy web front-end paths.
        .route(
            "/api/global-quota",
            get(quota::get_quota).post(quota::consume),
        )
}

/// Build the full application: routes, CORS, request tracing, concurrency
/// limit and (optionally) per-IP rate limiting, with `state` attached.
pub fn app(state: AppState) -> anyhow::Result<Router> {
    let server = &state.config.server;
    let router = router()
        .layer(build_cors_layer(&server.cors))
        .layer(TraceLayer::new_for_http())
        .layer(tower::limit::ConcurrencyLimitLayer::new(
            server.max_concurrent_requests.max(1),
        ));

    let router = match &server.rate_limit {
        Some(rl) => {
            use tower_governor::governor::GovernorConfigBuilder;
            use tower_governor::GovernorLayer;

            let interval_ns = replenish_interval_ns(rl.requests_per_second)
                .context("rate_limit: requests_per_second must be > 0")?;
            let gov_config = GovernorConfigBuilder::default()
                .per_nanosecond(interval_ns)
                .burst_size(rl.burst_size)
                .finish()
                .context("rate_limit: requests_per_second and burst_size must be > 0")?;

            tracing::info!(
                requests_per_second = rl.requests_per_second,
                burst_size = rl.burst_size,
                "per-IP rate limiting enabled"
            );

            router.layer(GovernorLayer {
                config: std::sync::Arc::new(gov_config),
            })
        }
        None => {
            tracing::info!("per-IP rate limiting disabled (no [server.rate_limit] in config)");
            router
        }
    };

    Ok(router.with_state(state))
}

/// Time between replenished tokens for a sustained `requests_per_second`.
/// The governor builder takes a replenish period, not a rate.
fn replenish_interval_ns(requests_per_second: u64) -> Option<u64> {
    (requests_per_second > 0).then(|| (1_000_000_000 / requests_per_second).max(1))
}

/// Build a [`CorsLayer`] from the configured allowed origins.
///
/// Origins may end in `:*` to match any port on that host.  A literal
/// `"*"` allows all origins.
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    use axum::http::header;

    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let headers = [
        header::CONTENT_TYPE,
        header::HeaderName::from_static(HAS_OWN_API_KEY_HEADER),
    ];

    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\", all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    // Partition into exact origins and wildcard-port patterns.
    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            let origin_str = origin.to_str().unwrap_or("");
            wildcard_prefixes
                .iter()
                .any(|prefix| port_matches(origin_str, prefix))
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(methods)
        .allow_headers(headers)
}

/// `http://localhost:5173` matches prefix `http://localhost:` when the rest
/// is a non-empty run of digits.
fn port_matches(origin: &str, prefix: &str) -> bool {
    origin
        .strip_prefix(prefix)
        .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}
