//! Directory relay.
//!
//! Serves `GET /api/radio?endpoint=<path>` (also mounted at `/`).  The
//! handler appends `<path>` to the configured upstream directory host, issues
//! one GET, and hands the JSON body back untouched with a permissive
//! `Access-Control-Allow-Origin` so browser frontends can reach the directory.
//!
//! Design notes
//! ─────────────
//! • No caching, no retry, no rate limiting: one request in, one request out.
//! • The upstream body is only checked to be JSON, never re-encoded.
//! • The relay re-uses a single `reqwest::Client` so TLS sessions are shared.
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use radio_proto::config::RelayConfig;

use crate::error::RelayError;

// ── Shared state ──────────────────────────────────────────────────────────────

/// Upstream host plus a persistent HTTP client.
#[derive(Clone)]
pub struct RelayState {
    pub client: Client,
    pub upstream_base: Arc<str>,
    pub restrict_endpoints: bool,
}

impl RelayState {
    pub fn new(upstream_base: &str, timeout: Duration, restrict_endpoints: bool) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("world-radio-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            upstream_base: Arc::from(upstream_base.trim_end_matches('/')),
            restrict_endpoints,
        })
    }

    pub fn from_config(config: &RelayConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.effective_upstream_base(),
            Duration::from_secs(config.request_timeout_secs),
            config.restrict_endpoints,
        )
    }

    fn upstream_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.upstream_base, endpoint)
    }
}

#[derive(Debug, Deserialize)]
pub struct RelayQuery {
    endpoint: Option<String>,
}

/// Reject endpoints that could point the relay somewhere other than the
/// directory host.  Only applied when `restrict` is set.
pub fn validate_endpoint(endpoint: &str, restrict: bool) -> Result<&str, RelayError> {
    if endpoint.is_empty() {
        return Err(RelayError::MissingEndpoint);
    }
    if !restrict {
        return Ok(endpoint);
    }
    let reason = if !endpoint.starts_with('/') {
        Some("must start with '/'")
    } else if endpoint.starts_with("//") {
        Some("protocol-relative path")
    } else if endpoint.contains("..") {
        Some("path traversal")
    } else if endpoint.contains("://") || endpoint.contains('@') || endpoint.contains('\\') {
        Some("looks like another host")
    } else if endpoint.chars().any(|c| c.is_control() || c.is_whitespace()) {
        Some("control or whitespace characters")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(RelayError::InvalidEndpoint(reason.to_string())),
        None => Ok(endpoint),
    }
}

// ── Route handlers ────────────────────────────────────────────────────────────

async fn relay(
    State(state): State<RelayState>,
    Query(query): Query<RelayQuery>,
) -> Result<Response, RelayError> {
    let endpoint = query.endpoint.as_deref().unwrap_or_default();
    let endpoint = validate_endpoint(endpoint, state.restrict_endpoints).map_err(|e| {
        debug!("relay: rejected endpoint {:?}: {}", endpoint, e);
        e
    })?;

    let url = state.upstream_url(endpoint);
    debug!("relay: GET {}", url);

    let (status, body) = fetch_json(&state.client, &url).await.map_err(|e| {
        warn!("relay: {} failed: {}", url, e);
        e
    })?;

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
    Ok((
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        ],
        Body::from(body),
    )
        .into_response())
}

/// One upstream GET.  Returns the status and the raw body once it is known to
/// be JSON.
async fn fetch_json(client: &Client, url: &str) -> Result<(u16, Bytes), RelayError> {
    let upstream = client.get(url).send().await?;
    let status = upstream.status().as_u16();
    let body = upstream.bytes().await?;
    serde_json::from_slice::<serde::de::IgnoredAny>(&body)?;
    Ok((status, body))
}

async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "*"),
        ],
    )
}

// ── Server startup ────────────────────────────────────────────────────────────

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(relay).options(preflight))
        .route("/api/radio", get(relay).options(preflight))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the relay on an already-bound listener.
pub fn spawn(listener: TcpListener, state: RelayState) -> tokio::task::JoinHandle<()> {
    let app = router(state);
    tokio::spawn(async move {
        match listener.local_addr() {
            Ok(addr) => info!("Directory relay listening on http://{}/api/radio", addr),
            Err(e) => warn!("Directory relay listening on unknown address: {}", e),
        }
        if let Err(e) = axum::serve(listener, app).await {
            warn!("Directory relay error: {}", e);
        }
    })
}
