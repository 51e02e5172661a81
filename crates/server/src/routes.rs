use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use brandcheck_model::{SearchRequest, SearchResponse};
use brandcheck_ratelimit::{AnyRateLimiter, RateLimiter};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::{AppError, SearchService};

/// Shared handler state.
pub struct AppState<S> {
    service: Arc<S>,
    limiter: Arc<AnyRateLimiter>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<S: SearchService> AppState<S> {
    pub fn new(service: S, limiter: AnyRateLimiter) -> Self {
        Self {
            service: Arc::new(service),
            limiter: Arc::new(limiter),
        }
    }
}

/// Create the router with all routes.
///
/// Bodies over `max_body_bytes` are rejected by the JSON extractor, so the
/// 413 carries the usual error body.
pub fn create_router<S: SearchService>(state: AppState<S>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/search", post(search::<S>))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn search<S: SearchService>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let client = client_id(&headers, peer.map(|ConnectInfo(addr)| addr));

    match state.limiter.admit(&client).await {
        Ok(true) => {}
        Ok(false) => {
            info!(client_id = %client, "Rate limit exceeded");
            return Err(AppError::RateLimited);
        }
        Err(e) => warn!(client_id = %client, error = %e, "Rate limiter unavailable, admitting request"),
    }

    let Json(request) = body.map_err(|e| AppError::Rejected(e.status(), e.body_text()))?;
    debug!(client_id = %client, search_type = ?request.effective_search_type(), "Search request");

    let response = state.service.search(request).await?;
    Ok(Json(response))
}

/// Client identity for rate limiting: the first `X-Forwarded-For` entry,
/// else the peer address.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_id_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer = "127.0.0.1:4000".parse().ok();
        assert_eq!(client_id(&headers, peer), "203.0.113.7");
    }

    #[test]
    fn test_client_id_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" "));
        let peer = "192.0.2.1:55000".parse().ok();
        assert_eq!(client_id(&headers, peer), "192.0.2.1");
        assert_eq!(client_id(&HeaderMap::new(), None), "unknown");
    }
}
