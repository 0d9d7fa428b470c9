// src/api/mod.rs

//! HTTP API over the snapshot cache.
//!
//! Routes:
//! - `/stocks/all` - full snapshot
//! - `/stocks/gear`, `/stocks/egg`, `/stocks/seeds` - one category
//! - `/health` - liveness

mod limiter;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{ErrorBody, FetchError, Result};
use crate::models::{Category, Config, StockSnapshot};
use crate::pipeline::{SnapshotCache, SnapshotSource};
use crate::utils::log::EventSink;

pub use limiter::RateLimiter;

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub source: Arc<dyn SnapshotSource>,
    pub cache: Arc<SnapshotCache>,
    pub limiter: Arc<RateLimiter>,
}

impl ApiState {
    pub fn new(config: &Config, source: Arc<dyn SnapshotSource>, events: Arc<dyn EventSink>) -> Self {
        Self {
            source,
            cache: Arc::new(SnapshotCache::new(config.cache.bucket_secs, events)),
            limiter: Arc::new(RateLimiter::per_minute(config.server.requests_per_minute)),
        }
    }
}

/// Build the router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stocks/all", get(all_stocks))
        .route("/stocks/gear", get(gear_stock))
        .route("/stocks/egg", get(egg_stock))
        .route("/stocks/seeds", get(seeds_stock))
        .with_state(state)
}

/// Serve the API until the process stops.
pub async fn serve(bind: &str, state: ApiState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("Stock API listening on http://{}", listener.local_addr()?);
    log::info!("  - All stock: /stocks/all");
    log::info!("  - Categories: /stocks/gear, /stocks/egg, /stocks/seeds");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// HTTP status for a pipeline error.
pub fn status_for(error: &FetchError) -> StatusCode {
    match error {
        FetchError::Network(_) => StatusCode::BAD_GATEWAY,
        FetchError::Blocked(_) | FetchError::EmptyResult(_) => StatusCode::SERVICE_UNAVAILABLE,
        FetchError::Structure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn all_stocks(
    State(state): State<ApiState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    respond(&state, addr, |snapshot| snapshot.clone()).await
}

async fn gear_stock(
    State(state): State<ApiState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    category_response(&state, addr, Category::Gear).await
}

async fn egg_stock(
    State(state): State<ApiState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    category_response(&state, addr, Category::Egg).await
}

async fn seeds_stock(
    State(state): State<ApiState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    category_response(&state, addr, Category::Seeds).await
}

async fn category_response(state: &ApiState, addr: SocketAddr, category: Category) -> Response {
    respond(state, addr, |snapshot| snapshot.category(category).clone()).await
}

async fn respond<T, F>(state: &ApiState, addr: SocketAddr, project: F) -> Response
where
    T: Serialize,
    F: FnOnce(&StockSnapshot) -> T,
{
    let ip = addr.ip();
    if !state.limiter.check(ip) {
        let retry_after = state.limiter.retry_after(ip, Instant::now());
        log::warn!("Rate limit exceeded for {ip}");
        let body = ErrorBody {
            suggestion: Some(format!("Retry in {retry_after} seconds.")),
            ..ErrorBody::message("Rate limit exceeded")
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    match state.cache.get_or_fetch(state.source.as_ref()).await {
        Ok(snapshot) => Json(project(&snapshot)).into_response(),
        Err(error) => {
            log::error!("Stock request failed: {error}");
            (status_for(&error), Json(error.to_body())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&FetchError::network("x")), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&FetchError::blocked("x")),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&FetchError::structure("x")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&FetchError::empty("x")),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
