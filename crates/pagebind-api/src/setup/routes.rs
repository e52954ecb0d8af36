//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use pagebind_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Body size is bounded by the multipart reader, which answers with the
    // batch limit that was breached.
    tracing::info!(
        max_total_size_bytes = config.limits.max_total_size_bytes,
        concurrency_limit = config.http_concurrency_limit,
        "HTTP limits configured"
    );

    let router = Router::new()
        .route("/", get(handlers::frontend::index))
        .route("/convert", post(handlers::convert::convert_images))
        .fallback(handlers::frontend::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(ConcurrencyLimitLayer::new(config.http_concurrency_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_origins.iter().any(|o| o == "*") {
        if config.is_production() {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS=* is not allowed in production"
            ));
        }
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any))
}
