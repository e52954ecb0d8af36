//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use pagebind_core::Config;
use pagebind_infra::ProcessHeapSampler;
use pagebind_processing::HeapSampler;
use std::sync::Arc;

/// Initialize telemetry, shared state and the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    pagebind_infra::init_telemetry("pagebind", &config.environment, config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let state = Arc::new(AppState::new(config.clone(), heap_sampler()));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

fn heap_sampler() -> Option<Arc<dyn HeapSampler>> {
    let sampler = ProcessHeapSampler::new();
    if sampler.is_available() {
        Some(Arc::new(sampler))
    } else {
        tracing::warn!("Process memory sampling unavailable, memory governor disabled");
        None
    }
}
