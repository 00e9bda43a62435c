//! HTTP route handlers for the Bildwald API.
//!
//! - `galleries`: gallery metadata, image listing and the archive export
//! - `health`: health checks, metrics and build info

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub mod galleries;
pub mod health;

/// Builds the application router.
///
/// Probes and metrics bypass authentication; gallery routes resolve the
/// caller from the bearer token first.
pub fn router(state: AppState) -> Router {
    let galleries = Router::new()
        .route("/galleries/{id}", get(galleries::get_gallery))
        .route("/galleries/{id}/images", get(galleries::list_images))
        .route("/galleries/{id}/export", get(galleries::export_gallery))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .merge(galleries)
        .with_state(state)
        // Only GET routes exist; keep request bodies small
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
}
