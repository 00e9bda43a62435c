use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

// Health check endpoint - lightweight, no auth
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: checks DB connectivity with timeout protection
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    // Add timeout to prevent hanging readiness checks
    let query = sqlx::query("SELECT 1").fetch_one(&state.db);
    match tokio::time::timeout(std::time::Duration::from_secs(5), query).await {
        Ok(Ok(_)) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => (StatusCode::SERVICE_UNAVAILABLE, format!("not ready: {}", e)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

// Metrics endpoint: returns JSON snapshot
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.metrics.get_snapshot(state.exporter.limiter().in_use());
    Json(snapshot)
}

// Prometheus-compatible text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot(state.exporter.limiter().in_use());
    let body = format!(
        "# HELP bildwald_exports_started Total exports started\n# TYPE bildwald_exports_started counter\nbildwald_exports_started {}\n\
# HELP bildwald_exports_completed Exports that streamed a complete archive\n# TYPE bildwald_exports_completed counter\nbildwald_exports_completed {}\n\
# HELP bildwald_exports_failed Exports that ended with an error\n# TYPE bildwald_exports_failed counter\nbildwald_exports_failed {}\n\
# HELP bildwald_exports_abandoned Exports stopped by client disconnect\n# TYPE bildwald_exports_abandoned counter\nbildwald_exports_abandoned {}\n\
# HELP bildwald_exports_rejected_busy Exports rejected at the concurrency limit\n# TYPE bildwald_exports_rejected_busy counter\nbildwald_exports_rejected_busy {}\n\
# HELP bildwald_exports_in_flight Exports currently running\n# TYPE bildwald_exports_in_flight gauge\nbildwald_exports_in_flight {}\n\
# HELP bildwald_images_archived Images written into archives\n# TYPE bildwald_images_archived counter\nbildwald_images_archived {}\n\
# HELP bildwald_bytes_streamed Compressed bytes streamed to clients\n# TYPE bildwald_bytes_streamed counter\nbildwald_bytes_streamed {}\n\
# HELP bildwald_uptime_seconds Uptime seconds\n# TYPE bildwald_uptime_seconds gauge\nbildwald_uptime_seconds {}\n",
        m.exports_started,
        m.exports_completed,
        m.exports_failed,
        m.exports_abandoned,
        m.exports_rejected_busy,
        m.exports_in_flight,
        m.images_archived,
        m.bytes_streamed,
        m.uptime_seconds,
    );
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
