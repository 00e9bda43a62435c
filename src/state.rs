use std::sync::Arc;

use crate::config::AppConfig;
use crate::export::{ExportLimiter, ExportSettings, Exporter};
use crate::metrics::Metrics;
use crate::store::{GalleryStore, SqliteStore};

/// The shared application state.
///
/// Cloned into every handler. The export limiter inside [`Exporter`] is the
/// only piece of state that concurrent exports compete for.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool, used by the readiness probe.
    pub db: sqlx::SqlitePool,
    /// Galleries, images and API tokens.
    pub store: Arc<dyn GalleryStore>,
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Export counters, shared with every export job.
    pub metrics: Metrics,
    /// Starts archive exports and bounds how many run at once.
    pub exporter: Exporter,
}

impl AppState {
    /// Creates a new `AppState` backed by SQLite and the configured storage root.
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let store: Arc<dyn GalleryStore> = Arc::new(SqliteStore::new(db.clone(), config.storage.root.clone()));
        let metrics = Metrics::new();
        let exporter = Exporter::new(
            store.clone(),
            ExportLimiter::new(config.export.max_concurrent),
            metrics.clone(),
            ExportSettings::from(&config.export),
        );

        Self { db, store, config: Arc::new(config), metrics, exporter }
    }
}
