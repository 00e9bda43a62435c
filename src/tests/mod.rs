//! Integration and unit tests for the Bildwald application.
//!
//! ## Test Modules
//!
//! - **api_tests**: HTTP endpoints, including the streamed gallery export
//! - **config_tests**: Configuration defaults and validation
//! - **db_tests**: Schema initialization
//! - **error_tests**: Error display and HTTP mapping
//! - **store_tests**: SQLite-backed gallery store
//!
//! Individual test modules can be run with:
//! ```bash
//! cargo test api_tests
//! ```

pub mod config_tests;
pub mod error_tests;

use std::path::Path;

use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};

/// Creates a fresh SQLite database inside `dir` with the schema applied.
pub(crate) async fn setup_test_db(dir: &Path) -> (SqlitePool, String) {
    let db_url = format!("sqlite:{}", dir.join("test.db").display());
    Sqlite::create_database(&db_url).await.unwrap();
    let pool = SqlitePoolOptions::new().max_connections(4).connect(&db_url).await.unwrap();
    crate::db::init_db(&pool).await.unwrap();
    (pool, db_url)
}

pub(crate) async fn insert_user(pool: &SqlitePool, id: i64, name: &str, token: Option<&str>) {
    sqlx::query("INSERT INTO users (id, name, api_token) VALUES (?1, ?2, ?3)")
        .bind(id)
        .bind(name)
        .bind(token)
        .execute(pool)
        .await
        .unwrap();
}

pub(crate) async fn insert_gallery(pool: &SqlitePool, id: i64, title: &str, owner_id: i64, published: bool) {
    sqlx::query("INSERT INTO galleries (id, title, owner_id, published) VALUES (?1, ?2, ?3, ?4)")
        .bind(id)
        .bind(title)
        .bind(owner_id)
        .bind(published as i64)
        .execute(pool)
        .await
        .unwrap();
}

/// Writes `data` below `storage_root` and registers it as an image.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn insert_image(
    pool: &SqlitePool,
    storage_root: &Path,
    id: i64,
    gallery_id: i64,
    name: &str,
    rel_path: &str,
    data: &[u8],
    created_at: i64,
) {
    let full = storage_root.join(rel_path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&full, data).unwrap();
    sqlx::query(
        "INSERT INTO images (id, gallery_id, name, path, size, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(id)
    .bind(gallery_id)
    .bind(name)
    .bind(rel_path)
    .bind(data.len() as i64)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
}
