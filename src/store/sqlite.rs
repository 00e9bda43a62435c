use std::{
    fs::File,
    io::{self, Read},
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::{last_page, Gallery, GalleryStore, ImagePage, ImageRef, StoreError};

/// SQLite metadata plus image files below `storage_root`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    storage_root: PathBuf,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, storage_root: impl Into<PathBuf>) -> Self {
        Self { pool, storage_root: storage_root.into() }
    }

    fn resolve(&self, rel: &str) -> io::Result<PathBuf> {
        let rel = Path::new(rel);
        // Stored paths must stay inside the storage root
        if rel.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "image path escapes storage root"));
        }
        Ok(self.storage_root.join(rel))
    }
}

#[async_trait]
impl GalleryStore for SqliteStore {
    async fn get_gallery(&self, id: i64) -> Result<Option<Gallery>, StoreError> {
        let row = sqlx::query(
            "SELECT id, title, owner_id, published, created_at FROM galleries WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Gallery {
            id: r.get("id"),
            title: r.get("title"),
            owner_id: r.get("owner_id"),
            published: r.get::<i64, _>("published") != 0,
            created_at: r.get("created_at"),
        }))
    }

    async fn list_images_page(
        &self,
        gallery_id: i64,
        page: u32,
        page_size: u32,
        after_id: Option<i64>,
    ) -> Result<ImagePage, StoreError> {
        let page = page.max(1);
        let page_size = page_size.max(1);

        // Count and rows come from the same snapshot
        let mut tx = self.pool.begin().await?;
        let (rows, last) = match after_id {
            None => {
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE gallery_id = ?1")
                    .bind(gallery_id)
                    .fetch_one(&mut *tx)
                    .await?;
                let offset = i64::from(page - 1) * i64::from(page_size);
                let rows = sqlx::query(
                    "SELECT id, gallery_id, name, path, size, created_at \
                     FROM images WHERE gallery_id = ?1 ORDER BY id ASC LIMIT ?2 OFFSET ?3",
                )
                .bind(gallery_id)
                .bind(i64::from(page_size))
                .bind(offset)
                .fetch_all(&mut *tx)
                .await?;
                (rows, last_page(total.max(0) as u64, page_size))
            }
            Some(after) => {
                let remaining: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE gallery_id = ?1 AND id > ?2")
                        .bind(gallery_id)
                        .bind(after)
                        .fetch_one(&mut *tx)
                        .await?;
                let rows = sqlx::query(
                    "SELECT id, gallery_id, name, path, size, created_at \
                     FROM images WHERE gallery_id = ?1 AND id > ?2 ORDER BY id ASC LIMIT ?3",
                )
                .bind(gallery_id)
                .bind(after)
                .bind(i64::from(page_size))
                .fetch_all(&mut *tx)
                .await?;
                (rows, page - 1 + last_page(remaining.max(0) as u64, page_size))
            }
        };
        tx.commit().await?;

        let images = rows
            .iter()
            .map(|r| ImageRef {
                id: r.get("id"),
                gallery_id: r.get("gallery_id"),
                name: r.get("name"),
                path: r.get("path"),
                size: r.get::<i64, _>("size").max(0) as u64,
                created_at: r.get("created_at"),
            })
            .collect();

        Ok(ImagePage { images, current_page: page, last_page: last })
    }

    fn open_image(&self, image: &ImageRef) -> io::Result<Box<dyn Read + Send>> {
        let path = self.resolve(&image.path)?;
        let file = File::open(path)?;
        Ok(Box::new(file))
    }

    async fn principal_for_token(&self, token: &str) -> Result<Option<i64>, StoreError> {
        let id = sqlx::query_scalar("SELECT id FROM users WHERE api_token = ?1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }
}
