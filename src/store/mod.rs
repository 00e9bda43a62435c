//! Persistence collaborator for galleries, images and API tokens.
//!
//! The export pipeline only ever talks to [`GalleryStore`]; the SQLite-backed
//! implementation lives in [`sqlite`].

use std::io::Read;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod sqlite;

pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gallery {
    pub id: i64,
    pub title: String,
    pub owner_id: i64,
    pub published: bool,
    pub created_at: String,
}

/// One image as listed by the store. `name` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: i64,
    pub gallery_id: i64,
    pub name: String,
    /// Storage path relative to the configured storage root.
    pub path: String,
    pub size: u64,
    /// Unix seconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePage {
    pub images: Vec<ImageRef>,
    /// 1-based.
    pub current_page: u32,
    /// Always >= 1, also for an empty gallery.
    pub last_page: u32,
}

impl ImagePage {
    pub fn is_last(&self) -> bool {
        self.current_page >= self.last_page
    }
}

#[async_trait]
pub trait GalleryStore: Send + Sync + 'static {
    async fn get_gallery(&self, id: i64) -> Result<Option<Gallery>, StoreError>;

    /// Images of a gallery ordered by ascending id.
    ///
    /// With `after_id` set, the page holds the images following that id
    /// instead of those at the page offset, and `last_page` counts on from
    /// `page`. Images removed from earlier pages then cannot shift later ones.
    async fn list_images_page(
        &self,
        gallery_id: i64,
        page: u32,
        page_size: u32,
        after_id: Option<i64>,
    ) -> Result<ImagePage, StoreError>;

    /// Opens the raw bytes of an image. Blocking; called from the export thread.
    fn open_image(&self, image: &ImageRef) -> std::io::Result<Box<dyn Read + Send>>;

    async fn principal_for_token(&self, token: &str) -> Result<Option<i64>, StoreError>;
}

/// Number of pages needed for `total` items, never less than one.
pub fn last_page(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    (total.div_ceil(size)).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_is_at_least_one() {
        assert_eq!(last_page(0, 10), 1);
        assert_eq!(last_page(1, 10), 1);
        assert_eq!(last_page(10, 10), 1);
        assert_eq!(last_page(11, 10), 2);
        assert_eq!(last_page(30, 10), 3);
    }

    #[test]
    fn page_reports_terminal() {
        let page = ImagePage { images: vec![], current_page: 2, last_page: 3 };
        assert!(!page.is_last());
        let page = ImagePage { images: vec![], current_page: 3, last_page: 3 };
        assert!(page.is_last());
    }
}
