use std::{
    io::{self, Read},
    path::Path,
    sync::Arc,
};

use crate::archive::ArchiveEntry;
use crate::store::{GalleryStore, ImageRef, StoreError};

/// Name an image gets inside the archive.
///
/// The stored name if it is non-blank, else the last component of the
/// storage path, else `image-<id>`. Path separators become `_`.
pub fn display_name(image: &ImageRef) -> String {
    let trimmed = image.name.trim();
    let base = if !trimmed.is_empty() {
        trimmed.to_string()
    } else {
        Path::new(&image.path)
            .file_name()
            .map(|n| n.to_string_lossy().trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("image-{}", image.id))
    };
    base.chars().map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c }).collect()
}

/// Fetches every image of a gallery, page by page in ascending id order.
///
/// Pages after the first continue from the last id seen, not from an offset.
/// The first failing page aborts the whole listing.
pub async fn collect_gallery_images(
    store: &dyn GalleryStore,
    gallery_id: i64,
    page_size: u32,
) -> Result<Vec<ImageRef>, StoreError> {
    let mut images: Vec<ImageRef> = Vec::new();
    let mut page = 1u32;
    loop {
        let after_id = images.last().map(|i| i.id);
        let current = store.list_images_page(gallery_id, page, page_size, after_id).await?;
        tracing::debug!(
            gallery_id,
            page = current.current_page,
            last_page = current.last_page,
            count = current.images.len(),
            "fetched image page"
        );
        let is_last = current.is_last() || current.images.is_empty();
        images.extend(current.images);
        if is_last {
            return Ok(images);
        }
        page += 1;
    }
}

/// An image adapted to the archive encoder; its bytes are opened lazily.
pub struct ImageEntry {
    image: ImageRef,
    name: String,
    store: Arc<dyn GalleryStore>,
}

impl ImageEntry {
    pub fn new(image: ImageRef, store: Arc<dyn GalleryStore>) -> Self {
        let name = display_name(&image);
        Self { image, name, store }
    }
}

impl ArchiveEntry for ImageEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.image.size
    }

    fn mtime(&self) -> u64 {
        self.image.created_at.max(0) as u64
    }

    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        let reader: Box<dyn Read + '_> = self.store.open_image(&self.image)?;
        Ok(reader)
    }
}
