use serde::{Deserialize, Serialize};

use crate::export::display_name;
use crate::store::ImageRef;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Public view of an image; the storage path is not exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDto {
    pub id: i64,
    pub name: String,
    pub size: u64,
    pub created_at: i64,
}

impl From<&ImageRef> for ImageDto {
    fn from(image: &ImageRef) -> Self {
        Self { id: image.id, name: display_name(image), size: image.size, created_at: image.created_at }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageListResponse {
    pub gallery_id: i64,
    pub page: u32,
    pub last_page: u32,
    pub images: Vec<ImageDto>,
}
