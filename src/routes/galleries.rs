use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    access::{authorize_export, Principal},
    error::{AppError, AppResult, OptionExt},
    state::AppState,
    store::Gallery,
    types::{ImageDto, ImageListQuery, ImageListResponse},
};

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 200;

pub async fn get_gallery(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<Gallery>> {
    let gallery = state.store.get_gallery(id).await?.ok_or_not_found("gallery")?;
    authorize_export(&principal, &gallery)?;
    Ok(Json(gallery))
}

pub async fn list_images(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Query(q): Query<ImageListQuery>,
) -> AppResult<Json<ImageListResponse>> {
    let page = q.page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::BadRequest("page must be at least 1".into()));
    }
    let per_page = q.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(AppError::BadRequest(format!("per_page must be between 1 and {}", MAX_PER_PAGE)));
    }

    let gallery = state.store.get_gallery(id).await?.ok_or_not_found("gallery")?;
    authorize_export(&principal, &gallery)?;

    let result = state.store.list_images_page(id, page, per_page, None).await?;

    Ok(Json(ImageListResponse {
        gallery_id: id,
        page: result.current_page,
        last_page: result.last_page,
        images: result.images.iter().map(ImageDto::from).collect(),
    }))
}

/// Streams the whole gallery as `tar.gz`.
///
/// Headers go out as soon as the export job is running; the body follows
/// while the archive is produced. A client disconnect drops the body, which
/// stops the job.
pub async fn export_gallery(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let (gallery, stream) = state.exporter.export(&principal, id).await?;

    let mut response = Body::from_stream(stream).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/gzip"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    let disposition = format!("attachment; filename=\"{}.tar.gz\"", archive_file_stem(&gallery));
    if let Ok(header_val) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, header_val);
    }
    Ok(response)
}

/// ASCII-only file name derived from the gallery title.
pub fn archive_file_stem(gallery: &Gallery) -> String {
    let mut stem = String::with_capacity(gallery.title.len());
    for c in gallery.title.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        format!("gallery-{}", gallery.id)
    } else {
        stem.to_string()
    }
}
