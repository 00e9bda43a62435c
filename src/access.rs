//! Who may read or export a gallery.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use crate::error::{AppError, AppResult};
use crate::store::Gallery;

/// The caller of a request, resolved by [`crate::middleware::auth`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Option<i64>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user(id: i64) -> Self {
        Self { user_id: Some(id) }
    }
}

/// Never rejects: without a resolved principal the caller is anonymous.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Principal>().copied().unwrap_or_default())
    }
}

/// Published galleries are open to everyone, private ones to their owner.
pub fn authorize_export(principal: &Principal, gallery: &Gallery) -> AppResult<()> {
    if gallery.published || principal.user_id == Some(gallery.owner_id) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!("not allowed to access gallery {}", gallery.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery(owner_id: i64, published: bool) -> Gallery {
        Gallery { id: 1, title: "g".into(), owner_id, published, created_at: String::new() }
    }

    #[test]
    fn published_gallery_is_open() {
        assert!(authorize_export(&Principal::anonymous(), &gallery(5, true)).is_ok());
        assert!(authorize_export(&Principal::user(9), &gallery(5, true)).is_ok());
    }

    #[test]
    fn private_gallery_is_owner_only() {
        assert!(authorize_export(&Principal::user(5), &gallery(5, false)).is_ok());
        assert!(matches!(
            authorize_export(&Principal::user(9), &gallery(5, false)),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_export(&Principal::anonymous(), &gallery(5, false)),
            Err(AppError::Forbidden(_))
        ));
    }
}
