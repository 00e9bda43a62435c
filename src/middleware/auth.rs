use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::access::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// Resolves the caller from `Authorization: Bearer <token>`.
///
/// Requests without the header continue as anonymous. A token that is not
/// known to the store is rejected with `401`.
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").map(str::trim));

    let principal = match token {
        None => Principal::anonymous(),
        Some(Some(token)) if !token.is_empty() => match state.store.principal_for_token(token).await {
            Ok(Some(user_id)) => Principal::user(user_id),
            Ok(None) => return AppError::Unauthorized("unknown API token".into()).into_response(),
            Err(e) => return AppError::from(e).into_response(),
        },
        Some(_) => return AppError::Unauthorized("expected a Bearer token".into()).into_response(),
    };

    req.extensions_mut().insert(principal);
    next.run(req).await
}
