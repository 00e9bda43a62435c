#[cfg(test)]
mod tests {
    use crate::error::{AppError, AppResult, OptionExt};
    use crate::store::StoreError;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;
    use std::io;

    #[test]
    fn test_app_error_display() {
        let error = AppError::BadRequest("Invalid input".to_string());
        assert_eq!(format!("{}", error), "Bad request: Invalid input");

        let error = AppError::NotFound("gallery not found".to_string());
        assert_eq!(format!("{}", error), "Not found: gallery not found");

        let error = AppError::ExportBusy { retry_after_seconds: 7 };
        assert_eq!(format!("{}", error), "Export capacity exhausted. Retry after 7 seconds");
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = vec![
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::ExportBusy { retry_after_seconds: 1 }, StatusCode::SERVICE_UNAVAILABLE),
            (AppError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::IoError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Internal(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_export_busy_response() {
        let response = AppError::ExportBusy { retry_after_seconds: 3 }.into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], 503);
        assert_eq!(json["error"]["code"], "EXPORT_BUSY");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Internal(anyhow::anyhow!("secret path /srv/x")).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("secret"));
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(json["error"]["details"]["error_id"].is_string());
    }

    #[test]
    fn test_error_conversions() {
        let err: AppError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, AppError::IoError(_)));

        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError = StoreError::Io(io::Error::other("disk")).into();
        assert!(matches!(err, AppError::IoError(_)));

        let err: AppError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_option_ext() {
        let found: AppResult<i32> = Some(1).ok_or_not_found("gallery");
        assert_eq!(found.unwrap(), 1);

        let missing: AppResult<i32> = None.ok_or_not_found("gallery");
        match missing {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "gallery not found"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
