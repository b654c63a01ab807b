//! Error handling module
//!
//! HTTP-facing error type and its response conversion. Service errors are
//! mapped to status codes here; 5xx causes are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::ServiceError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Service errors
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn service_status(error: &ServiceError) -> (StatusCode, &'static str, Option<String>) {
    match error {
        // 401 Unauthorized
        ServiceError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),

        // 404 Not Found
        ServiceError::NotFound { id, .. } => (StatusCode::NOT_FOUND, "not_found", Some(id.clone())),

        // 409 Conflict
        ServiceError::DuplicateEmail(_) => (StatusCode::CONFLICT, "duplicate_email", None),
        ServiceError::DuplicateEntry(entity) => {
            (StatusCode::CONFLICT, "duplicate_entry", Some(entity.to_string()))
        }
        ServiceError::HasDependents { id, .. } => {
            (StatusCode::CONFLICT, "has_dependents", Some(id.clone()))
        }

        // 422 Unprocessable Entity
        ServiceError::InvalidReference(target) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_reference",
            Some(target.to_string()),
        ),
        ServiceError::InvalidDate(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_date", None),

        // 500 Internal Server Error
        ServiceError::HashingError(msg) => {
            tracing::error!("Password hashing failed: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, "hashing_error", None)
        }
        ServiceError::CredentialValidationError(msg) => {
            tracing::error!("Credential validation failed: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, "credential_validation_error", None)
        }
        ServiceError::StorageFault(e) => {
            tracing::error!("Storage fault: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "storage_fault", None)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            AppError::Service(service_err) => service_status(service_err),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_service_error_status_codes() {
        assert_eq!(
            status_of(ServiceError::not_found("user", "1").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::DuplicateEmail("a@b.c".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::has_dependents("user", "1").into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ServiceError::Unauthorized.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ServiceError::InvalidReference("category").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ServiceError::StorageFault(StoreError::Unavailable("down".into())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::InvalidRequest("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_storage_fault_body_hides_detail() {
        let err: AppError =
            ServiceError::StorageFault(StoreError::Unavailable("10.0.0.5:5432 refused".into()))
                .into();
        let response = err.into_response();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["errorCode"], "storage_fault");
        assert!(!body.to_string().contains("10.0.0.5"));
    }
}
