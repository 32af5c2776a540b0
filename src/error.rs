use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error taxonomy for the product core.
///
/// `NotFoundOrUnauthorized` deliberately collapses "does not exist" and
/// "exists but is not yours" so an owner-scoped route never leaks whether
/// another user's listing exists.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    #[error("Product not found")]
    NotFound,

    #[error("Product not found or unauthorized")]
    NotFoundOrUnauthorized,

    #[error("storage error")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::NotFoundOrUnauthorized => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Storage(e) => {
                error!(error = %e, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
            }
            ApiError::Internal(e) => {
                error!(error = %e, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let res = ApiError::InvalidInput("Invalid product price".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_status_maps_to_bad_request() {
        let res = ApiError::InvalidStatus("ARCHIVED".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn ownership_violation_collapses_to_not_found() {
        let res = ApiError::NotFoundOrUnauthorized.into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_failure_maps_to_internal_error() {
        let res = ApiError::Storage(sqlx::Error::PoolClosed).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
