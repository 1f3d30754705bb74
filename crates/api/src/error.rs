//! API error boundary
//!
//! Domain errors are recovered here into user-facing responses with stable
//! `code` values the UI branches on; storage failures collapse to a
//! generic 500 without leaking detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use motorlot_entitlements::EntitlementError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Conflict {
        code: &'static str,
        message: String,
    },

    #[error("internal error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ApiError::Conflict { code, .. } => (StatusCode::CONFLICT, code),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            // Never leak internals to the client
            ApiError::Internal => "internal error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

impl From<EntitlementError> for ApiError {
    fn from(err: EntitlementError) -> Self {
        match err {
            EntitlementError::NotFound(_) => ApiError::NotFound,
            EntitlementError::Forbidden => ApiError::Forbidden,
            EntitlementError::InsufficientCredits => ApiError::Conflict {
                code: "insufficient_credits",
                message: err.to_string(),
            },
            EntitlementError::AlreadyFeatured => ApiError::Conflict {
                code: "already_featured",
                message: err.to_string(),
            },
            EntitlementError::AlreadySold => ApiError::Conflict {
                code: "already_sold",
                message: err.to_string(),
            },
            EntitlementError::AlreadyOnPlan(_) => ApiError::Conflict {
                code: "already_on_plan",
                message: err.to_string(),
            },
            EntitlementError::ConcurrentModification(_) => ApiError::Conflict {
                code: "concurrent_modification",
                message: "request conflicted with another update, retry".to_string(),
            },
            EntitlementError::InvalidPlan(_) | EntitlementError::InvalidPaymentAmount(_) => {
                ApiError::Validation(err.to_string())
            }
            EntitlementError::Database(detail) => {
                tracing::error!(error = %detail, "Storage failure at API boundary");
                ApiError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_credits_maps_to_branchable_code() {
        let err = ApiError::from(EntitlementError::InsufficientCredits);
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "insufficient_credits");
    }

    #[test]
    fn test_database_error_hides_detail() {
        let err = ApiError::from(EntitlementError::Database("password=hunter2".to_string()));
        assert_eq!(err.to_string(), "internal error");
    }

    #[test]
    fn test_invalid_payment_amount_is_validation() {
        let err = ApiError::from(EntitlementError::InvalidPaymentAmount(100));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "validation_error");
    }
}
