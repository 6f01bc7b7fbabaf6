use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::{EcommerceError, ErrorKind};

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Domain(EcommerceError),
    /// Missing or unreadable identity headers.
    Unauthenticated,
    /// Authenticated, but with the wrong role for the route.
    Forbidden,
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<i32>,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unavailable | ErrorKind::InsufficientStock | ErrorKind::InvalidInput | ErrorKind::EmptyCart => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Domain(err) => {
                let kind = err.kind();
                let message = match kind {
                    ErrorKind::Internal => {
                        tracing::error!(error = %err, "request failed");
                        "Internal server error".to_string()
                    }
                    _ => err.to_string(),
                };
                let available = match &err {
                    EcommerceError::InsufficientStock { available, .. } => Some(*available),
                    _ => None,
                };
                (status_for(kind), ErrorBody { success: false, kind, message, available })
            }
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                ErrorBody { success: false, kind: ErrorKind::Unauthorized, message: "Authentication required".into(), available: None },
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                ErrorBody { success: false, kind: ErrorKind::Unauthorized, message: "Access denied".into(), available: None },
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { success: false, kind: ErrorKind::InvalidInput, message, available: None },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<EcommerceError> for ApiError {
    fn from(err: EcommerceError) -> Self { ApiError::Domain(err) }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

pub type ApiResult<T> = Result<T, ApiError>;
