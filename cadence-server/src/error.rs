//! Mapping from engine errors to HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use libcadence::CadenceError;
use serde::Serialize;

/// Error body: `{"kind": "...", "error": "..."}`.
///
/// `kind` lets clients tell a conflict from a validation failure even though
/// both are 400s.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError(pub CadenceError);

impl From<CadenceError> for ApiError {
    fn from(e: CadenceError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CadenceError::Validation(_) | CadenceError::Conflict(_) => StatusCode::BAD_REQUEST,
            CadenceError::NotFound(_) => StatusCode::NOT_FOUND,
            CadenceError::Publisher(_) => StatusCode::BAD_GATEWAY,
            CadenceError::Database(_) | CadenceError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::debug!(kind = self.0.kind(), error = %self.0, "request rejected");
        }

        let body = ErrorBody {
            kind: self.0.kind(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
