use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::validation::Violation;

/// An error surfaced to HTTP clients. The body is always `{"detail": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    Detail { status: StatusCode, message: String },
    Unprocessable(Vec<Violation>),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Detail { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    pub fn unauthorized() -> Self {
        Self::Detail {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid or missing API Key".to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Detail { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Detail { status, .. } => *status,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Detail { status, message } => {
                (status, Json(json!({ "detail": message }))).into_response()
            }
            Self::Unprocessable(violations) => {
                let detail: Vec<_> = violations.iter().map(Violation::to_json).collect();
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": detail }))).into_response()
            }
        }
    }
}
