use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppContext;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests whose `x-api-key` header does not match the configured key.
///
/// Installed with `route_layer`, so it runs before the handler parses the body.
pub async fn require_api_key(
    State(ctx): State<AppContext>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let provided = req.headers().get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    if provided == Some(ctx.api_key()) {
        return next.run(req).await;
    }
    ApiError::unauthorized().into_response()
}
