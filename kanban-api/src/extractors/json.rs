//! JSON body extractor with `ApiError` rejections.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{ApiError, ErrorCode};

/// `axum::Json`, but malformed bodies are answered with the API's error
/// envelope instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let code = match rejection {
            JsonRejection::MissingJsonContentType(_) => ErrorCode::InvalidFormat,
            JsonRejection::JsonSyntaxError(_) => ErrorCode::InvalidFormat,
            _ => ErrorCode::InvalidInput,
        };
        ApiError::new(code, rejection.body_text())
    }
}

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
