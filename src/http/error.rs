//! API error types and conversions.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::imaging::PixelError;
use crate::superres::SuperResError;

/// Message returned when the upload carries no usable `image` part.
pub const NO_IMAGE: &str = "No image provided";

/// Message returned when no stored result exists for an id.
pub const IMAGE_NOT_FOUND: &str = "Image not found";

/// API error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400: the request is missing something required.
    #[error("{0}")]
    Validation(String),
    /// 404: nothing stored under the requested id.
    #[error("{0}")]
    NotFound(String),
    /// Status chosen by the multipart parser (400 or 413).
    #[error("invalid multipart body: {0}")]
    Upload(#[from] MultipartError),
    /// 500: decoding, inference, encoding or persistence failed.
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    /// 500: a stored result exists but could not be read.
    #[error("Failed to read result: {0}")]
    Storage(#[source] std::io::Error),
}

/// Failures after the upload was accepted.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] PixelError),
    #[error("Upscaling failed: {0}")]
    Inference(#[from] SuperResError),
    #[error("Failed to encode result: {0}")]
    Encode(#[source] PixelError),
    #[error("Failed to save result: {0}")]
    Persist(#[from] std::io::Error),
    #[error("Upscaling task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Standard error response format.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    pub fn no_image() -> Self {
        ApiError::Validation(NO_IMAGE.to_string())
    }

    pub fn image_not_found() -> Self {
        ApiError::NotFound(IMAGE_NOT_FOUND.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upload(e) => e.status(),
            ApiError::Processing(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Validation(msg) | ApiError::NotFound(msg) => {
                tracing::debug!(%msg, "Rejected request");
                msg.clone()
            }
            ApiError::Upload(e) => {
                tracing::warn!(error = %e, "Malformed upload");
                e.body_text()
            }
            ApiError::Processing(e) => {
                tracing::error!(error = %e, "Upscale failed");
                e.to_string()
            }
            ApiError::Storage(_) => {
                tracing::error!(error = %self, "Stored result unreadable");
                self.to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
