//! Multipart upload parsing.
//!
//! Fields:
//! - `image` (file, required): raw bytes of the picture to upscale
//! - `uniqueId` (text, optional): caller label for logs and the output file
//!
//! Unknown fields are skipped. An empty `image` part counts as missing.

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartRejection};

use crate::http::error::ApiError;

pub const IMAGE_FIELD: &str = "image";
pub const UNIQUE_ID_FIELD: &str = "uniqueId";

/// A parsed `POST /upscale` body.
#[derive(Debug)]
pub struct UploadRequest {
    pub image: Bytes,
    pub unique_id: Option<String>,
}

impl UploadRequest {
    /// Read every field of the form. A request that is not multipart at all
    /// is treated as carrying no image.
    pub async fn from_multipart(
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Self, ApiError> {
        let mut multipart = match multipart {
            Ok(m) => m,
            Err(rejection) => {
                tracing::debug!(reason = %rejection.body_text(), "Request is not a multipart form");
                return Err(ApiError::no_image());
            }
        };

        let mut image = None;
        let mut unique_id = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some(IMAGE_FIELD) => {
                    let bytes = field.bytes().await?;
                    if !bytes.is_empty() {
                        image = Some(bytes);
                    }
                }
                Some(UNIQUE_ID_FIELD) => {
                    unique_id = Some(field.text().await?);
                }
                other => {
                    tracing::trace!(field = ?other, "Ignoring form field");
                }
            }
        }

        let image = image.ok_or_else(ApiError::no_image)?;
        Ok(Self { image, unique_id })
    }
}
