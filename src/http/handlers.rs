//! Route handlers.

use std::time::Instant;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::http::error::{ApiError, ProcessingError};
use crate::http::server::AppState;
use crate::http::upload::UploadRequest;
use crate::imaging::{ChannelOrder, PixelBuffer};
use crate::observability::metrics;

pub async fn home() -> &'static str {
    "Empty Page"
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub model: ModelStatus,
}

#[derive(Serialize)]
pub struct ModelStatus {
    pub name: String,
    pub scale: u32,
    pub path: String,
}

pub async fn status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        model: ModelStatus {
            name: state.engine.kind().to_string(),
            scale: state.engine.scale(),
            path: state.model_path.to_string(),
        },
    })
}

/// `POST /upscale`: multipart image in, PNG out.
pub async fn upscale(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let start = Instant::now();
    let response = match handle_upscale(&state, multipart).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    metrics::record_request(response.status().as_u16(), start);
    response
}

async fn handle_upscale(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let upload = UploadRequest::from_multipart(multipart).await?;
    let unique_id = upload
        .unique_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::info!(unique_id = %unique_id, bytes = upload.image.len(), "Upscale request received");

    let engine = state.engine.clone();
    let image = upload.image;
    let (input_dims, output_dims, png) = tokio::task::spawn_blocking(move || {
        let input = PixelBuffer::decode(&image)
            .map_err(ProcessingError::Decode)?
            .to_order(ChannelOrder::Bgr);

        let inference_start = Instant::now();
        let output = engine.upsample(&input)?;
        metrics::record_inference(inference_start);

        let png = output.encode_png().map_err(ProcessingError::Encode)?;
        Ok::<_, ProcessingError>((
            (input.width(), input.height()),
            (output.width(), output.height()),
            png,
        ))
    })
    .await
    .map_err(ProcessingError::from)??;

    if let Some(store) = &state.output {
        store
            .write(&unique_id, &png)
            .await
            .map_err(ProcessingError::from)?;
    }

    tracing::info!(
        unique_id = %unique_id,
        input = ?input_dims,
        output = ?output_dims,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Upscale complete"
    );

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// `GET /upscaled/{unique_id}`: a previously stored result.
pub async fn upscaled(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Response, ApiError> {
    let store = state.output.as_ref().ok_or_else(ApiError::image_not_found)?;
    let png = store
        .read(&unique_id)
        .await
        .map_err(ApiError::Storage)?
        .ok_or_else(ApiError::image_not_found)?;

    tracing::debug!(unique_id = %unique_id, bytes = png.len(), "Serving stored result");
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
