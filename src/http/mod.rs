//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → upload.rs (multipart → UploadRequest)
//!     → handlers.rs (decode → upscale → persist → PNG)
//!     → error.rs (ApiError → status + JSON body)
//!     → Send to client
//! ```
//!
//! # Routes
//! - `GET /`          → "Empty Page"
//! - `POST /upscale`  → `image/png`, or 400 `{"error": "No image provided"}`
//! - `GET /status`    → version and model info as JSON
//! - `GET /upscaled/{unique_id}` → stored `image/png`, or 404 `{"error": "Image not found"}`

pub mod error;
pub mod handlers;
pub mod server;
pub mod upload;

pub use error::{ApiError, ProcessingError};
pub use server::{AppState, HttpServer};
pub use upload::UploadRequest;
