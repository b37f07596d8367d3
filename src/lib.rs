//! ESPCN image upscaling service library.

pub mod config;
pub mod http;
pub mod imaging;
pub mod lifecycle;
pub mod observability;
pub mod output;
pub mod superres;

pub use config::UpscalerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use superres::{DnnSuperRes, SuperResolution};
