//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the upscaler.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the upscaling service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpscalerConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Super-resolution model selection.
    pub model: ModelConfig,

    /// Where upscaled results are written on disk.
    pub output: OutputConfig,

    /// HTTP surface toggles.
    pub http: HttpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Maximum accepted request body in bytes (multipart upload included).
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Model configuration. Static for the life of the process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the frozen graph (`.pb`).
    pub path: String,

    /// Model family ("espcn", "fsrcnn", "lapsrn").
    pub name: String,

    /// Linear scale factor the model was trained for.
    pub scale: u32,

    /// Graph node to read the result from. Detected when unset.
    /// Only the native backend reads this.
    pub output_node: Option<String>,

    /// Inference engine that runs the graph.
    pub backend: ModelBackend,
}

/// Inference engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Graph executed in-process on ndarray.
    Native,
    /// OpenCV's `dnn_superres` module. Needs the `opencv` feature.
    Opencv,
}

impl Default for ModelBackend {
    fn default() -> Self {
        if cfg!(feature = "opencv") {
            ModelBackend::Opencv
        } else {
            ModelBackend::Native
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/ESPCN_x4.pb".to_string(),
            name: "espcn".to_string(),
            scale: 4,
            output_node: None,
            backend: ModelBackend::default(),
        }
    }
}

/// Output persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write every upscaled image to `directory`.
    pub enabled: bool,

    /// Target directory for `<uniqueId>-upscaled.png` files.
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: ".".to_string(),
        }
    }
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HttpConfig {
    /// Answer cross-origin requests from any origin.
    pub cors_enabled: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
