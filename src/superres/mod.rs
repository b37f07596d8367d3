//! Super-resolution inference subsystem.
//!
//! # Data Flow
//! ```text
//! model file (.pb, frozen TensorFlow graph)
//!     → proto.rs (prost decode into GraphDef)
//!     → graph.rs (compile: resolve inputs, prune, topo-sort, load constants)
//!     → dnn.rs (DnnSuperRes: model kind + scale + compiled graph)
//!
//! Per request (blocking thread):
//!     BGR PixelBuffer
//!     → YCrCb float planes (imaging::color)
//!     → Y plane through graph.rs / ops.rs
//!     → bicubic chroma + network Y merged back to BGR
//! ```
//!
//! # Design Decisions
//! - The engine is loaded once and shared immutably (`Arc<dyn SuperResolution>`)
//! - Unsupported graph ops fail at load time, never mid-request
//! - The default build runs graphs in-process on ndarray; the `opencv`
//!   feature swaps in OpenCV's `dnn_superres` (see `cv.rs`)

#[cfg(feature = "opencv")]
pub mod cv;
pub mod dnn;
pub mod graph;
pub mod ops;
pub mod proto;

use std::fmt;
use std::str::FromStr;

use crate::imaging::{PixelBuffer, PixelError};

#[cfg(feature = "opencv")]
pub use cv::OpenCvSuperRes;
pub use dnn::DnnSuperRes;
pub use graph::Graph;

/// Errors raised while loading or running a model.
#[derive(Debug, thiserror::Error)]
pub enum SuperResError {
    #[error("failed to read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("model is not a valid GraphDef: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("node '{node}' uses unsupported op {op}")]
    UnsupportedOp { node: String, op: String },
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
    #[error("shape error: {0}")]
    Shape(String),
    #[error("unknown model '{0}' (expected espcn, fsrcnn or lapsrn)")]
    UnknownModel(String),
    #[error("{kind} does not support x{scale}")]
    UnsupportedScale { kind: ModelKind, scale: u32 },
    #[error(transparent)]
    Pixels(#[from] PixelError),
    #[error("inference backend: {0}")]
    Backend(String),
}

/// Model families that share the Y-channel pre/post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Espcn,
    Fsrcnn,
    Lapsrn,
}

impl ModelKind {
    /// Scales the published pre-trained models exist for.
    pub fn scales(&self) -> &'static [u32] {
        match self {
            ModelKind::Espcn | ModelKind::Fsrcnn => &[2, 3, 4],
            ModelKind::Lapsrn => &[2, 4, 8],
        }
    }

    pub fn supports_scale(&self, scale: u32) -> bool {
        self.scales().contains(&scale)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Espcn => "espcn",
            ModelKind::Fsrcnn => "fsrcnn",
            ModelKind::Lapsrn => "lapsrn",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = SuperResError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "espcn" => Ok(ModelKind::Espcn),
            "fsrcnn" => Ok(ModelKind::Fsrcnn),
            "lapsrn" => Ok(ModelKind::Lapsrn),
            _ => Err(SuperResError::UnknownModel(s.to_string())),
        }
    }
}

/// An upscaling engine: pixel buffer in, larger pixel buffer out.
pub trait SuperResolution: Send + Sync {
    /// Upscale `input`. The result has dimensions `scale()` times larger and
    /// is in BGR order.
    fn upsample(&self, input: &PixelBuffer) -> Result<PixelBuffer, SuperResError>;

    fn scale(&self) -> u32;

    fn kind(&self) -> ModelKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_parse() {
        assert_eq!("espcn".parse::<ModelKind>().unwrap(), ModelKind::Espcn);
        assert_eq!("FSRCNN".parse::<ModelKind>().unwrap(), ModelKind::Fsrcnn);
        assert!(matches!(
            "edsr".parse::<ModelKind>(),
            Err(SuperResError::UnknownModel(name)) if name == "edsr"
        ));
    }

    #[test]
    fn test_model_scales() {
        assert!(ModelKind::Espcn.supports_scale(4));
        assert!(!ModelKind::Espcn.supports_scale(8));
        assert!(ModelKind::Lapsrn.supports_scale(8));
        assert!(!ModelKind::Lapsrn.supports_scale(3));
    }
}
