//! OpenCV `dnn_superres` backend.
//!
//! Hands the whole pipeline (Y-channel split, network, bicubic chroma,
//! merge) to `cv::dnn_superres::DnnSuperResImpl`. Only built with the
//! `opencv` feature, which needs a system OpenCV with the contrib modules.

use std::path::Path;
use std::sync::Mutex;

use ::opencv::core::{self, Mat, Scalar};
use ::opencv::dnn_superres::DnnSuperResImpl;
use ::opencv::prelude::*;

use crate::imaging::{ChannelOrder, PixelBuffer};
use crate::superres::{ModelKind, SuperResError, SuperResolution};

impl From<::opencv::Error> for SuperResError {
    fn from(e: ::opencv::Error) -> Self {
        SuperResError::Backend(e.to_string())
    }
}

/// `DnnSuperResImpl` needs `&mut self` to run, so calls are serialized.
pub struct OpenCvSuperRes {
    kind: ModelKind,
    scale: u32,
    inner: Mutex<DnnSuperResImpl>,
}

impl OpenCvSuperRes {
    pub fn from_path(path: &Path, kind: ModelKind, scale: u32) -> Result<Self, SuperResError> {
        if !kind.supports_scale(scale) {
            return Err(SuperResError::UnsupportedScale { kind, scale });
        }
        let path_str = path.to_str().ok_or_else(|| {
            SuperResError::InvalidGraph(format!("model path {} is not UTF-8", path.display()))
        })?;
        // OpenCV reports a missing file as a generic parse failure.
        std::fs::metadata(path)?;

        let mut sr = DnnSuperResImpl::default()?;
        sr.read_model(path_str)?;
        sr.set_model(kind.as_str(), scale as i32)?;

        tracing::info!(
            path = %path.display(),
            model = %kind,
            scale,
            backend = "opencv",
            "Model loaded"
        );

        Ok(Self {
            kind,
            scale,
            inner: Mutex::new(sr),
        })
    }
}

impl SuperResolution for OpenCvSuperRes {
    fn upsample(&self, input: &PixelBuffer) -> Result<PixelBuffer, SuperResError> {
        let bgr = input.clone().to_order(ChannelOrder::Bgr);
        let mut src = Mat::new_rows_cols_with_default(
            bgr.height() as i32,
            bgr.width() as i32,
            core::CV_8UC3,
            Scalar::all(0.0),
        )?;
        src.data_bytes_mut()?.copy_from_slice(bgr.as_bytes());

        let mut dst = Mat::default();
        {
            let mut sr = self
                .inner
                .lock()
                .map_err(|_| SuperResError::InvalidGraph("opencv engine poisoned".into()))?;
            sr.upsample(&src, &mut dst)?;
        }

        if dst.typ() != core::CV_8UC3 {
            return Err(SuperResError::Shape(format!(
                "opencv returned mat type {}, expected CV_8UC3",
                dst.typ()
            )));
        }
        let dst = if dst.is_continuous() { dst } else { dst.try_clone()? };

        Ok(PixelBuffer::from_raw(
            dst.cols() as u32,
            dst.rows() as u32,
            ChannelOrder::Bgr,
            dst.data_bytes()?.to_vec(),
        )?)
    }

    fn scale(&self) -> u32 {
        self.scale
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }
}
