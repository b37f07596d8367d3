//! Y-channel super-resolution on top of a compiled graph.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::Rgb32FImage;
use ndarray::{Array2, Array4, Axis, Ix4};
use prost::Message;

use crate::imaging::color;
use crate::imaging::PixelBuffer;
use crate::superres::graph::Graph;
use crate::superres::proto::GraphDef;
use crate::superres::{ModelKind, SuperResError, SuperResolution};

/// A loaded model plus the scale it was trained for.
///
/// Only the luma channel goes through the network. Chroma is resized
/// bicubically and merged back afterwards.
#[derive(Debug)]
pub struct DnnSuperRes {
    kind: ModelKind,
    scale: u32,
    graph: Graph,
}

impl DnnSuperRes {
    pub fn from_path(path: &Path, kind: ModelKind, scale: u32) -> Result<Self, SuperResError> {
        Self::from_path_with_output(path, kind, scale, None)
    }

    pub fn from_path_with_output(
        path: &Path,
        kind: ModelKind,
        scale: u32,
        output_node: Option<&str>,
    ) -> Result<Self, SuperResError> {
        let bytes = std::fs::read(path)?;
        let engine = Self::from_bytes(&bytes, kind, scale, output_node)?;
        tracing::info!(
            path = %path.display(),
            model = %kind,
            scale,
            input = engine.graph.input_name(),
            output = engine.graph.output_name(),
            "Model loaded"
        );
        Ok(engine)
    }

    pub fn from_bytes(
        bytes: &[u8],
        kind: ModelKind,
        scale: u32,
        output_node: Option<&str>,
    ) -> Result<Self, SuperResError> {
        if !kind.supports_scale(scale) {
            return Err(SuperResError::UnsupportedScale { kind, scale });
        }
        let def = GraphDef::decode(bytes)?;
        let graph = Graph::compile(&def, output_node)?;
        Ok(Self { kind, scale, graph })
    }

    /// Run the network on a `[h, w]` luma plane, returning `[h*s, w*s]`.
    ///
    /// The result may come back NHWC or, for graphs exported for OpenCV's
    /// importer, transposed to NCHW.
    fn infer_luma(&self, ycrcb: &Rgb32FImage) -> Result<Array2<f32>, SuperResError> {
        let (w, h) = ycrcb.dimensions();
        let luma: Vec<f32> = ycrcb.pixels().map(|p| p.0[0]).collect();
        let feed = Array4::from_shape_vec((1, h as usize, w as usize, 1), luma)
            .map_err(|e| SuperResError::Shape(e.to_string()))?;

        let out = self
            .graph
            .run(feed.into_dyn())?
            .into_dimensionality::<Ix4>()
            .map_err(|_| SuperResError::Shape("network output is not rank 4".into()))?;

        let (out_h, out_w) = ((h * self.scale) as usize, (w * self.scale) as usize);
        match out.dim() {
            (1, oh, ow, 1) if (oh, ow) == (out_h, out_w) => {
                Ok(out.index_axis_move(Axis(3), 0).index_axis_move(Axis(0), 0))
            }
            (1, 1, oh, ow) if (oh, ow) == (out_h, out_w) => {
                Ok(out.index_axis_move(Axis(1), 0).index_axis_move(Axis(0), 0))
            }
            other => Err(SuperResError::Shape(format!(
                "network produced {:?}, expected a single {}x{} plane for x{}",
                other, out_h, out_w, self.scale
            ))),
        }
    }
}

impl SuperResolution for DnnSuperRes {
    fn upsample(&self, input: &PixelBuffer) -> Result<PixelBuffer, SuperResError> {
        let ycrcb = color::to_ycrcb(input);
        let luma = self.infer_luma(&ycrcb)?;
        let (out_h, out_w) = luma.dim();

        let mut merged = imageops::resize(&ycrcb, out_w as u32, out_h as u32, FilterType::CatmullRom);
        for (x, y, px) in merged.enumerate_pixels_mut() {
            px.0[0] = luma[[y as usize, x as usize]];
        }

        Ok(color::from_ycrcb(&merged)?)
    }

    fn scale(&self) -> u32 {
        self.scale
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }
}
