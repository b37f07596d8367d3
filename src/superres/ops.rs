//! Tensor kernels for the graph executor. All image tensors are NHWC.

use ndarray::{s, Array2, Array4, ArrayD, ArrayView4, ArrayViewD, IxDyn, Zip};

use crate::superres::SuperResError;

/// Spatial padding mode of a convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    Same,
    Valid,
}

impl Padding {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SAME" => Some(Padding::Same),
            "VALID" => Some(Padding::Valid),
            _ => None,
        }
    }
}

/// Stride-1 2D convolution.
///
/// `input` is `[n, h, w, c_in]`, `filter` is `[kh, kw, c_in, c_out]`.
/// Works one output row at a time: the receptive fields of a row are
/// gathered into a `[w, kh*kw*c_in]` patch matrix and multiplied with the
/// flattened filter.
pub fn conv2d(
    input: ArrayView4<'_, f32>,
    filter: ArrayView4<'_, f32>,
    padding: Padding,
) -> Result<Array4<f32>, SuperResError> {
    let (n, h, w, c_in) = input.dim();
    let (kh, kw, f_in, c_out) = filter.dim();
    if f_in != c_in {
        return Err(SuperResError::Shape(format!(
            "Conv2D filter expects {f_in} input channels, got {c_in}"
        )));
    }

    let (out_h, out_w, pad_top, pad_left) = match padding {
        Padding::Same => (h, w, (kh - 1) / 2, (kw - 1) / 2),
        Padding::Valid => {
            if h < kh || w < kw {
                return Err(SuperResError::Shape(format!(
                    "{h}x{w} input is smaller than {kh}x{kw} VALID kernel"
                )));
            }
            (h - kh + 1, w - kw + 1, 0, 0)
        }
    };

    let patch_len = kh * kw * c_in;
    let kernel = Array2::from_shape_vec((patch_len, c_out), filter.iter().copied().collect())
        .map_err(|e| SuperResError::Shape(e.to_string()))?;

    let mut output = Array4::<f32>::zeros((n, out_h, out_w, c_out));
    let mut patches = Array2::<f32>::zeros((out_w, patch_len));

    for b in 0..n {
        for y in 0..out_h {
            patches.fill(0.0);
            for ky in 0..kh {
                let iy = (y + ky) as isize - pad_top as isize;
                if iy < 0 || iy >= h as isize {
                    continue;
                }
                let in_row = input.slice(s![b, iy as usize, .., ..]);
                for x in 0..out_w {
                    for kx in 0..kw {
                        let ix = (x + kx) as isize - pad_left as isize;
                        if ix < 0 || ix >= w as isize {
                            continue;
                        }
                        let offset = (ky * kw + kx) * c_in;
                        patches
                            .slice_mut(s![x, offset..offset + c_in])
                            .assign(&in_row.slice(s![ix as usize, ..]));
                    }
                }
            }
            output
                .slice_mut(s![b, y, .., ..])
                .assign(&patches.dot(&kernel));
        }
    }

    Ok(output)
}

/// Rearrange depth into `block x block` spatial tiles (TensorFlow DCR order).
pub fn depth_to_space(
    input: ArrayView4<'_, f32>,
    block: usize,
) -> Result<Array4<f32>, SuperResError> {
    let (n, h, w, c) = input.dim();
    if block == 0 || c % (block * block) != 0 {
        return Err(SuperResError::Shape(format!(
            "DepthToSpace: {c} channels not divisible by {block}^2"
        )));
    }
    let out_c = c / (block * block);
    let mut output = Array4::<f32>::zeros((n, h * block, w * block, out_c));

    for ((b, y, x, ch), &v) in input.indexed_iter() {
        let tile = ch / out_c;
        let (i, j) = (tile / block, tile % block);
        output[[b, y * block + i, x * block + j, ch % out_c]] = v;
    }

    Ok(output)
}

/// Elementwise binary op with numpy-style broadcasting of either operand.
pub fn broadcast_binary(
    lhs: ArrayViewD<'_, f32>,
    rhs: ArrayViewD<'_, f32>,
    op: impl Fn(f32, f32) -> f32,
) -> Result<ArrayD<f32>, SuperResError> {
    if let Some(rhs) = rhs.broadcast(lhs.raw_dim()) {
        return Ok(Zip::from(&lhs).and(&rhs).map_collect(|&a, &b| op(a, b)));
    }
    if let Some(lhs) = lhs.broadcast(rhs.raw_dim()) {
        return Ok(Zip::from(&lhs).and(&rhs).map_collect(|&a, &b| op(a, b)));
    }
    Err(SuperResError::Shape(format!(
        "cannot broadcast {:?} with {:?}",
        lhs.shape(),
        rhs.shape()
    )))
}

/// Permute axes. `perm` comes from an integer constant and must name every
/// axis exactly once.
pub fn transpose(input: ArrayViewD<'_, f32>, perm: &[f32]) -> Result<ArrayD<f32>, SuperResError> {
    let axes = index_list(perm)?;
    let mut seen = vec![false; input.ndim()];
    for &axis in &axes {
        match seen.get_mut(axis) {
            Some(slot) if !*slot => *slot = true,
            _ => {
                return Err(SuperResError::Shape(format!(
                    "Transpose: {axes:?} is not a permutation of {} axes",
                    input.ndim()
                )))
            }
        }
    }
    if axes.len() != input.ndim() {
        return Err(SuperResError::Shape(format!(
            "Transpose: {axes:?} is not a permutation of {} axes",
            input.ndim()
        )));
    }

    Ok(input
        .permuted_axes(IxDyn(&axes))
        .as_standard_layout()
        .into_owned())
}

/// Reshape in row-major order. At most one dimension may be `-1`, and is
/// inferred from the element count.
pub fn reshape(input: ArrayViewD<'_, f32>, shape: &[f32]) -> Result<ArrayD<f32>, SuperResError> {
    let total = input.len();
    let mut dims = Vec::with_capacity(shape.len());
    let mut inferred = None;
    for (i, &d) in shape.iter().enumerate() {
        if d == -1.0 {
            if inferred.replace(i).is_some() {
                return Err(SuperResError::Shape("Reshape: more than one -1".into()));
            }
            dims.push(1);
        } else if d >= 0.0 && d.fract() == 0.0 {
            dims.push(d as usize);
        } else {
            return Err(SuperResError::Shape(format!("Reshape: invalid dimension {d}")));
        }
    }

    let known: usize = dims.iter().product();
    if let Some(i) = inferred {
        if known == 0 || total % known != 0 {
            return Err(SuperResError::Shape(format!(
                "Reshape: cannot infer -1 for {total} elements into {shape:?}"
            )));
        }
        dims[i] = total / known;
    } else if known != total {
        return Err(SuperResError::Shape(format!(
            "Reshape: {total} elements do not fit {dims:?}"
        )));
    }

    input
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order(IxDyn(&dims))
        .map_err(|e| SuperResError::Shape(e.to_string()))
}

fn index_list(values: &[f32]) -> Result<Vec<usize>, SuperResError> {
    values
        .iter()
        .map(|&v| {
            if v >= 0.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(SuperResError::Shape(format!("invalid axis {v}")))
            }
        })
        .collect()
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
