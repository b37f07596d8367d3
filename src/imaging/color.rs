//! BGR ↔ YCrCb conversion on normalized float pixels.
//!
//! Coefficients follow the ITU-R BT.601 variant used by OpenCV for
//! floating point images, where the chroma offset is 0.5.

use image::Rgb32FImage;

use crate::imaging::pixels::{ChannelOrder, PixelBuffer, PixelError};

const DELTA: f32 = 0.5;

/// `[b, g, r]` in `[0, 1]` → `[y, cr, cb]`.
pub fn bgr_to_ycrcb([b, g, r]: [f32; 3]) -> [f32; 3] {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + DELTA;
    let cb = (b - y) * 0.564 + DELTA;
    [y, cr, cb]
}

/// `[y, cr, cb]` → `[b, g, r]`, unclamped.
pub fn ycrcb_to_bgr([y, cr, cb]: [f32; 3]) -> [f32; 3] {
    let r = y + 1.403 * (cr - DELTA);
    let g = y - 0.714 * (cr - DELTA) - 0.344 * (cb - DELTA);
    let b = y + 1.773 * (cb - DELTA);
    [b, g, r]
}

/// Normalize a pixel buffer and convert it to a YCrCb float image.
/// Channel 0 of the result is Y, 1 is Cr, 2 is Cb.
pub fn to_ycrcb(pixels: &PixelBuffer) -> Rgb32FImage {
    let bgr = pixels.clone().to_order(ChannelOrder::Bgr);
    let bytes = bgr.as_bytes();
    let width = bgr.width() as usize;
    Rgb32FImage::from_fn(bgr.width(), bgr.height(), |x, y| {
        let i = (y as usize * width + x as usize) * PixelBuffer::CHANNELS;
        let px = [
            f32::from(bytes[i]) / 255.0,
            f32::from(bytes[i + 1]) / 255.0,
            f32::from(bytes[i + 2]) / 255.0,
        ];
        image::Rgb(bgr_to_ycrcb(px))
    })
}

/// Convert a YCrCb float image back to an 8-bit BGR buffer, saturating.
pub fn from_ycrcb(image: &Rgb32FImage) -> Result<PixelBuffer, PixelError> {
    let data: Vec<u8> = image
        .pixels()
        .flat_map(|px| ycrcb_to_bgr(px.0).map(saturate_u8))
        .collect();
    PixelBuffer::from_raw(image.width(), image.height(), ChannelOrder::Bgr, data)
}

fn saturate_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: [f32; 3], b: [f32; 3]) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 2e-3, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_gray_has_neutral_chroma() {
        let [y, cr, cb] = bgr_to_ycrcb([0.5, 0.5, 0.5]);
        assert!((y - 0.5).abs() < 1e-6);
        assert!((cr - 0.5).abs() < 1e-6);
        assert!((cb - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_primary_colors_round_trip() {
        for bgr in [
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.2, 0.4, 0.9],
        ] {
            assert_close(ycrcb_to_bgr(bgr_to_ycrcb(bgr)), bgr);
        }
    }

    #[test]
    fn test_buffer_round_trip_keeps_red() {
        let red = PixelBuffer::from_raw(2, 1, ChannelOrder::Rgb, vec![255, 0, 0, 255, 0, 0]).unwrap();
        let ycc = to_ycrcb(&red);
        let back = from_ycrcb(&ycc).unwrap();
        assert_eq!(back.order(), ChannelOrder::Bgr);
        assert_eq!(back.as_bytes(), &[0, 0, 255, 0, 0, 255]);
    }
}
