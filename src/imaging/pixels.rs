//! Interleaved 8-bit, 3-channel pixel buffers.

use std::fmt;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage};

/// Order of the three interleaved channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelOrder::Rgb => write!(f, "RGB"),
            ChannelOrder::Bgr => write!(f, "BGR"),
        }
    }
}

/// Errors produced while moving pixels in and out of codecs.
#[derive(Debug, thiserror::Error)]
pub enum PixelError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),
    #[error("buffer of {actual} bytes does not match {width}x{height}x3")]
    Size {
        width: u32,
        height: u32,
        actual: usize,
    },
}

/// A 3-channel image held in memory with an explicit channel order.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    pub const CHANNELS: usize = 3;

    /// Wrap raw interleaved bytes, checking the length against the dimensions.
    pub fn from_raw(
        width: u32,
        height: u32,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self, PixelError> {
        if data.len() != width as usize * height as usize * Self::CHANNELS {
            return Err(PixelError::Size {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            order,
            data,
        })
    }

    /// Decode any format the codec recognises. Alpha is dropped and
    /// grayscale expanded, yielding an RGB buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self, PixelError> {
        let image = image::load_from_memory(bytes).map_err(PixelError::Decode)?;
        Ok(Self::from_rgb_image(image.to_rgb8()))
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            order: ChannelOrder::Rgb,
            data: image.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Reorder channels. A no-op when already in `order`.
    pub fn to_order(mut self, order: ChannelOrder) -> Self {
        if self.order != order {
            for px in self.data.chunks_exact_mut(Self::CHANNELS) {
                px.swap(0, 2);
            }
            self.order = order;
        }
        self
    }

    /// Convert into an RGB image regardless of the current order.
    pub fn into_rgb_image(self) -> Result<RgbImage, PixelError> {
        let rgb = self.to_order(ChannelOrder::Rgb);
        let (width, height, actual) = (rgb.width, rgb.height, rgb.data.len());
        RgbImage::from_raw(width, height, rgb.data).ok_or(PixelError::Size {
            width,
            height,
            actual,
        })
    }

    /// Encode as PNG bytes. The buffer is written in RGB order.
    pub fn encode_png(&self) -> Result<Vec<u8>, PixelError> {
        let image = DynamicImage::ImageRgb8(self.clone().into_rgb_image()?);
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(PixelError::Encode)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample_png() -> Vec<u8> {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(2, 1, Rgb([0, 0, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_decode_produces_rgb() {
        let px = PixelBuffer::decode(&sample_png()).unwrap();
        assert_eq!((px.width(), px.height()), (3, 2));
        assert_eq!(px.order(), ChannelOrder::Rgb);
        assert_eq!(&px.as_bytes()[0..3], &[255, 0, 0]);
    }

    #[test]
    fn test_channel_swap() {
        let px = PixelBuffer::decode(&sample_png()).unwrap().to_order(ChannelOrder::Bgr);
        assert_eq!(px.order(), ChannelOrder::Bgr);
        assert_eq!(&px.as_bytes()[0..3], &[0, 0, 255]);

        let back = px.to_order(ChannelOrder::Rgb);
        assert_eq!(&back.as_bytes()[0..3], &[255, 0, 0]);
    }

    #[test]
    fn test_bgr_buffer_encodes_true_colors() {
        let bgr = PixelBuffer::decode(&sample_png()).unwrap().to_order(ChannelOrder::Bgr);
        let png = bgr.encode_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(decoded.get_pixel(2, 1), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_decode_drops_alpha() {
        let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 40]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();

        let px = PixelBuffer::decode(&buf).unwrap();
        assert_eq!(px.as_bytes().len(), 2 * 2 * 3);
        assert_eq!(&px.as_bytes()[0..3], &[10, 20, 30]);
    }

    #[test]
    fn test_rejects_garbage_and_bad_sizes() {
        assert!(matches!(
            PixelBuffer::decode(b"definitely not an image"),
            Err(PixelError::Decode(_))
        ));
        assert!(matches!(
            PixelBuffer::from_raw(2, 2, ChannelOrder::Bgr, vec![0; 11]),
            Err(PixelError::Size { actual: 11, .. })
        ));
    }
}
