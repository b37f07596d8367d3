//! Image codec and pixel-format glue.
//!
//! # Data Flow
//! ```text
//! uploaded bytes
//!     → pixels.rs (decode any format → RGB PixelBuffer)
//!     → to_order(Bgr) for the super-resolution engine
//!     → color.rs (BGR ↔ YCrCb float planes, used by the engine)
//!     → pixels.rs (encode PNG, always written as RGB)
//! ```

pub mod color;
pub mod pixels;

pub use pixels::{ChannelOrder, PixelBuffer, PixelError};
