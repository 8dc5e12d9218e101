//! # drape
//!
//! *Hang a raster over someone else's pixels.*
//!
//! Many image objects only let you read or write a rectangle of pixels in one
//! of a few packed formats. Encoders and decoders want addressable samples:
//! this pixel, that band. `drape` adapts the first into the second without
//! copying the image. Samples are served from a one-row cache fetched on
//! demand, and bulk rectangle transfers go straight to the backing image with
//! in-place unpacking.
//!
//! ```rust
//! use drape::{MemoryImage, PixelFormat, RasterView};
//!
//! let mut image = MemoryImage::from_bytes(2, 1, PixelFormat::Rgb8, vec![10, 20, 30, 40, 50, 60])?;
//! let view = RasterView::writable(&mut image)?;
//! view.set_sample(1, 0, 0, 99)?;
//! assert_eq!(view.sample(1, 0, 0)?, 99);
//! # Ok::<(), drape::RasterError>(())
//! ```
//!
//! ## Modules
//!
//! - [`format`]: the closed set of backing formats and the layout decided for each.
//! - [`source`]: the read/write capability a backing image provides.
//! - [`buffer`]: the row-cached sample buffer shared by all views of one image.
//! - [`view`]: crops, relocations and band subsets over that buffer.
//! - [`convert`]: row kernels with SIMD dispatch.
//! - [`memory`]: an in-memory backing image.
//!
//! ## Feature flags
//!
//! - **`rgb`**: whole-pixel reads and writes as [`rgb`] crate pixel types
//!   (`Rgba<u8>`, `Bgra<u8>`) via bytemuck.
//! - **`imgref`**: whole-view copies as [`imgref`] images. Implies `rgb`.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod buffer;
pub mod convert;
mod error;
pub mod format;
pub mod memory;
pub mod source;
pub mod view;

pub use buffer::{SampleBuffer, WriteMode};
pub use error::RasterError;
pub use format::{
    AlphaMode, ColorModel, ColorSpace, Extract, FormatDecision, LayoutHint, PixelFormat, SRGB,
    Transparency, conversion_table,
};
pub use memory::MemoryImage;
pub use source::{PixelImage, PixelReader, PixelWriter, Pixels, PixelsMut, Region};
pub use view::{RasterView, Rect};

#[cfg(feature = "rgb")]
mod typed;

#[cfg(feature = "imgref")]
pub mod img;
