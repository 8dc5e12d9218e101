use core::fmt;

use crate::PixelFormat;

/// Error returned by every fallible raster operation.
///
/// None of these are retried internally. They describe configuration or
/// programming errors and are surfaced as soon as they are detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RasterError {
    /// The backing image uses a pixel format the adapter cannot expose.
    UnsupportedFormat(PixelFormat),
    /// A raw format tag outside the known set.
    UnknownFormat(u8),
    /// No conversion exists between the two formats.
    UnsupportedConversion {
        /// Format the pixels are stored in.
        from: PixelFormat,
        /// Format the pixels were requested in.
        to: PixelFormat,
    },
    /// A mutating call on a view whose backing image is read-only.
    ReadOnly,
    /// A coordinate or rectangle lies outside the addressable window.
    OutOfBounds(&'static str),
    /// A bank or band index beyond what the buffer provides.
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of valid indices.
        len: usize,
    },
    /// A caller-provided sample buffer is shorter than the request needs.
    BufferTooSmall {
        /// Number of elements the operation needs.
        needed: usize,
        /// Number of elements provided.
        actual: usize,
    },
    /// The shared sample buffer is already lent out by another view.
    BufferBusy,
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat(format) => write!(f, "unsupported pixel format: {format:?}"),
            Self::UnknownFormat(tag) => write!(f, "unknown pixel format tag: {tag}"),
            Self::UnsupportedConversion { from, to } => {
                write!(f, "unsupported conversion: {from:?} -> {to:?}")
            }
            Self::ReadOnly => f.write_str("raster is read-only"),
            Self::OutOfBounds(what) => write!(f, "{what} is outside raster"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index ({index}) >= number of entries ({len})")
            }
            Self::BufferTooSmall { needed, actual } => {
                write!(f, "buffer holds {actual} samples, {needed} needed")
            }
            Self::BufferBusy => f.write_str("sample buffer is already borrowed"),
        }
    }
}

impl core::error::Error for RasterError {}
