//! The capability a backing image provides: bulk reads and, for writable
//! images, bulk writes of a pixel rectangle in a caller-chosen format.

use crate::{PixelFormat, RasterError};

/// Rectangle in the backing image's own pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    #[inline]
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub const fn pixel(x: usize, y: usize) -> Self {
        Self::new(x, y, 1, 1)
    }

    #[inline]
    pub const fn pixels(&self) -> usize {
        self.width * self.height
    }

    /// Whether the region lies within a `width × height` image.
    pub fn fits(&self, width: usize, height: usize) -> bool {
        matches!(self.x.checked_add(self.width), Some(end) if end <= width)
            && matches!(self.y.checked_add(self.height), Some(end) if end <= height)
    }
}

/// Destination of a read: packed words for packed formats, bytes otherwise.
#[derive(Debug)]
pub enum PixelsMut<'a> {
    Argb(&'a mut [u32]),
    Bytes(&'a mut [u8]),
}

/// Source of a write: packed words for packed formats, bytes otherwise.
#[derive(Clone, Copy, Debug)]
pub enum Pixels<'a> {
    Argb(&'a [u32]),
    Bytes(&'a [u8]),
}

impl PixelsMut<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Argb(words) => words.len(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Pixels<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Argb(words) => words.len(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read access to a foreign image.
///
/// `read_pixels` fills `dst` with `region.pixels()` pixels in `format`,
/// row-major and tightly packed: `format.samples_per_pixel()` elements per
/// pixel. The image converts from its native layout as needed. Alpha bytes
/// produced for storage without alpha may hold anything; the adapter reports
/// such alpha as opaque.
pub trait PixelReader {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn pixel_format(&self) -> PixelFormat;
    fn read_pixels(
        &self,
        region: Region,
        format: PixelFormat,
        dst: PixelsMut<'_>,
    ) -> Result<(), RasterError>;
}

/// Write access to a foreign image. Absent for read-only images.
pub trait PixelWriter {
    fn write_pixels(
        &mut self,
        region: Region,
        format: PixelFormat,
        src: Pixels<'_>,
    ) -> Result<(), RasterError>;
}

/// An image that can be both read and written.
pub trait PixelImage: PixelReader + PixelWriter {}

impl<T: PixelReader + PixelWriter + ?Sized> PixelImage for T {}

/// Borrowed backing image, with or without write capability.
pub(crate) enum Backing<'a> {
    ReadOnly(&'a dyn PixelReader),
    Writable(&'a mut dyn PixelImage),
}

impl Backing<'_> {
    pub(crate) fn width(&self) -> usize {
        match self {
            Self::ReadOnly(image) => image.width(),
            Self::Writable(image) => image.width(),
        }
    }

    pub(crate) fn height(&self) -> usize {
        match self {
            Self::ReadOnly(image) => image.height(),
            Self::Writable(image) => image.height(),
        }
    }

    pub(crate) fn pixel_format(&self) -> PixelFormat {
        match self {
            Self::ReadOnly(image) => image.pixel_format(),
            Self::Writable(image) => image.pixel_format(),
        }
    }

    #[inline]
    pub(crate) fn is_writable(&self) -> bool {
        matches!(self, Self::Writable(_))
    }

    pub(crate) fn read(
        &self,
        region: Region,
        format: PixelFormat,
        dst: PixelsMut<'_>,
    ) -> Result<(), RasterError> {
        log::trace!("read {region:?} as {format:?}");
        match self {
            Self::ReadOnly(image) => image.read_pixels(region, format, dst),
            Self::Writable(image) => image.read_pixels(region, format, dst),
        }
    }

    pub(crate) fn write(
        &mut self,
        region: Region,
        format: PixelFormat,
        src: Pixels<'_>,
    ) -> Result<(), RasterError> {
        match self {
            Self::ReadOnly(_) => Err(RasterError::ReadOnly),
            Self::Writable(image) => {
                log::trace!("write {region:?} as {format:?}");
                image.write_pixels(region, format, src)
            }
        }
    }
}
