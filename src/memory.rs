//! An owned in-memory image implementing [`PixelReader`] and [`PixelWriter`].
//!
//! Stores pixels in their native layout and converts on every request, the
//! way a foreign image object would. Counts backing calls so that cache
//! behaviour can be observed.
//!
//! ```rust
//! use drape::{MemoryImage, PixelFormat, RasterView};
//!
//! let image = MemoryImage::from_bytes(2, 1, PixelFormat::Rgb8, vec![10, 20, 30, 40, 50, 60])?;
//! let view = RasterView::new(&image)?;
//! assert_eq!(view.sample(1, 0, 2)?, 60);
//! assert_eq!(view.sample(1, 0, 0)?, 40);
//! assert_eq!(image.reads(), 1);
//! # Ok::<(), drape::RasterError>(())
//! ```

use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::convert::{
    argb_to_bgra, bgra_to_argb, bgra_to_rgb, premultiply_bgra, rgb_to_bgra, unpremultiply_bgra,
};
use crate::{PixelFormat, PixelReader, PixelWriter, Pixels, PixelsMut, RasterError, Region};

enum Storage {
    Argb(Vec<u32>),
    Bytes(Vec<u8>),
}

/// Pixels owned in memory, in one [`PixelFormat`].
pub struct MemoryImage {
    width: usize,
    height: usize,
    format: PixelFormat,
    storage: Storage,
    reads: Cell<usize>,
    writes: Cell<usize>,
}

impl core::fmt::Debug for MemoryImage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl MemoryImage {
    /// Zero-filled image.
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Self {
        let len = width * height * format.samples_per_pixel();
        let storage = if format.is_packed() {
            Storage::Argb(vec![0; len])
        } else {
            Storage::Bytes(vec![0; len])
        };
        Self {
            width,
            height,
            format,
            storage,
            reads: Cell::new(0),
            writes: Cell::new(0),
        }
    }

    /// Wrap native-layout bytes. Packed formats take native-endian words.
    pub fn from_bytes(
        width: usize,
        height: usize,
        format: PixelFormat,
        mut bytes: Vec<u8>,
    ) -> Result<Self, RasterError> {
        let spp = format.samples_per_pixel();
        let elem = if format.is_packed() { 4 } else { 1 };
        let needed = width * height * spp * elem;
        if bytes.len() < needed {
            return Err(RasterError::BufferTooSmall {
                needed,
                actual: bytes.len(),
            });
        }
        bytes.truncate(needed);
        let storage = if format.is_packed() {
            Storage::Argb(bytemuck::allocation::pod_collect_to_vec(&bytes))
        } else {
            Storage::Bytes(bytes)
        };
        Ok(Self {
            width,
            height,
            format,
            storage,
            reads: Cell::new(0),
            writes: Cell::new(0),
        })
    }

    /// Image of `format` filled from packed `0xAARRGGBB` words, premultiplied
    /// when `format` is.
    pub fn from_argb(
        width: usize,
        height: usize,
        format: PixelFormat,
        words: &[u32],
    ) -> Result<Self, RasterError> {
        let mut image = Self::new(width, height, format);
        image.convert_in(
            Region::new(0, 0, width, height),
            format.bulk_request_format(),
            Pixels::Argb(words),
        )?;
        Ok(image)
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Native storage as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Argb(words) => bytemuck::cast_slice(words),
            Storage::Bytes(bytes) => bytes,
        }
    }

    /// Every pixel as a packed word, premultiplied when the storage is.
    pub fn argb_pixels(&self) -> Vec<u32> {
        let mut out = vec![0u32; self.width * self.height];
        let format = self.format.bulk_request_format();
        match self.convert_out(Region::new(0, 0, self.width, self.height), format, PixelsMut::Argb(&mut out)) {
            Ok(()) => out,
            // Indexed storage has no packed form.
            Err(_) => Vec::new(),
        }
    }

    /// Number of `read_pixels` calls served.
    #[inline]
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Number of `write_pixels` calls served.
    #[inline]
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn reset_counters(&self) {
        self.reads.set(0);
        self.writes.set(0);
    }

    // -----------------------------------------------------------------------
    // Conversion
    // -----------------------------------------------------------------------

    fn check(&self, region: Region, request: PixelFormat, len: usize, packed: bool) -> Result<(), RasterError> {
        if !region.fits(self.width, self.height) {
            return Err(RasterError::OutOfBounds("region"));
        }
        let convertible = request == self.format
            || (request != PixelFormat::Indexed8 && self.format != PixelFormat::Indexed8);
        if !convertible || packed != request.is_packed() {
            return Err(RasterError::UnsupportedConversion {
                from: self.format,
                to: request,
            });
        }
        let needed = region.pixels() * request.samples_per_pixel();
        if len < needed {
            return Err(RasterError::BufferTooSmall { needed, actual: len });
        }
        Ok(())
    }

    /// Storage range of `width` pixels starting at `(x, y)`, in elements.
    #[inline]
    fn span(&self, x: usize, y: usize, width: usize) -> core::ops::Range<usize> {
        let spp = self.format.samples_per_pixel();
        let start = (y * self.width + x) * spp;
        start..start + width * spp
    }

    /// Native row segment as BGRA bytes, in the storage's alpha mode.
    fn native_to_bgra(&self, range: core::ops::Range<usize>, bgra: &mut [u8]) -> Result<(), RasterError> {
        match (&self.storage, self.format) {
            (Storage::Argb(words), _) => argb_to_bgra(&words[range], bgra),
            (Storage::Bytes(bytes), PixelFormat::Rgb8) => rgb_to_bgra(&bytes[range], bgra),
            (Storage::Bytes(bytes), _) => {
                bgra.copy_from_slice(&bytes[range]);
                Ok(())
            }
        }
    }

    fn bgra_to_native(&mut self, range: core::ops::Range<usize>, bgra: &[u8]) -> Result<(), RasterError> {
        match (&mut self.storage, self.format) {
            (Storage::Argb(words), _) => bgra_to_argb(bgra, &mut words[range]),
            (Storage::Bytes(bytes), PixelFormat::Rgb8) => bgra_to_rgb(bgra, &mut bytes[range]),
            (Storage::Bytes(bytes), _) => {
                bytes[range].copy_from_slice(bgra);
                Ok(())
            }
        }
    }

    fn convert_out(&self, region: Region, request: PixelFormat, mut dst: PixelsMut<'_>) -> Result<(), RasterError> {
        let packed = matches!(dst, PixelsMut::Argb(_));
        self.check(region, request, dst.len(), packed)?;
        let width = region.width;
        let req_spp = request.samples_per_pixel();
        let mut bgra = vec![0u8; width * 4];
        for row in 0..region.height {
            let range = self.span(region.x, region.y + row, width);
            let out = row * width * req_spp..(row + 1) * width * req_spp;
            if request == self.format {
                match (&self.storage, &mut dst) {
                    (Storage::Argb(words), PixelsMut::Argb(d)) => d[out].copy_from_slice(&words[range]),
                    (Storage::Bytes(bytes), PixelsMut::Bytes(d)) => d[out].copy_from_slice(&bytes[range]),
                    _ => {
                        return Err(RasterError::UnsupportedConversion {
                            from: self.format,
                            to: request,
                        });
                    }
                }
                continue;
            }
            self.native_to_bgra(range, &mut bgra)?;
            match (self.format.is_premultiplied(), request.is_premultiplied()) {
                (true, false) => unpremultiply_bgra(&mut bgra)?,
                (false, true) => premultiply_bgra(&mut bgra)?,
                _ => {}
            }
            match &mut dst {
                PixelsMut::Argb(d) => bgra_to_argb(&bgra, &mut d[out])?,
                PixelsMut::Bytes(d) if request == PixelFormat::Rgb8 => bgra_to_rgb(&bgra, &mut d[out])?,
                PixelsMut::Bytes(d) => d[out].copy_from_slice(&bgra),
            }
        }
        Ok(())
    }

    fn convert_in(&mut self, region: Region, request: PixelFormat, src: Pixels<'_>) -> Result<(), RasterError> {
        let packed = matches!(src, Pixels::Argb(_));
        self.check(region, request, src.len(), packed)?;
        let width = region.width;
        let req_spp = request.samples_per_pixel();
        let mut bgra = vec![0u8; width * 4];
        for row in 0..region.height {
            let range = self.span(region.x, region.y + row, width);
            let input = row * width * req_spp..(row + 1) * width * req_spp;
            if request == self.format {
                match (&mut self.storage, src) {
                    (Storage::Argb(words), Pixels::Argb(s)) => words[range].copy_from_slice(&s[input]),
                    (Storage::Bytes(bytes), Pixels::Bytes(s)) => bytes[range].copy_from_slice(&s[input]),
                    _ => {
                        return Err(RasterError::UnsupportedConversion {
                            from: request,
                            to: self.format,
                        });
                    }
                }
                continue;
            }
            match src {
                Pixels::Argb(s) => argb_to_bgra(&s[input], &mut bgra)?,
                Pixels::Bytes(s) if request == PixelFormat::Rgb8 => rgb_to_bgra(&s[input], &mut bgra)?,
                Pixels::Bytes(s) => bgra.copy_from_slice(&s[input]),
            }
            match (request.is_premultiplied(), self.format.is_premultiplied()) {
                (true, false) => unpremultiply_bgra(&mut bgra)?,
                (false, true) => premultiply_bgra(&mut bgra)?,
                _ => {}
            }
            self.bgra_to_native(range, &bgra)?;
        }
        Ok(())
    }
}

impl PixelReader for MemoryImage {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn read_pixels(
        &self,
        region: Region,
        format: PixelFormat,
        dst: PixelsMut<'_>,
    ) -> Result<(), RasterError> {
        self.convert_out(region, format, dst)?;
        self.reads.set(self.reads.get() + 1);
        Ok(())
    }
}

impl PixelWriter for MemoryImage {
    fn write_pixels(
        &mut self,
        region: Region,
        format: PixelFormat,
        src: Pixels<'_>,
    ) -> Result<(), RasterError> {
        self.convert_in(region, format, src)?;
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
