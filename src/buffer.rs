//! Row-cached sample buffer.
//!
//! Owns no pixel storage of its own. Samples are served from a single cached
//! row fetched from the backing image; writes update that row in place and
//! push the one touched pixel back. The access pattern this is built for is
//! the sequential one of image encoders and decoders: many reads of the same
//! row, occasional jumps to another.
//!
//! The cache is not invalidated when the backing image is mutated by anything
//! other than this buffer. Callers that do so must call
//! [`SampleBuffer::invalidate`].

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use crate::source::Backing;
use crate::{FormatDecision, PixelFormat, Pixels, PixelsMut, RasterError, Region};

/// When sample writes reach the backing image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WriteMode {
    /// Every `set` writes its pixel immediately.
    #[default]
    Immediate,
    /// Writes accumulate in the cached row and are flushed as one span when
    /// the cache moves to another row, on [`SampleBuffer::flush`], before
    /// bulk transfers, and on drop.
    RowBatched,
}

enum RowSamples {
    Argb(Vec<u32>),
    Bytes(Vec<u8>),
}

struct RowCache {
    row: Option<usize>,
    samples: RowSamples,
    /// Inclusive pixel span of unflushed writes in the cached row.
    dirty: Option<(usize, usize)>,
}

/// Per-sample access to a backing image through a one-row cache.
pub struct SampleBuffer<'a> {
    backing: Backing<'a>,
    decision: FormatDecision,
    width: usize,
    height: usize,
    cache: RowCache,
    mode: WriteMode,
}

impl<'a> SampleBuffer<'a> {
    pub(crate) fn new(backing: Backing<'a>, mode: WriteMode) -> Result<Self, RasterError> {
        let format = backing.pixel_format();
        let decision = FormatDecision::new(format)?;
        let (width, height) = (backing.width(), backing.height());
        let row_len = width * decision.request_samples_per_pixel();
        let samples = if decision.request_format().is_packed() {
            RowSamples::Argb(vec![0; row_len])
        } else {
            RowSamples::Bytes(vec![0; row_len])
        };
        log::debug!(
            "sample buffer {width}x{height} {format:?}, rows requested as {:?}",
            decision.request_format()
        );
        Ok(Self {
            backing,
            decision,
            width,
            height,
            cache: RowCache {
                row: None,
                samples,
                dirty: None,
            },
            mode,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn decision(&self) -> &FormatDecision {
        &self.decision
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.backing.is_writable()
    }

    #[inline]
    pub fn write_mode(&self) -> WriteMode {
        self.mode
    }

    /// Switch write mode. Pending batched writes are flushed first.
    pub fn set_write_mode(&mut self, mode: WriteMode) -> Result<(), RasterError> {
        self.flush()?;
        self.mode = mode;
        Ok(())
    }

    /// Total number of addressable elements: `width × height × samples per pixel`.
    #[inline]
    pub fn size(&self) -> usize {
        self.width * self.height * self.decision.samples_per_pixel()
    }

    /// Row currently held by the cache.
    #[inline]
    pub fn cached_row(&self) -> Option<usize> {
        self.cache.row
    }

    // -----------------------------------------------------------------------
    // Addressing
    // -----------------------------------------------------------------------

    fn check(&self, x: usize, y: usize, band: usize) -> Result<(), RasterError> {
        if x >= self.width {
            return Err(RasterError::OutOfBounds("x"));
        }
        if y >= self.height {
            return Err(RasterError::OutOfBounds("y"));
        }
        let len = self.decision.elements();
        if band >= len {
            return Err(RasterError::IndexOutOfRange { index: band, len });
        }
        Ok(())
    }

    /// Split a flat element index into `(x, y, band)`.
    fn locate(&self, bank: usize, i: usize) -> Result<(usize, usize, usize), RasterError> {
        if bank > 0 {
            return Err(RasterError::IndexOutOfRange { index: bank, len: 1 });
        }
        if i >= self.size() {
            return Err(RasterError::IndexOutOfRange {
                index: i,
                len: self.size(),
            });
        }
        let spp = self.decision.samples_per_pixel();
        let x = (i / spp) % self.width;
        let y = (i / spp) / self.width;
        Ok((x, y, i % spp))
    }

    #[inline]
    fn offset(&self, x: usize, band: usize) -> usize {
        x * self.decision.request_samples_per_pixel() + self.decision.conversion()[band]
    }

    // -----------------------------------------------------------------------
    // Row cache
    // -----------------------------------------------------------------------

    fn load_row(&mut self, y: usize) -> Result<(), RasterError> {
        if self.cache.row == Some(y) {
            return Ok(());
        }
        self.flush()?;
        // A failed fetch leaves the row contents undefined.
        self.cache.row = None;
        let region = Region::new(0, y, self.width, 1);
        let format = self.decision.request_format();
        let dst = match &mut self.cache.samples {
            RowSamples::Argb(words) => PixelsMut::Argb(words),
            RowSamples::Bytes(bytes) => PixelsMut::Bytes(bytes),
        };
        self.backing.read(region, format, dst)?;
        self.cache.row = Some(y);
        Ok(())
    }

    /// Forget the cached row. Pending batched writes are flushed first.
    pub fn invalidate(&mut self) -> Result<(), RasterError> {
        self.flush()?;
        self.cache.row = None;
        Ok(())
    }

    /// Forget the cached row if it lies in `rows`.
    pub fn invalidate_rows(&mut self, rows: Range<usize>) -> Result<(), RasterError> {
        match self.cache.row {
            Some(row) if rows.contains(&row) => self.invalidate(),
            _ => Ok(()),
        }
    }

    /// Write the dirty span of the cached row back to the backing image.
    pub fn flush(&mut self) -> Result<(), RasterError> {
        let (Some(row), Some((start, end))) = (self.cache.row, self.cache.dirty) else {
            return Ok(());
        };
        let px = self.decision.request_samples_per_pixel();
        let region = Region::new(start, row, end - start + 1, 1);
        let src = match &self.cache.samples {
            RowSamples::Argb(words) => Pixels::Argb(&words[start..=end]),
            RowSamples::Bytes(bytes) => Pixels::Bytes(&bytes[start * px..(end + 1) * px]),
        };
        self.backing.write(region, self.decision.request_format(), src)?;
        self.cache.dirty = None;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sample access
    // -----------------------------------------------------------------------

    /// Read element `band` of pixel `(x, y)`.
    ///
    /// `band` indexes native elements; for RGB storage, element 3 stands for
    /// the alpha byte of the fetched BGRA row and reads as opaque whatever
    /// the backing image put there.
    pub fn get(&mut self, x: usize, y: usize, band: usize) -> Result<u32, RasterError> {
        self.check(x, y, band)?;
        self.load_row(y)?;
        if self.decision.synthetic_alpha() == Some(band) {
            return Ok(0xFF);
        }
        let offset = self.offset(x, band);
        Ok(match &self.cache.samples {
            RowSamples::Argb(words) => words[offset],
            RowSamples::Bytes(bytes) => bytes[offset] as u32,
        })
    }

    /// Write element `band` of pixel `(x, y)`.
    ///
    /// The rest of the pixel is taken from the cached row, fetched first if
    /// needed, so a partial-pixel write never clobbers its neighbours. Byte
    /// formats keep the low 8 bits of `value`.
    pub fn set(&mut self, x: usize, y: usize, band: usize, value: u32) -> Result<(), RasterError> {
        if !self.backing.is_writable() {
            return Err(RasterError::ReadOnly);
        }
        self.check(x, y, band)?;

        let packed = matches!(self.cache.samples, RowSamples::Argb(_));
        // A packed word is the whole pixel: no need to read before writing
        // unless the write is going to be batched in the row.
        if !packed || self.mode == WriteMode::RowBatched {
            self.load_row(y)?;
        }

        let offset = self.offset(x, band);
        let cached = self.cache.row == Some(y);
        let px = self.decision.request_samples_per_pixel();
        let synthetic_alpha = self.decision.synthetic_alpha().is_some();
        match &mut self.cache.samples {
            RowSamples::Argb(words) => {
                if cached {
                    words[offset] = value;
                }
            }
            RowSamples::Bytes(bytes) => {
                bytes[offset] = value as u8;
                if synthetic_alpha {
                    // Widened RGB rows carry an alpha byte the image never
                    // stores; left as-is it could write back transparent.
                    bytes[x * px + 3] = 0xFF;
                }
            }
        }

        match self.mode {
            WriteMode::RowBatched => {
                self.cache.dirty = Some(match self.cache.dirty {
                    Some((start, end)) => (start.min(x), end.max(x)),
                    None => (x, x),
                });
                Ok(())
            }
            WriteMode::Immediate => self.write_pixel(x, y, value),
        }
    }

    fn write_pixel(&mut self, x: usize, y: usize, value: u32) -> Result<(), RasterError> {
        let px = self.decision.request_samples_per_pixel();
        let word = [value];
        let src = match &self.cache.samples {
            RowSamples::Argb(_) => Pixels::Argb(&word),
            // Byte formats always have row y cached by the time they get here.
            RowSamples::Bytes(row) => Pixels::Bytes(&row[x * px..(x + 1) * px]),
        };
        let result = self
            .backing
            .write(Region::pixel(x, y), self.decision.request_format(), src);
        if result.is_err() {
            // The cached row now holds a value the image rejected.
            self.cache.row = None;
        }
        result
    }

    /// Read by flat index, `bank` must be 0.
    pub fn get_elem(&mut self, bank: usize, i: usize) -> Result<u32, RasterError> {
        let (x, y, band) = self.locate(bank, i)?;
        self.get(x, y, band)
    }

    /// Write by flat index, `bank` must be 0.
    pub fn set_elem(&mut self, bank: usize, i: usize, value: u32) -> Result<(), RasterError> {
        if !self.backing.is_writable() {
            return Err(RasterError::ReadOnly);
        }
        let (x, y, band) = self.locate(bank, i)?;
        self.set(x, y, band, value)
    }

    // -----------------------------------------------------------------------
    // Bulk passthrough
    // -----------------------------------------------------------------------

    /// Read a region straight from the backing image, bypassing the cache.
    pub(crate) fn read_region(
        &mut self,
        region: Region,
        format: PixelFormat,
        dst: PixelsMut<'_>,
    ) -> Result<(), RasterError> {
        self.flush()?;
        self.backing.read(region, format, dst)
    }

    /// Write a region straight to the backing image and drop any cached row it covers.
    pub(crate) fn write_region(
        &mut self,
        region: Region,
        format: PixelFormat,
        src: Pixels<'_>,
    ) -> Result<(), RasterError> {
        self.flush()?;
        self.backing.write(region, format, src)?;
        self.invalidate_rows(region.y..region.y + region.height)
    }
}

impl Drop for SampleBuffer<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            log::warn!("dropping unflushed row {:?}: {err}", self.cache.row);
        }
    }
}
