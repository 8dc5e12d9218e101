//! Raster views over a shared [`SampleBuffer`].
//!
//! A [`RasterView`] is a window (bounds plus a translation from its logical
//! coordinates to the backing image's pixels) and a band list. Every view
//! derived from the same backing image shares one row cache through an
//! `Rc<RefCell<_>>`: crops and band subsets never copy pixels.
//!
//! Band `b` of a view is native element `bands()[b]` of the backing format, so
//! the physical layout used for cache addressing never changes when a child
//! reorders or drops bands.

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{RefCell, RefMut};

use crate::buffer::{SampleBuffer, WriteMode};
use crate::convert::{pack_argb, unpack_argb};
use crate::source::Backing;
use crate::{
    ColorModel, Extract, FormatDecision, LayoutHint, PixelFormat, PixelImage, PixelReader,
    Pixels, PixelsMut, RasterError, Region,
};

/// Rectangle in a view's logical coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the last column.
    #[inline]
    pub const fn max_x(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// One past the last row.
    #[inline]
    pub const fn max_y(&self) -> i64 {
        self.y as i64 + self.height as i64
    }
}

/// Addressable samples of a backing image, possibly cropped, relocated or
/// restricted to some bands.
///
/// Cloning a view is cheap and yields another handle on the same cache.
#[derive(Clone)]
pub struct RasterView<'a> {
    buffer: Rc<RefCell<SampleBuffer<'a>>>,
    bounds: Rect,
    /// Logical minus physical coordinates.
    translate: (i64, i64),
    bands: Vec<usize>,
}

impl core::fmt::Debug for RasterView<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RasterView")
            .field("format", &self.format())
            .field("bounds", &self.bounds)
            .field("translate", &self.translate)
            .field("bands", &self.bands)
            .finish()
    }
}

// ===========================================================================
// Construction
// ===========================================================================

impl<'a> RasterView<'a> {
    /// Read-only view of `image` with the format's default bands.
    pub fn new<R: PixelReader>(image: &'a R) -> Result<Self, RasterError> {
        Self::build(Backing::ReadOnly(image), None, WriteMode::Immediate)
    }

    /// Read-only view exposing the bands `hint` asks for.
    ///
    /// Packed formats have a single element per pixel and only accept
    /// [`LayoutHint::Packed`]; `Rgb` and `Rgba` fail with
    /// [`RasterError::IndexOutOfRange`].
    pub fn with_hint<R: PixelReader>(image: &'a R, hint: LayoutHint) -> Result<Self, RasterError> {
        Self::build(Backing::ReadOnly(image), Some(hint), WriteMode::Immediate)
    }

    /// Writable view of `image` with the format's default bands.
    pub fn writable<W: PixelImage>(image: &'a mut W) -> Result<Self, RasterError> {
        Self::build(Backing::Writable(image), None, WriteMode::Immediate)
    }

    /// Writable counterpart of [`with_hint`](Self::with_hint), with the same
    /// restriction on packed formats.
    pub fn writable_with_hint<W: PixelImage>(
        image: &'a mut W,
        hint: LayoutHint,
    ) -> Result<Self, RasterError> {
        Self::build(Backing::Writable(image), Some(hint), WriteMode::Immediate)
    }

    pub fn writable_with_mode<W: PixelImage>(
        image: &'a mut W,
        mode: WriteMode,
    ) -> Result<Self, RasterError> {
        Self::build(Backing::Writable(image), None, mode)
    }

    fn build(
        backing: Backing<'a>,
        hint: Option<LayoutHint>,
        mode: WriteMode,
    ) -> Result<Self, RasterError> {
        let buffer = SampleBuffer::new(backing, mode)?;
        let bands = match hint {
            Some(hint) => buffer.decision().hint_bands(hint)?,
            None => buffer.decision().default_bands(),
        };
        let width = u32::try_from(buffer.width()).map_err(|_| RasterError::OutOfBounds("width"))?;
        let height =
            u32::try_from(buffer.height()).map_err(|_| RasterError::OutOfBounds("height"))?;
        let bounds = Rect::new(0, 0, width, height);
        // Logical coordinates must stay representable as i32.
        if bounds.max_x() > i32::MAX as i64 {
            return Err(RasterError::OutOfBounds("width"));
        }
        if bounds.max_y() > i32::MAX as i64 {
            return Err(RasterError::OutOfBounds("height"));
        }
        log::debug!("raster view {width}x{height}, bands {bands:?}");
        Ok(Self {
            buffer: Rc::new(RefCell::new(buffer)),
            bounds,
            translate: (0, 0),
            bands,
        })
    }
}

// ===========================================================================
// Metadata
// ===========================================================================

impl<'a> RasterView<'a> {
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    pub fn min_x(&self) -> i32 {
        self.bounds.x
    }

    #[inline]
    pub fn min_y(&self) -> i32 {
        self.bounds.y
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.bounds.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.bounds.height
    }

    #[inline]
    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// Native element behind each band.
    #[inline]
    pub fn bands(&self) -> &[usize] {
        &self.bands
    }

    pub fn decision(&self) -> FormatDecision {
        *self.buffer.borrow().decision()
    }

    pub fn format(&self) -> PixelFormat {
        self.decision().format()
    }

    pub fn color_model(&self) -> ColorModel {
        self.decision().color_model()
    }

    pub fn is_writable(&self) -> bool {
        self.buffer.borrow().is_writable()
    }

    pub fn write_mode(&self) -> WriteMode {
        self.buffer.borrow().write_mode()
    }

    /// Applies to every view sharing this view's cache.
    pub fn set_write_mode(&self, mode: WriteMode) -> Result<(), RasterError> {
        self.buffer.borrow_mut().set_write_mode(mode)
    }

    /// Push batched writes to the backing image.
    pub fn flush(&self) -> Result<(), RasterError> {
        self.buffer.borrow_mut().flush()
    }

    /// The sample buffer shared by every view of this backing image, for
    /// flat-index access through [`SampleBuffer::get_elem`].
    ///
    /// Fails with [`RasterError::BufferBusy`] while another guard from a view
    /// of the same image is alive. Other view calls made while a guard is held
    /// panic, so keep it in a short scope.
    pub fn data_buffer(&self) -> Result<RefMut<'_, SampleBuffer<'a>>, RasterError> {
        self.buffer.try_borrow_mut().map_err(|_| RasterError::BufferBusy)
    }

    /// Drop the cached row, for after the backing image was changed behind
    /// this view's back.
    pub fn invalidate(&self) -> Result<(), RasterError> {
        self.buffer.borrow_mut().invalidate()
    }
}

// ===========================================================================
// Geometry
// ===========================================================================

impl<'a> RasterView<'a> {
    /// Physical region behind a logical rectangle, which must lie within bounds.
    fn region(&self, x: i32, y: i32, width: u32, height: u32) -> Result<Region, RasterError> {
        if x < self.bounds.x {
            return Err(RasterError::OutOfBounds("x"));
        }
        if y < self.bounds.y {
            return Err(RasterError::OutOfBounds("y"));
        }
        if x as i64 + width as i64 > self.bounds.max_x() {
            return Err(RasterError::OutOfBounds("x + width"));
        }
        if y as i64 + height as i64 > self.bounds.max_y() {
            return Err(RasterError::OutOfBounds("y + height"));
        }
        let px = usize::try_from(x as i64 - self.translate.0)
            .map_err(|_| RasterError::OutOfBounds("x"))?;
        let py = usize::try_from(y as i64 - self.translate.1)
            .map_err(|_| RasterError::OutOfBounds("y"))?;
        Ok(Region::new(px, py, width as usize, height as usize))
    }

    /// Crop the area starting at `(parent_x, parent_y)` to `width × height`,
    /// relocate it so it starts at `(child_x, child_y)`, and optionally pick
    /// bands: `bands[i]` is the index of one of this view's bands.
    ///
    /// Reading `(child_x + dx, child_y + dy)` in the child reads the same
    /// sample as `(parent_x + dx, parent_y + dy)` in this view.
    #[allow(clippy::too_many_arguments)]
    pub fn create_child(
        &self,
        parent_x: i32,
        parent_y: i32,
        width: u32,
        height: u32,
        child_x: i32,
        child_y: i32,
        bands: Option<&[usize]>,
    ) -> Result<Self, RasterError> {
        if parent_x < self.bounds.x {
            return Err(RasterError::OutOfBounds("parent_x"));
        }
        if parent_y < self.bounds.y {
            return Err(RasterError::OutOfBounds("parent_y"));
        }
        let end_x = i32::try_from(width)
            .ok()
            .and_then(|w| parent_x.checked_add(w))
            .ok_or(RasterError::OutOfBounds("parent_x + width"))?;
        if end_x as i64 > self.bounds.max_x() {
            return Err(RasterError::OutOfBounds("parent_x + width"));
        }
        let end_y = i32::try_from(height)
            .ok()
            .and_then(|h| parent_y.checked_add(h))
            .ok_or(RasterError::OutOfBounds("parent_y + height"))?;
        if end_y as i64 > self.bounds.max_y() {
            return Err(RasterError::OutOfBounds("parent_y + height"));
        }
        if child_x.checked_add(width as i32).is_none() {
            return Err(RasterError::OutOfBounds("child_x + width"));
        }
        if child_y.checked_add(height as i32).is_none() {
            return Err(RasterError::OutOfBounds("child_y + height"));
        }

        let bands = match bands {
            Some([]) => return Err(RasterError::IndexOutOfRange { index: 0, len: 0 }),
            Some(picks) => picks
                .iter()
                .map(|&b| {
                    self.bands.get(b).copied().ok_or(RasterError::IndexOutOfRange {
                        index: b,
                        len: self.bands.len(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => self.bands.clone(),
        };

        let translate = (
            self.translate.0 + (child_x as i64 - parent_x as i64),
            self.translate.1 + (child_y as i64 - parent_y as i64),
        );
        let bounds = Rect::new(child_x, child_y, width, height);
        log::debug!("child view {bounds:?} from ({parent_x}, {parent_y}), bands {bands:?}");
        Ok(Self {
            buffer: Rc::clone(&self.buffer),
            bounds,
            translate,
            bands,
        })
    }

    /// Crop to `window`, keeping its coordinates.
    pub fn sub_view(&self, window: Rect, bands: Option<&[usize]>) -> Result<Self, RasterError> {
        self.create_child(
            window.x,
            window.y,
            window.width,
            window.height,
            window.x,
            window.y,
            bands,
        )
    }

    /// Same samples, with the top-left corner moved to `(x, y)`.
    pub fn translated(&self, x: i32, y: i32) -> Result<Self, RasterError> {
        let b = self.bounds;
        self.create_child(b.x, b.y, b.width, b.height, x, y, None)
    }
}

// ===========================================================================
// Per-sample access
// ===========================================================================

impl<'a> RasterView<'a> {
    fn native_band(&self, band: usize) -> Result<usize, RasterError> {
        self.bands.get(band).copied().ok_or(RasterError::IndexOutOfRange {
            index: band,
            len: self.bands.len(),
        })
    }

    fn check_writable(&self) -> Result<(), RasterError> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(RasterError::ReadOnly)
        }
    }

    pub fn sample(&self, x: i32, y: i32, band: usize) -> Result<u32, RasterError> {
        let element = self.native_band(band)?;
        let at = self.region(x, y, 1, 1)?;
        self.buffer.borrow_mut().get(at.x, at.y, element)
    }

    pub fn set_sample(&self, x: i32, y: i32, band: usize, value: u32) -> Result<(), RasterError> {
        self.check_writable()?;
        let element = self.native_band(band)?;
        let at = self.region(x, y, 1, 1)?;
        self.buffer.borrow_mut().set(at.x, at.y, element, value)
    }

    /// Every band of one pixel into `dst[..num_bands()]`.
    pub fn get_pixel(&self, x: i32, y: i32, dst: &mut [u32]) -> Result<(), RasterError> {
        self.read_samples(x, y, 1, 1, dst)
    }

    pub fn set_pixel(&self, x: i32, y: i32, src: &[u32]) -> Result<(), RasterError> {
        self.write_samples(x, y, 1, 1, src)
    }

    /// Rectangle through the row cache, one sample at a time.
    pub fn read_samples(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        dst: &mut [u32],
    ) -> Result<(), RasterError> {
        let region = self.region(x, y, width, height)?;
        let needed = region.pixels() * self.bands.len();
        check_len(needed, dst.len())?;
        let mut buffer = self.buffer.borrow_mut();
        let mut out = dst.iter_mut();
        for py in region.y..region.y + region.height {
            for px in region.x..region.x + region.width {
                for (&element, slot) in self.bands.iter().zip(out.by_ref()) {
                    *slot = buffer.get(px, py, element)?;
                }
            }
        }
        Ok(())
    }

    /// Rectangle through the row cache, one sample at a time. Handles any
    /// band subset, including ones a packed bulk write could not express.
    pub fn write_samples(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        src: &[u32],
    ) -> Result<(), RasterError> {
        self.check_writable()?;
        let region = self.region(x, y, width, height)?;
        let needed = region.pixels() * self.bands.len();
        check_len(needed, src.len())?;
        let mut buffer = self.buffer.borrow_mut();
        let mut input = src.iter();
        for py in region.y..region.y + region.height {
            for px in region.x..region.x + region.width {
                for (&element, &value) in self.bands.iter().zip(input.by_ref()) {
                    buffer.set(px, py, element, value)?;
                }
            }
        }
        Ok(())
    }
}

// ===========================================================================
// Bulk transfers
// ===========================================================================

impl<'a> RasterView<'a> {
    fn extracts(&self, decision: &FormatDecision) -> Vec<Extract> {
        self.bands.iter().map(|&e| decision.extract(e)).collect()
    }

    /// Read a rectangle into `dst`, `num_bands()` samples per pixel in band
    /// order, with one request to the backing image.
    ///
    /// For RGB storage a band mapped onto the synthesized alpha element reads
    /// as 0 here, while [`sample`](Self::sample) reports it as opaque.
    pub fn get_pixels(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        dst: &mut [u32],
    ) -> Result<(), RasterError> {
        let region = self.region(x, y, width, height)?;
        let pixels = region.pixels();
        let needed = pixels * self.bands.len();
        check_len(needed, dst.len())?;
        if pixels == 0 {
            return Ok(());
        }
        let decision = self.decision();
        self.buffer.borrow_mut().read_region(
            region,
            decision.bulk_request_format(),
            PixelsMut::Argb(&mut dst[..pixels]),
        )?;
        let extracts = self.extracts(&decision);
        if extracts != [Extract::Whole] {
            unpack_argb(&mut dst[..needed], pixels, &extracts)?;
        }
        Ok(())
    }

    /// Write a rectangle of `num_bands()` samples per pixel.
    ///
    /// Views covering every colour component are packed and written with one
    /// request; alpha is written opaque unless the view has an alpha band.
    /// Other band subsets go through [`write_samples`](Self::write_samples).
    /// Nothing is written if the geometry or `src` is rejected.
    pub fn set_pixels(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        src: &[u32],
    ) -> Result<(), RasterError> {
        self.check_writable()?;
        let region = self.region(x, y, width, height)?;
        let pixels = region.pixels();
        let needed = pixels * self.bands.len();
        check_len(needed, src.len())?;
        if pixels == 0 {
            return Ok(());
        }
        let decision = self.decision();
        if !decision.covers_color(&self.bands) {
            return self.write_samples(x, y, width, height, src);
        }
        let mut words = vec![0u32; pixels];
        pack_argb(
            &src[..needed],
            &self.extracts(&decision),
            decision.forces_opaque(&self.bands),
            &mut words,
        )?;
        self.buffer.borrow_mut().write_region(
            region,
            decision.bulk_request_format(),
            Pixels::Argb(&words),
        )
    }

    pub fn get_pixel_row(&self, x: i32, y: i32, width: u32, dst: &mut [u32]) -> Result<(), RasterError> {
        self.get_pixels(x, y, width, 1, dst)
    }

    pub fn set_pixel_row(&self, x: i32, y: i32, width: u32, src: &[u32]) -> Result<(), RasterError> {
        self.set_pixels(x, y, width, 1, src)
    }

    /// Allocating [`get_pixels`](Self::get_pixels).
    pub fn pixels(&self, x: i32, y: i32, width: u32, height: u32) -> Result<Vec<u32>, RasterError> {
        let len = self
            .region(x, y, width, height)?
            .pixels()
            .checked_mul(self.bands.len())
            .ok_or(RasterError::OutOfBounds("x + width"))?;
        let mut out = vec![0u32; len];
        self.get_pixels(x, y, width, height, &mut out)?;
        Ok(out)
    }

    /// Packed words in the bulk request format, bypassing band selection.
    #[cfg(feature = "rgb")]
    pub(crate) fn read_words(&self, region: Rect, dst: &mut [u32]) -> Result<(), RasterError> {
        let physical = self.region(region.x, region.y, region.width, region.height)?;
        check_len(physical.pixels(), dst.len())?;
        let format = self.decision().bulk_request_format();
        self.buffer.borrow_mut().read_region(
            physical,
            format,
            PixelsMut::Argb(&mut dst[..physical.pixels()]),
        )
    }

    /// Whole-pixel counterpart of `read_words`.
    #[cfg(feature = "rgb")]
    pub(crate) fn write_words(&self, region: Rect, src: &[u32]) -> Result<(), RasterError> {
        self.check_writable()?;
        let physical = self.region(region.x, region.y, region.width, region.height)?;
        check_len(physical.pixels(), src.len())?;
        let format = self.decision().bulk_request_format();
        self.buffer.borrow_mut().write_region(
            physical,
            format,
            Pixels::Argb(&src[..physical.pixels()]),
        )
    }
}

#[inline]
fn check_len(needed: usize, actual: usize) -> Result<(), RasterError> {
    if actual < needed {
        Err(RasterError::BufferTooSmall { needed, actual })
    } else {
        Ok(())
    }
}
