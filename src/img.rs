//! Whole-view copies as [`imgref`] images.
//!
//! ```rust
//! use drape::{img, MemoryImage, PixelFormat, RasterView};
//!
//! let image = MemoryImage::from_bytes(2, 1, PixelFormat::Rgb8, vec![10, 20, 30, 40, 50, 60])?;
//! let view = RasterView::new(&image)?;
//! let copy = img::snapshot(&view)?;
//! assert_eq!((copy.width(), copy.height()), (2, 1));
//! assert_eq!(copy.buf()[0].r, 10);
//! # Ok::<(), drape::RasterError>(())
//! ```

use alloc::vec;

use imgref::{ImgRef, ImgVec};
use rgb::Rgba;

use crate::{RasterError, RasterView};

/// Copy every pixel of `view` into a new image, top-left at `(0, 0)`.
pub fn snapshot(view: &RasterView<'_>) -> Result<ImgVec<Rgba<u8>>, RasterError> {
    let (w, h) = (view.width() as usize, view.height() as usize);
    let mut buf = vec![Rgba::new(0, 0, 0, 0); w * h];
    view.read_rgba(view.min_x(), view.min_y(), view.width(), view.height(), &mut buf)?;
    Ok(ImgVec::new(buf, w, h))
}

/// Write `src` into `view` with its top-left corner at `(x, y)`.
///
/// Strided sources are written row by row; contiguous ones in one request.
pub fn paste(view: &RasterView<'_>, x: i32, y: i32, src: ImgRef<'_, Rgba<u8>>) -> Result<(), RasterError> {
    let width = u32::try_from(src.width()).map_err(|_| RasterError::OutOfBounds("width"))?;
    let height = u32::try_from(src.height()).map_err(|_| RasterError::OutOfBounds("height"))?;
    if src.stride() == src.width() {
        let (buf, _, _) = src.to_contiguous_buf();
        return view.write_rgba(x, y, width, height, &buf);
    }
    let mut row_y = y;
    for row in src.rows() {
        view.write_rgba(x, row_y, width, 1, row)?;
        row_y = row_y.checked_add(1).ok_or(RasterError::OutOfBounds("y + height"))?;
    }
    Ok(())
}
