//! Whole-pixel access using [`rgb`] crate types via bytemuck.
//!
//! These bypass the view's band selection and move complete pixels through
//! the packed bulk path, in the backing image's alpha mode: premultiplied
//! storage yields premultiplied components. RGB storage reads as opaque.
//!
//! ```rust
//! use drape::{MemoryImage, PixelFormat, RasterView};
//! use rgb::Rgba;
//!
//! let image = MemoryImage::from_bytes(2, 1, PixelFormat::Rgb8, vec![10, 20, 30, 40, 50, 60])?;
//! let view = RasterView::new(&image)?;
//! let mut px = [Rgba::new(0u8, 0, 0, 0); 2];
//! view.read_rgba(0, 0, 2, 1, &mut px)?;
//! assert_eq!(px[1], Rgba::new(40, 50, 60, 255));
//! # Ok::<(), drape::RasterError>(())
//! ```

use alloc::vec;

use rgb::{Bgra, Rgba};

use crate::convert::{argb_to_bgra, bgra_to_argb};
use crate::{RasterError, RasterView, Rect};

fn check_len(needed: usize, actual: usize) -> Result<(), RasterError> {
    if actual < needed {
        Err(RasterError::BufferTooSmall { needed, actual })
    } else {
        Ok(())
    }
}

#[inline]
fn swap_red_blue(bytes: &mut [u8]) {
    for px in bytes.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

impl RasterView<'_> {
    /// Copy a rectangle into `dst` as `Rgba<u8>`, whatever the native layout.
    pub fn read_rgba(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        dst: &mut [Rgba<u8>],
    ) -> Result<(), RasterError> {
        let n = width as usize * height as usize;
        check_len(n, dst.len())?;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut dst[..n]);
        self.read_bgra_bytes(Rect::new(x, y, width, height), bytes)?;
        swap_red_blue(bytes);
        Ok(())
    }

    /// Copy a rectangle into `dst` as `Bgra<u8>`.
    pub fn read_bgra(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        dst: &mut [Bgra<u8>],
    ) -> Result<(), RasterError> {
        let n = width as usize * height as usize;
        check_len(n, dst.len())?;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut dst[..n]);
        self.read_bgra_bytes(Rect::new(x, y, width, height), bytes)
    }

    /// Write `src` over a rectangle. RGB storage drops alpha.
    pub fn write_rgba(
        &self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        src: &[Rgba<u8>],
    ) -> Result<(), RasterError> {
        let n = width as usize * height as usize;
        check_len(n, src.len())?;
        let mut bytes: alloc::vec::Vec<u8> = bytemuck::cast_slice(&src[..n]).to_vec();
        swap_red_blue(&mut bytes);
        let mut words = vec![0u32; n];
        bgra_to_argb(&bytes, &mut words)?;
        self.write_words(Rect::new(x, y, width, height), &words)
    }

    fn read_bgra_bytes(&self, rect: Rect, bytes: &mut [u8]) -> Result<(), RasterError> {
        let mut words = vec![0u32; bytes.len() / 4];
        self.read_words(rect, &mut words)?;
        argb_to_bgra(&words, bytes)
    }
}
