// ---------------------------------------------------------------------------
// Row-level pixel conversions with SIMD dispatch.
//
// Architecture: shared #[inline(always)] row loops, wrapped once per tier.
// The #[arcane] x86-64-v3 wrappers let the loops compile with AVX2 enabled;
// public entry points validate lengths and dispatch via incant!.
// ---------------------------------------------------------------------------

//! Packed/interleaved conversions used by bulk transfers and [`MemoryImage`](crate::MemoryImage).
//!
//! Packed words are `0xAARRGGBB`. Byte rows are B, G, R, A (or R, G, B) per pixel.

use archmage::incant;
use archmage::prelude::*;

use crate::{Extract, RasterError};

#[cfg(test)]
mod tests;

// ===========================================================================
// Validation helpers
// ===========================================================================

#[inline]
fn check_len(needed: usize, actual: usize) -> Result<(), RasterError> {
    if actual < needed {
        Err(RasterError::BufferTooSmall { needed, actual })
    } else {
        Ok(())
    }
}

#[inline]
fn check_copy(src_len: usize, src_bpp: usize, dst_len: usize, dst_bpp: usize) -> Result<usize, RasterError> {
    if src_len % src_bpp != 0 {
        return Err(RasterError::BufferTooSmall {
            needed: src_len.next_multiple_of(src_bpp),
            actual: src_len,
        });
    }
    let pixels = src_len / src_bpp;
    check_len(pixels * dst_bpp, dst_len)?;
    Ok(pixels)
}

// ===========================================================================
// Row loops
// ===========================================================================

#[inline(always)]
fn extract_sample(argb: u32, extract: Extract) -> u32 {
    match extract {
        Extract::Whole => argb,
        Extract::Byte(shift) => (argb >> shift) & 0xFF,
        Extract::Absent => 0,
    }
}

#[inline(always)]
fn unpack_argb_row(buf: &mut [u32], pixels: usize, extracts: &[Extract]) {
    let bands = extracts.len();
    // Back to front: pixel i expands into [i * bands, (i + 1) * bands), which
    // never reaches below index i, so unread packed words survive.
    for i in (0..pixels).rev() {
        let argb = buf[i];
        for (b, &extract) in extracts.iter().enumerate().rev() {
            buf[i * bands + b] = extract_sample(argb, extract);
        }
    }
}

#[inline(always)]
fn pack_argb_row(samples: &[u32], extracts: &[Extract], fill: u32, dst: &mut [u32]) {
    for (px, out) in samples.chunks_exact(extracts.len()).zip(dst.iter_mut()) {
        let mut argb = fill;
        for (&sample, &extract) in px.iter().zip(extracts) {
            match extract {
                Extract::Whole => argb = sample,
                Extract::Byte(shift) => {
                    argb = (argb & !(0xFF << shift)) | ((sample & 0xFF) << shift);
                }
                Extract::Absent => {}
            }
        }
        *out = argb;
    }
}

#[inline(always)]
fn rgb_to_bgra_row(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(4)) {
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
        d[3] = 0xFF;
    }
}

#[inline(always)]
fn bgra_to_rgb_row(src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(3)) {
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
    }
}

#[inline(always)]
fn premultiply_row(buf: &mut [u8]) {
    for px in buf.chunks_exact_mut(4) {
        let a = px[3] as u32;
        for c in &mut px[..3] {
            *c = ((*c as u32 * a + 127) / 255) as u8;
        }
    }
}

#[inline(always)]
fn unpremultiply_row(buf: &mut [u8]) {
    for px in buf.chunks_exact_mut(4) {
        let a = px[3] as u32;
        for c in &mut px[..3] {
            *c = if a == 0 {
                0
            } else {
                ((*c as u32 * 255 + a / 2) / a).min(255) as u8
            };
        }
    }
}

// ===========================================================================
// Scalar wrappers (dispatch targets for incant!)
// ===========================================================================

fn unpack_argb_impl_scalar(_t: ScalarToken, buf: &mut [u32], pixels: usize, extracts: &[Extract]) {
    unpack_argb_row(buf, pixels, extracts);
}
fn pack_argb_impl_scalar(_t: ScalarToken, s: &[u32], e: &[Extract], fill: u32, d: &mut [u32]) {
    pack_argb_row(s, e, fill, d);
}
fn rgb_to_bgra_impl_scalar(_t: ScalarToken, s: &[u8], d: &mut [u8]) {
    rgb_to_bgra_row(s, d);
}
fn bgra_to_rgb_impl_scalar(_t: ScalarToken, s: &[u8], d: &mut [u8]) {
    bgra_to_rgb_row(s, d);
}
fn premultiply_impl_scalar(_t: ScalarToken, b: &mut [u8]) {
    premultiply_row(b);
}
fn unpremultiply_impl_scalar(_t: ScalarToken, b: &mut [u8]) {
    unpremultiply_row(b);
}

// ===========================================================================
// x86-64 AVX2 wrappers
// ===========================================================================

#[cfg(target_arch = "x86_64")]
#[arcane]
fn unpack_argb_impl_v3(_t: X64V3Token, buf: &mut [u32], pixels: usize, extracts: &[Extract]) {
    unpack_argb_row(buf, pixels, extracts);
}
#[cfg(target_arch = "x86_64")]
#[arcane]
fn pack_argb_impl_v3(_t: X64V3Token, s: &[u32], e: &[Extract], fill: u32, d: &mut [u32]) {
    pack_argb_row(s, e, fill, d);
}
#[cfg(target_arch = "x86_64")]
#[arcane]
fn rgb_to_bgra_impl_v3(_t: X64V3Token, s: &[u8], d: &mut [u8]) {
    rgb_to_bgra_row(s, d);
}
#[cfg(target_arch = "x86_64")]
#[arcane]
fn bgra_to_rgb_impl_v3(_t: X64V3Token, s: &[u8], d: &mut [u8]) {
    bgra_to_rgb_row(s, d);
}
#[cfg(target_arch = "x86_64")]
#[arcane]
fn premultiply_impl_v3(_t: X64V3Token, b: &mut [u8]) {
    premultiply_row(b);
}
#[cfg(target_arch = "x86_64")]
#[arcane]
fn unpremultiply_impl_v3(_t: X64V3Token, b: &mut [u8]) {
    unpremultiply_row(b);
}

// ===========================================================================
// Public API
// ===========================================================================

/// Expand `pixels` packed ARGB words at the front of `buf` into
/// `extracts.len()` samples per pixel, in place.
///
/// `buf` must hold `pixels * extracts.len()` elements. [`Extract::Absent`]
/// slots are written as 0.
pub fn unpack_argb(buf: &mut [u32], pixels: usize, extracts: &[Extract]) -> Result<(), RasterError> {
    if extracts.is_empty() {
        return Err(RasterError::IndexOutOfRange { index: 0, len: 0 });
    }
    check_len(pixels * extracts.len(), buf.len())?;
    incant!(unpack_argb_impl(buf, pixels, extracts), [v3, scalar]);
    Ok(())
}

/// Pack `extracts.len()` samples per pixel into ARGB words.
///
/// With `opaque` set, alpha starts at `0xFF` and is only replaced by a
/// sample that maps onto the alpha byte.
pub fn pack_argb(
    samples: &[u32],
    extracts: &[Extract],
    opaque: bool,
    dst: &mut [u32],
) -> Result<(), RasterError> {
    if extracts.is_empty() {
        return Err(RasterError::IndexOutOfRange { index: 0, len: 0 });
    }
    check_copy(samples.len(), extracts.len(), dst.len(), 1)?;
    let fill = if opaque { 0xFF00_0000 } else { 0 };
    incant!(pack_argb_impl(samples, extracts, fill, dst), [v3, scalar]);
    Ok(())
}

/// RGB (3 bytes/px) → BGRA (4 bytes/px). Reverses channel order, alpha=255.
pub fn rgb_to_bgra(src: &[u8], dst: &mut [u8]) -> Result<(), RasterError> {
    check_copy(src.len(), 3, dst.len(), 4)?;
    incant!(rgb_to_bgra_impl(src, dst), [v3, scalar]);
    Ok(())
}

/// BGRA (4 bytes/px) → RGB (3 bytes/px). Drops alpha.
pub fn bgra_to_rgb(src: &[u8], dst: &mut [u8]) -> Result<(), RasterError> {
    check_copy(src.len(), 4, dst.len(), 3)?;
    incant!(bgra_to_rgb_impl(src, dst), [v3, scalar]);
    Ok(())
}

/// Scale B, G and R by alpha, in place.
pub fn premultiply_bgra(buf: &mut [u8]) -> Result<(), RasterError> {
    check_copy(buf.len(), 4, buf.len(), 4)?;
    incant!(premultiply_impl(buf), [v3, scalar]);
    Ok(())
}

/// Undo [`premultiply_bgra`], in place. Fully transparent pixels become zero.
pub fn unpremultiply_bgra(buf: &mut [u8]) -> Result<(), RasterError> {
    check_copy(buf.len(), 4, buf.len(), 4)?;
    incant!(unpremultiply_impl(buf), [v3, scalar]);
    Ok(())
}

/// Packed ARGB words → BGRA bytes.
pub fn argb_to_bgra(src: &[u32], dst: &mut [u8]) -> Result<(), RasterError> {
    check_len(src.len() * 4, dst.len())?;
    for (&argb, d) in src.iter().zip(dst.chunks_exact_mut(4)) {
        d.copy_from_slice(&argb.to_le_bytes());
    }
    Ok(())
}

/// BGRA bytes → packed ARGB words.
pub fn bgra_to_argb(src: &[u8], dst: &mut [u32]) -> Result<(), RasterError> {
    check_copy(src.len(), 4, dst.len(), 1)?;
    for (s, d) in src.chunks_exact(4).zip(dst.iter_mut()) {
        *d = u32::from_le_bytes([s[0], s[1], s[2], s[3]]);
    }
    Ok(())
}
