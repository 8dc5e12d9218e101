//! Format catalog.
//!
//! Maps the closed set of backing pixel formats to the sample layout the
//! adapter exposes: samples per pixel, component offsets, which format to
//! request from the backing image, and how requested elements map back onto
//! native ones. Every decision is made once, at construction, and carried
//! around as a [`FormatDecision`].

use alloc::vec::Vec;

use crate::RasterError;

// ---------------------------------------------------------------------------
// Pixel formats
// ---------------------------------------------------------------------------

/// Pixel layout of the backing image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PixelFormat {
    /// One 32-bit value per pixel, `0xAARRGGBB`.
    PackedArgb32 = 0,
    /// One 32-bit value per pixel, `0xAARRGGBB`, premultiplied.
    PackedArgb32Pre = 1,
    /// Four bytes per pixel in B, G, R, A order.
    Bgra8 = 2,
    /// Four bytes per pixel in B, G, R, A order, premultiplied.
    Bgra8Pre = 3,
    /// Three bytes per pixel in R, G, B order. No alpha is stored.
    Rgb8 = 4,
    /// One palette index byte per pixel.
    Indexed8 = 5,
}

impl PixelFormat {
    /// Every format, in tag order.
    pub const ALL: [PixelFormat; 6] = [
        Self::PackedArgb32,
        Self::PackedArgb32Pre,
        Self::Bgra8,
        Self::Bgra8Pre,
        Self::Rgb8,
        Self::Indexed8,
    ];

    /// Number of storage elements per pixel (32-bit words for packed formats, bytes otherwise).
    #[inline]
    pub const fn samples_per_pixel(self) -> usize {
        match self {
            Self::PackedArgb32 | Self::PackedArgb32Pre | Self::Indexed8 => 1,
            Self::Bgra8 | Self::Bgra8Pre => 4,
            Self::Rgb8 => 3,
        }
    }

    /// Whether a pixel is a single packed 32-bit value.
    #[inline]
    pub const fn is_packed(self) -> bool {
        matches!(self, Self::PackedArgb32 | Self::PackedArgb32Pre)
    }

    /// Whether the format physically stores alpha.
    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(
            self,
            Self::PackedArgb32 | Self::PackedArgb32Pre | Self::Bgra8 | Self::Bgra8Pre
        )
    }

    #[inline]
    pub const fn is_premultiplied(self) -> bool {
        matches!(self, Self::PackedArgb32Pre | Self::Bgra8Pre)
    }

    /// Whether pixels can be written back in this format.
    ///
    /// RGB and indexed storage can only be read in their own layout; writes go
    /// through a wider format.
    #[inline]
    pub const fn is_writable(self) -> bool {
        matches!(
            self,
            Self::PackedArgb32 | Self::PackedArgb32Pre | Self::Bgra8 | Self::Bgra8Pre
        )
    }

    /// Format the row cache requests from a backing image of this format.
    #[inline]
    pub const fn request_format(self) -> Self {
        if self.is_writable() { self } else { Self::Bgra8 }
    }

    /// Packed format used by bulk rectangle transfers.
    #[inline]
    pub const fn bulk_request_format(self) -> Self {
        if self.is_premultiplied() {
            Self::PackedArgb32Pre
        } else {
            Self::PackedArgb32
        }
    }
}

impl TryFrom<u8> for PixelFormat {
    type Error = RasterError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(tag as usize)
            .copied()
            .ok_or(RasterError::UnknownFormat(tag))
    }
}

/// Alpha channel interpretation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlphaMode {
    /// No alpha channel.
    None,
    /// Straight (unassociated) alpha.
    Straight,
    /// Premultiplied (associated) alpha.
    Premultiplied,
}

// ---------------------------------------------------------------------------
// Colour model
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Srgb,
}

/// The only colour space any supported format is interpreted in.
pub const SRGB: ColorSpace = ColorSpace::Srgb;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transparency {
    Opaque,
    Translucent,
}

/// How a consumer should interpret the samples of a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorModel {
    pub space: ColorSpace,
    pub alpha: AlphaMode,
    pub transparency: Transparency,
    /// Samples are packed `0xAARRGGBB` words rather than one component each.
    pub packed: bool,
}

// ---------------------------------------------------------------------------
// Layout hints and bulk extraction
// ---------------------------------------------------------------------------

/// Band layout a consumer asks for when wrapping a backing image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayoutHint {
    /// One packed sample per pixel.
    Packed,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
}

impl LayoutHint {
    #[inline]
    pub const fn bands(self) -> usize {
        match self {
            Self::Packed => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// Where a native element lives inside a packed `0xAARRGGBB` word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Extract {
    /// The element is the packed word itself.
    Whole,
    /// The element is the byte at this bit shift.
    Byte(u32),
    /// The element has no bits in the packed word.
    Absent,
}

// ---------------------------------------------------------------------------
// FormatDecision
// ---------------------------------------------------------------------------

const IDENTITY: [usize; 4] = [0, 1, 2, 3];
const RGB_TO_BGRA: [usize; 4] = [2, 1, 0, 3];
const BGRA_OFFSETS: [usize; 4] = [2, 1, 0, 3];
const RGB_OFFSETS: [usize; 3] = [0, 1, 2];

/// Maps elements of `native` onto elements of a row fetched as `request`.
///
/// Only the identity and the RGB→BGRA widening are supported. The RGB table
/// carries a fourth entry addressing the alpha byte of the BGRA row.
pub fn conversion_table(
    native: PixelFormat,
    request: PixelFormat,
) -> Result<&'static [usize], RasterError> {
    if native == request {
        Ok(&IDENTITY[..native.samples_per_pixel()])
    } else if native == PixelFormat::Rgb8 && request == PixelFormat::Bgra8 {
        Ok(&RGB_TO_BGRA)
    } else {
        Err(RasterError::UnsupportedConversion {
            from: native,
            to: request,
        })
    }
}

/// Layout decisions for one backing image, computed once and shared by every
/// view derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatDecision {
    format: PixelFormat,
    request: PixelFormat,
    bulk_request: PixelFormat,
    component_offsets: &'static [usize],
    conversion: &'static [usize],
    alpha: AlphaMode,
}

impl FormatDecision {
    /// Resolve the layout for `format`.
    ///
    /// Fails with [`RasterError::UnsupportedFormat`] for indexed storage:
    /// palette expansion is not attempted.
    pub fn new(format: PixelFormat) -> Result<Self, RasterError> {
        let component_offsets: &'static [usize] = match format {
            PixelFormat::PackedArgb32 | PixelFormat::PackedArgb32Pre => &IDENTITY[..1],
            PixelFormat::Bgra8 | PixelFormat::Bgra8Pre => &BGRA_OFFSETS,
            PixelFormat::Rgb8 => &RGB_OFFSETS,
            PixelFormat::Indexed8 => return Err(RasterError::UnsupportedFormat(format)),
        };
        let request = format.request_format();
        let alpha = if format.is_premultiplied() {
            AlphaMode::Premultiplied
        } else if format.has_alpha() {
            AlphaMode::Straight
        } else {
            AlphaMode::None
        };
        Ok(Self {
            format,
            request,
            bulk_request: format.bulk_request_format(),
            component_offsets,
            conversion: conversion_table(format, request)?,
            alpha,
        })
    }

    #[inline]
    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    /// Format rows are fetched in for the sample cache.
    #[inline]
    pub const fn request_format(&self) -> PixelFormat {
        self.request
    }

    /// Packed format used by bulk transfers.
    #[inline]
    pub const fn bulk_request_format(&self) -> PixelFormat {
        self.bulk_request
    }

    /// Native storage elements per pixel; the divisor of flat addressing.
    #[inline]
    pub const fn samples_per_pixel(&self) -> usize {
        self.format.samples_per_pixel()
    }

    /// Elements per pixel of a row fetched in the request format.
    #[inline]
    pub const fn request_samples_per_pixel(&self) -> usize {
        self.request.samples_per_pixel()
    }

    /// Native element holding each colour component, in R, G, B, A order.
    #[inline]
    pub const fn component_offsets(&self) -> &'static [usize] {
        self.component_offsets
    }

    /// Native element → request element.
    #[inline]
    pub const fn conversion(&self) -> &'static [usize] {
        self.conversion
    }

    /// Number of addressable elements per pixel, including a synthesized alpha slot.
    #[inline]
    pub const fn elements(&self) -> usize {
        self.conversion.len()
    }

    #[inline]
    pub const fn alpha(&self) -> AlphaMode {
        self.alpha
    }

    /// Element that reads as opaque alpha without the backing image storing it.
    #[inline]
    pub const fn synthetic_alpha(&self) -> Option<usize> {
        match self.format {
            PixelFormat::Rgb8 => Some(3),
            _ => None,
        }
    }

    /// Position of native `element` inside a packed word of the bulk request format.
    pub const fn extract(&self, element: usize) -> Extract {
        match self.format {
            PixelFormat::PackedArgb32 | PixelFormat::PackedArgb32Pre => Extract::Whole,
            // B, G, R, A from the low byte upward.
            PixelFormat::Bgra8 | PixelFormat::Bgra8Pre => Extract::Byte(8 * element as u32),
            PixelFormat::Rgb8 if element < 3 => Extract::Byte(16 - 8 * element as u32),
            PixelFormat::Rgb8 | PixelFormat::Indexed8 => Extract::Absent,
        }
    }

    /// Bands of a view created without a hint.
    pub fn default_bands(&self) -> Vec<usize> {
        self.component_offsets.to_vec()
    }

    /// Bands of a view created with `hint`.
    ///
    /// An RGB backing image may expose its synthesized alpha as the fourth band.
    /// Packed formats have one element and take only [`LayoutHint::Packed`].
    pub fn hint_bands(&self, hint: LayoutHint) -> Result<Vec<usize>, RasterError> {
        let count = hint.bands();
        let mut bands: Vec<usize> = self.component_offsets.iter().copied().take(count).collect();
        if bands.len() < count {
            if let Some(alpha) = self.synthetic_alpha() {
                bands.push(alpha);
            }
        }
        if bands.len() < count {
            return Err(RasterError::IndexOutOfRange {
                index: count - 1,
                len: bands.len(),
            });
        }
        Ok(bands)
    }

    /// Whether `bands` cover every stored colour component, so that a packed
    /// bulk write cannot clobber a component the caller did not supply.
    pub(crate) fn covers_color(&self, bands: &[usize]) -> bool {
        let color = if self.format.is_packed() {
            &self.component_offsets[..1]
        } else {
            &self.component_offsets[..3]
        };
        color.iter().all(|c| bands.contains(c))
    }

    /// Whether a packed bulk write over `bands` must force alpha to opaque.
    pub(crate) fn forces_opaque(&self, bands: &[usize]) -> bool {
        match self.format {
            PixelFormat::Bgra8 | PixelFormat::Bgra8Pre => !bands.contains(&3),
            PixelFormat::Rgb8 => true,
            _ => false,
        }
    }

    pub const fn color_model(&self) -> ColorModel {
        ColorModel {
            space: SRGB,
            alpha: self.alpha,
            transparency: match self.alpha {
                AlphaMode::None => Transparency::Opaque,
                _ => Transparency::Translucent,
            },
            packed: self.format.is_packed(),
        }
    }
}
