//! End-to-end behaviour of views over in-memory backing images.

use drape::{
    LayoutHint, MemoryImage, PixelFormat, PixelReader, PixelsMut, RasterError, RasterView, Rect,
    Region, WriteMode,
};

const WRITABLE: [PixelFormat; 5] = [
    PixelFormat::PackedArgb32,
    PixelFormat::PackedArgb32Pre,
    PixelFormat::Bgra8,
    PixelFormat::Bgra8Pre,
    PixelFormat::Rgb8,
];

fn patterned(width: usize, height: usize, format: PixelFormat) -> MemoryImage {
    let words: Vec<u32> = (0..width * height)
        .map(|i| (i as u32).wrapping_mul(0x0103_0507) | 0xFF00_0000)
        .collect();
    MemoryImage::from_argb(width, height, format, &words).unwrap()
}

/// A value a band can hold: full words for packed formats, bytes otherwise.
fn sample_value(format: PixelFormat, seed: u32) -> u32 {
    if format.is_packed() {
        0xFF00_0000 | seed.wrapping_mul(0x0001_0203)
    } else {
        seed & 0xFF
    }
}

#[test]
fn rgb_two_pixel_scenario() {
    let mut image =
        MemoryImage::from_bytes(2, 1, PixelFormat::Rgb8, vec![10, 20, 30, 40, 50, 60]).unwrap();
    {
        let view = RasterView::writable_with_hint(&mut image, LayoutHint::Rgba).unwrap();
        let mut px = [0u32; 4];
        view.get_pixel(0, 0, &mut px).unwrap();
        assert_eq!(px, [10, 20, 30, 255]);

        view.set_sample(1, 0, 0, 99).unwrap();
        assert_eq!(view.sample(1, 0, 0).unwrap(), 99);
        assert_eq!(view.sample(1, 0, 3).unwrap(), 255);
    }
    assert_eq!(image.as_bytes(), &[10, 20, 30, 99, 50, 60]);
}

#[test]
fn indexed_images_are_rejected() {
    let mut image = MemoryImage::new(4, 4, PixelFormat::Indexed8);
    assert_eq!(
        RasterView::new(&image).unwrap_err(),
        RasterError::UnsupportedFormat(PixelFormat::Indexed8)
    );
    assert_eq!(
        RasterView::writable(&mut image).unwrap_err(),
        RasterError::UnsupportedFormat(PixelFormat::Indexed8)
    );
    assert_eq!(image.reads(), 0);
}

#[test]
fn read_after_write_for_every_format() {
    for format in WRITABLE {
        let mut image = patterned(5, 3, format);
        let view = RasterView::writable(&mut image).unwrap();
        let bands = view.num_bands();
        for band in 0..bands {
            let value = sample_value(format, 40 + band as u32);
            view.set_sample(3, 2, band, value).unwrap();
            assert_eq!(view.sample(3, 2, band).unwrap(), value, "{format:?} band {band}");
            // Evict by reading another row first.
            view.sample(0, 0, 0).unwrap();
            assert_eq!(view.sample(3, 2, band).unwrap(), value, "{format:?} band {band} after eviction");
        }
    }
}

#[test]
fn rgb_writes_keep_alpha_opaque() {
    let mut image = MemoryImage::new(3, 2, PixelFormat::Rgb8);
    let view = RasterView::writable_with_hint(&mut image, LayoutHint::Rgba).unwrap();
    for x in 0..3 {
        view.set_sample(x, 1, (x % 3) as usize, 7).unwrap();
        assert_eq!(view.sample(x, 1, 3).unwrap(), 255);
    }
}

#[test]
fn sub_views_alias_their_parent() {
    for format in WRITABLE {
        let mut image = patterned(6, 4, format);
        let parent = RasterView::writable(&mut image).unwrap();
        let child = parent.sub_view(Rect::new(2, 1, 3, 2), None).unwrap();
        for y in 1..3 {
            for x in 2..5 {
                for band in 0..parent.num_bands() {
                    assert_eq!(
                        child.sample(x, y, band).unwrap(),
                        parent.sample(x, y, band).unwrap(),
                        "{format:?} ({x}, {y}) band {band}"
                    );
                }
            }
        }
        // Writes through the child are visible through the parent.
        let value = sample_value(format, 200);
        child.set_sample(4, 2, 0, value).unwrap();
        assert_eq!(parent.sample(4, 2, 0).unwrap(), value);
    }
}

#[test]
fn out_of_bounds_sub_views_fail_without_side_effects() {
    let mut image = patterned(4, 4, PixelFormat::Bgra8);
    let before = image.as_bytes().to_vec();
    {
        let view = RasterView::writable(&mut image).unwrap();
        let child = view.sub_view(Rect::new(1, 1, 2, 2), None).unwrap();
        for rect in [
            Rect::new(0, 1, 1, 1),
            Rect::new(1, 0, 1, 1),
            Rect::new(2, 1, 2, 1),
            Rect::new(1, 2, 1, 2),
            Rect::new(1, 1, u32::MAX, 1),
        ] {
            assert!(
                matches!(child.sub_view(rect, None), Err(RasterError::OutOfBounds(_))),
                "{rect:?}"
            );
        }
    }
    assert_eq!(image.as_bytes(), &before[..]);
    assert_eq!(image.writes(), 0);
}

#[test]
fn bulk_rows_match_per_sample_reads() {
    for format in WRITABLE {
        let image = patterned(7, 3, format);
        let view = RasterView::new(&image).unwrap();
        let bands = view.num_bands();
        for y in 0..3 {
            let mut row = vec![0u32; 7 * bands];
            view.get_pixel_row(0, y, 7, &mut row).unwrap();
            for x in 0..7 {
                for band in 0..bands {
                    assert_eq!(
                        row[x * bands + band],
                        view.sample(x as i32, y, band).unwrap(),
                        "{format:?} ({x}, {y}) band {band}"
                    );
                }
            }
        }
    }
}

#[test]
fn bulk_rgb_alpha_diverges_from_per_sample_alpha() {
    let image =
        MemoryImage::from_bytes(2, 1, PixelFormat::Rgb8, vec![10, 20, 30, 40, 50, 60]).unwrap();
    let view = RasterView::with_hint(&image, LayoutHint::Rgba).unwrap();
    let bulk = view.pixels(0, 0, 2, 1).unwrap();
    assert_eq!(bulk, [10, 20, 30, 0, 40, 50, 60, 0]);
    assert_eq!(view.sample(0, 0, 3).unwrap(), 255);
    assert_eq!(view.sample(1, 0, 3).unwrap(), 255);
}

/// One RGB pixel whose BGRA rows carry junk in the alpha byte.
struct JunkAlphaRgb;

impl PixelReader for JunkAlphaRgb {
    fn width(&self) -> usize {
        1
    }

    fn height(&self) -> usize {
        1
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgb8
    }

    fn read_pixels(
        &self,
        _region: Region,
        _format: PixelFormat,
        dst: PixelsMut<'_>,
    ) -> Result<(), RasterError> {
        match dst {
            PixelsMut::Bytes(bytes) => bytes[..4].copy_from_slice(&[3, 2, 1, 0]),
            PixelsMut::Argb(words) => words[0] = 0x0001_0203,
        }
        Ok(())
    }
}

#[test]
fn rgb_alpha_is_opaque_whatever_the_reader_returns() {
    let image = JunkAlphaRgb;
    let view = RasterView::with_hint(&image, LayoutHint::Rgba).unwrap();
    assert_eq!(view.sample(0, 0, 3).unwrap(), 255);
    assert_eq!(view.sample(0, 0, 0).unwrap(), 1);
    assert_eq!(view.sample(0, 0, 2).unwrap(), 3);
    let mut px = [0u32; 4];
    view.get_pixel(0, 0, &mut px).unwrap();
    assert_eq!(px, [1, 2, 3, 255]);
}

#[test]
fn bulk_write_round_trips_through_per_sample_reads() {
    for format in WRITABLE {
        let mut image = MemoryImage::new(4, 2, format);
        let view = RasterView::writable(&mut image).unwrap();
        let bands = view.num_bands();
        let src: Vec<u32> = (0..4 * 2 * bands as u32)
            .map(|i| sample_value(format, i + 1))
            .collect();
        // Keep alpha opaque so premultiplied storage round-trips exactly.
        let src: Vec<u32> = src
            .chunks(bands)
            .flat_map(|px| {
                let mut px = px.to_vec();
                if bands == 4 {
                    px[3] = 255;
                }
                px
            })
            .collect();
        view.set_pixels(0, 0, 4, 2, &src).unwrap();
        let mut back = vec![0u32; src.len()];
        view.read_samples(0, 0, 4, 2, &mut back).unwrap();
        assert_eq!(back, src, "{format:?}");
    }
}

#[test]
fn read_only_views_reject_every_mutation() {
    let image = patterned(2, 2, PixelFormat::Bgra8);
    let view = RasterView::new(&image).unwrap();
    let child = view.sub_view(Rect::new(0, 0, 1, 1), Some(&[0])).unwrap();
    assert_eq!(child.set_sample(0, 0, 0, 1), Err(RasterError::ReadOnly));
    assert_eq!(child.set_pixel(0, 0, &[1]), Err(RasterError::ReadOnly));
    assert_eq!(view.set_pixel_row(0, 0, 2, &[0; 8]), Err(RasterError::ReadOnly));
    assert_eq!(view.write_samples(0, 0, 1, 1, &[0; 4]), Err(RasterError::ReadOnly));
}

#[test]
fn row_batched_writes_coalesce_per_row() {
    let mut image = MemoryImage::new(8, 2, PixelFormat::Bgra8);
    {
        let view = RasterView::writable_with_mode(&mut image, WriteMode::RowBatched).unwrap();
        for x in 0..8 {
            view.set_pixel(x, 0, &[1, 2, 3, 4]).unwrap();
        }
        view.flush().unwrap();
        for x in 0..8 {
            view.set_pixel(x, 1, &[5, 6, 7, 8]).unwrap();
        }
    }
    assert_eq!(image.writes(), 2);
    assert_eq!(&image.as_bytes()[..4], &[3, 2, 1, 4]);
    assert_eq!(&image.as_bytes()[60..], &[7, 6, 5, 8]);
}

#[test]
fn immediate_writes_one_pixel_per_sample() {
    let mut image = MemoryImage::new(2, 1, PixelFormat::Bgra8);
    {
        let view = RasterView::writable(&mut image).unwrap();
        view.set_pixel(0, 0, &[1, 2, 3, 4]).unwrap();
    }
    assert_eq!(image.writes(), 4);
    assert_eq!(image.reads(), 1);
}

#[test]
fn flat_indices_address_native_elements() {
    let mut image =
        MemoryImage::from_bytes(2, 1, PixelFormat::Rgb8, vec![10, 20, 30, 40, 50, 60]).unwrap();
    let view = RasterView::writable(&mut image).unwrap();
    {
        let mut buffer = view.data_buffer().unwrap();
        assert_eq!(buffer.size(), 6);
        assert_eq!(buffer.get_elem(0, 4).unwrap(), 50);
        buffer.set_elem(0, 5, 61).unwrap();
        assert_eq!(
            buffer.get_elem(1, 0),
            Err(RasterError::IndexOutOfRange { index: 1, len: 1 })
        );
    }
    assert_eq!(view.sample(1, 0, 2).unwrap(), 61);
}
