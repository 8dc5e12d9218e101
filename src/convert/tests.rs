extern crate alloc;
extern crate std;
use super::*;
use alloc::{vec, vec::Vec};
use archmage::testing::{CompileTimePolicy, for_each_token_permutation};

fn policy() -> CompileTimePolicy {
    if std::env::var_os("CI").is_some() {
        CompileTimePolicy::Fail
    } else {
        CompileTimePolicy::WarnStderr
    }
}

const TEST_PIXEL_COUNTS: &[usize] = &[1, 2, 7, 8, 9, 31, 64, 65, 257];

const BGRA: [Extract; 4] = [
    Extract::Byte(0),
    Extract::Byte(8),
    Extract::Byte(16),
    Extract::Byte(24),
];
const RGB: [Extract; 3] = [Extract::Byte(16), Extract::Byte(8), Extract::Byte(0)];

fn make_argb(n_pixels: usize) -> Vec<u32> {
    (0..n_pixels as u32)
        .map(|i| i.wrapping_mul(0x9E37_79B9) ^ 0x0102_0304)
        .collect()
}

fn make_bytes(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 251) as u8).collect()
}

// --- Reference implementations ---

fn ref_unpack(src: &[u32], extracts: &[Extract]) -> Vec<u32> {
    let mut out = Vec::new();
    for &argb in src {
        for &e in extracts {
            out.push(match e {
                Extract::Whole => argb,
                Extract::Byte(s) => (argb >> s) & 0xFF,
                Extract::Absent => 0,
            });
        }
    }
    out
}

#[test]
fn permutation_unpack_bgra_in_place() {
    let report = for_each_token_permutation(policy(), |perm| {
        for &n in TEST_PIXEL_COUNTS {
            let packed = make_argb(n);
            let expected = ref_unpack(&packed, &BGRA);
            let mut buf = vec![0u32; n * 4];
            buf[..n].copy_from_slice(&packed);
            unpack_argb(&mut buf, n, &BGRA).unwrap();
            assert_eq!(buf, expected, "unpack_bgra n={n} tier={perm}");
        }
    });
    std::eprintln!("unpack_bgra: {report}");
}

#[test]
fn permutation_unpack_rgb_in_place() {
    let report = for_each_token_permutation(policy(), |perm| {
        for &n in TEST_PIXEL_COUNTS {
            let packed = make_argb(n);
            let expected = ref_unpack(&packed, &RGB);
            let mut buf = vec![0u32; n * 3];
            buf[..n].copy_from_slice(&packed);
            unpack_argb(&mut buf, n, &RGB).unwrap();
            assert_eq!(buf, expected, "unpack_rgb n={n} tier={perm}");
        }
    });
    std::eprintln!("unpack_rgb: {report}");
}

#[test]
fn permutation_pack_inverts_unpack() {
    let report = for_each_token_permutation(policy(), |perm| {
        for &n in TEST_PIXEL_COUNTS {
            let packed = make_argb(n);
            let samples = ref_unpack(&packed, &BGRA);
            let mut out = vec![0u32; n];
            pack_argb(&samples, &BGRA, false, &mut out).unwrap();
            assert_eq!(out, packed, "pack_bgra n={n} tier={perm}");
        }
    });
    std::eprintln!("pack_bgra: {report}");
}

#[test]
fn permutation_rgb_bgra_swizzles() {
    let report = for_each_token_permutation(policy(), |perm| {
        for &n in TEST_PIXEL_COUNTS {
            let rgb = make_bytes(n * 3);
            let mut bgra = vec![0u8; n * 4];
            rgb_to_bgra(&rgb, &mut bgra).unwrap();
            for (s, d) in rgb.chunks_exact(3).zip(bgra.chunks_exact(4)) {
                assert_eq!(d, [s[2], s[1], s[0], 0xFF], "rgb_to_bgra n={n} tier={perm}");
            }
            let mut back = vec![0u8; n * 3];
            bgra_to_rgb(&bgra, &mut back).unwrap();
            assert_eq!(back, rgb, "bgra_to_rgb n={n} tier={perm}");
        }
    });
    std::eprintln!("rgb_bgra: {report}");
}

#[test]
fn unpack_leaves_absent_slots_zero() {
    let extracts = [
        Extract::Byte(16),
        Extract::Byte(8),
        Extract::Byte(0),
        Extract::Absent,
    ];
    let mut buf = vec![0xFF0A_141Eu32, 0xFF28_323C, 0, 0, 0, 0, 0, 0];
    unpack_argb(&mut buf, 2, &extracts).unwrap();
    assert_eq!(buf, [10, 20, 30, 0, 40, 50, 60, 0]);
}

#[test]
fn pack_forces_opaque_without_alpha_sample() {
    let mut out = [0u32; 2];
    pack_argb(&[10, 20, 30, 40, 50, 60], &RGB, true, &mut out).unwrap();
    assert_eq!(out, [0xFF0A_141E, 0xFF28_323C]);

    pack_argb(&[10, 20, 30, 40, 50, 60], &RGB, false, &mut out).unwrap();
    assert_eq!(out, [0x000A_141E, 0x0028_323C]);
}

#[test]
fn premultiply_round_trip_is_close() {
    let mut px = vec![200u8, 100, 50, 128, 10, 20, 30, 0, 1, 2, 3, 255];
    premultiply_bgra(&mut px).unwrap();
    assert_eq!(&px[..4], &[100, 50, 25, 128]);
    assert_eq!(&px[4..8], &[0, 0, 0, 0]);
    assert_eq!(&px[8..], &[1, 2, 3, 255]);
    unpremultiply_bgra(&mut px).unwrap();
    assert_eq!(&px[..4], &[199, 100, 50, 128]);
    assert_eq!(&px[8..], &[1, 2, 3, 255]);
}

#[test]
fn argb_words_are_bgra_bytes() {
    let mut bytes = [0u8; 4];
    argb_to_bgra(&[0x4433_2211], &mut bytes).unwrap();
    assert_eq!(bytes, [0x11, 0x22, 0x33, 0x44]);
    let mut word = [0u32; 1];
    bgra_to_argb(&bytes, &mut word).unwrap();
    assert_eq!(word, [0x4433_2211]);
}

#[test]
fn size_errors() {
    assert_eq!(
        unpack_argb(&mut [0; 5], 2, &BGRA),
        Err(RasterError::BufferTooSmall {
            needed: 8,
            actual: 5
        })
    );
    assert!(rgb_to_bgra(&[0; 6], &mut [0; 4]).is_err());
    assert!(bgra_to_rgb(&[0; 5], &mut [0; 3]).is_err());
    assert!(unpack_argb(&mut [0; 4], 1, &[]).is_err());
}
