use criterion::{BenchmarkGroup, Criterion, Throughput, measurement::WallTime};
use drape::{MemoryImage, PixelFormat, RasterView, WriteMode};

// === Scalar disable/enable via archmage ===

fn disable_all_simd() {
    let _ = archmage::dangerously_disable_tokens_except_wasm(true);
}

fn enable_all_simd() {
    let _ = archmage::dangerously_disable_tokens_except_wasm(false);
}

// === Benchmark helpers ===

const W: usize = 1920;
const H: usize = 64;

fn make_image(format: PixelFormat) -> MemoryImage {
    let words: Vec<u32> = (0..W * H)
        .map(|i| (i as u32).wrapping_mul(0x9E37_79B9) | 0xFF00_0000)
        .collect();
    MemoryImage::from_argb(W, H, format, &words).unwrap()
}

fn bench_reads(group: &mut BenchmarkGroup<WallTime>, format: PixelFormat) {
    let image = make_image(format);
    let view = RasterView::new(&image).unwrap();
    let bands = view.num_bands();

    group.bench_function("per_sample", |b| {
        b.iter(|| {
            let mut sum = 0u32;
            for y in 0..H as i32 {
                for x in 0..W as i32 {
                    for band in 0..bands {
                        sum = sum.wrapping_add(view.sample(x, y, band).unwrap());
                    }
                }
            }
            sum
        });
    });

    group.bench_function("bulk_rows", |b| {
        let mut row = vec![0u32; W * bands];
        b.iter(|| {
            for y in 0..H as i32 {
                view.get_pixel_row(0, y, W as u32, &mut row).unwrap();
            }
            row[0]
        });
    });

    disable_all_simd();
    group.bench_function("bulk_rows_scalar", |b| {
        let mut row = vec![0u32; W * bands];
        b.iter(|| {
            for y in 0..H as i32 {
                view.get_pixel_row(0, y, W as u32, &mut row).unwrap();
            }
            row[0]
        });
    });
    enable_all_simd();
}

fn bench_writes(group: &mut BenchmarkGroup<WallTime>, mode: WriteMode) {
    let mut image = make_image(PixelFormat::Bgra8);
    let view = RasterView::writable_with_mode(&mut image, mode).unwrap();
    group.bench_function(format!("{mode:?}"), |b| {
        b.iter(|| {
            for x in 0..W as i32 {
                view.set_sample(x, 0, 0, x as u32).unwrap();
            }
            view.flush().unwrap();
        });
    });
}

fn benches(c: &mut Criterion) {
    for format in [PixelFormat::PackedArgb32, PixelFormat::Bgra8, PixelFormat::Rgb8] {
        let mut group = c.benchmark_group(format!("read/{format:?}"));
        group.throughput(Throughput::Elements((W * H) as u64));
        bench_reads(&mut group, format);
        group.finish();
    }

    let mut group = c.benchmark_group("write_row");
    group.throughput(Throughput::Elements(W as u64));
    for mode in [WriteMode::Immediate, WriteMode::RowBatched] {
        bench_writes(&mut group, mode);
    }
    group.finish();
}

fn main() {
    let mut c = Criterion::default().configure_from_args();
    benches(&mut c);
    c.final_summary();
}
