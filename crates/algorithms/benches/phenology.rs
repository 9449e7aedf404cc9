//! Benchmarks for phenology extraction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use verdant_algorithms::phenology::{
    phenology_pixel, phenology_raster, MonthlySeries, MonthlyStack, PhenologyParams,
    ProcessingOptions,
};
use verdant_core::{GeoTransform, Raster};
use verdant_parallel::ProcessingMode;

fn create_month(size: usize, month: usize) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    for row in 0..size {
        for col in 0..size {
            let peak = 4 + (row * 7 + col * 13) % 6;
            let dist = (month as f64 - peak as f64).abs();
            let v = if (row + col + month) % 11 == 0 {
                f64::NAN
            } else {
                0.85 - 0.09 * dist
            };
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn create_stack(size: usize) -> MonthlyStack {
    MonthlyStack::new((1..=12).map(|m| create_month(size, m)).collect()).unwrap()
}

fn bench_pixel(c: &mut Criterion) {
    let series = MonthlySeries::from_values(
        &[0.1, 0.12, 0.2, 0.35, 0.6, f64::NAN, 0.82, 0.75, 0.5, 0.3, 0.15, 0.1],
        None,
    )
    .unwrap();
    let params = PhenologyParams::default();
    c.bench_function("phenology/pixel", |b| {
        b.iter(|| phenology_pixel(black_box(&series), black_box(&params)))
    });
}

fn bench_raster(c: &mut Criterion) {
    let params = PhenologyParams::default();
    for (label, mode) in [
        ("sequential", ProcessingMode::Sequential),
        ("parallel", ProcessingMode::Parallel),
    ] {
        let mut group = c.benchmark_group(format!("phenology/raster_{}", label));
        let options = ProcessingOptions {
            mode,
            ..Default::default()
        };
        for size in [256, 512, 1024] {
            let stack = create_stack(size);
            group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
                b.iter(|| phenology_raster(black_box(&stack), &params, &options).unwrap())
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench_pixel, bench_raster);
criterion_main!(benches);
