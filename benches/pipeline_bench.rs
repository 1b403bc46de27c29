// Criterion benchmarks for the scanning pipeline on a synthetic photo.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};

use flatscan::{enhance, rectify, scan, EnhancementParams, Point2D, Quadrilateral, ScanOptions};

fn sample() -> (RgbImage, Quadrilateral) {
    let img = RgbImage::from_fn(800, 600, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let quad = Quadrilateral::new(
        [(100.0, 80.0), (700.0, 60.0), (720.0, 540.0), (80.0, 560.0)].map(Point2D::from),
    );
    (img, quad)
}

fn bench_rectify(c: &mut Criterion) {
    let (img, quad) = sample();
    c.bench_function("rectify (800x600 -> 640x480)", |b| {
        b.iter(|| black_box(rectify(black_box(&img), black_box(&quad)).unwrap()));
    });
}

fn bench_enhance(c: &mut Criterion) {
    let (img, quad) = sample();
    let page = rectify(&img, &quad).unwrap();
    let params = EnhancementParams::default();
    c.bench_function("enhance (640x480)", |b| {
        b.iter(|| black_box(enhance(black_box(&page), &params).unwrap()));
    });
}

fn bench_full_scan(c: &mut Criterion) {
    let (img, quad) = sample();
    let options = ScanOptions::default();
    c.bench_function("scan (default options)", |b| {
        b.iter(|| black_box(scan(black_box(&img), &quad, &options).unwrap()));
    });
}

criterion_group!(benches, bench_rectify, bench_enhance, bench_full_scan);
criterion_main!(benches);
