//! # Line Detection Benchmark

use criterion::{criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};

use drone_lib::line_det::{ColourThreshold, LineDetParams, LineDetector};

/// A camera-sized frame with a dark diagonal line on a light floor.
fn synthetic_frame() -> RgbImage {
    RgbImage::from_fn(960, 720, |x, y| {
        let line_x = 300 + y / 3;
        if x >= line_x && x < line_x + 40 {
            Rgb([20, 20, 20])
        } else {
            Rgb([200, 190, 180])
        }
    })
}

fn line_det_benchmark(c: &mut Criterion) {
    let frame = synthetic_frame();

    let mut params = LineDetParams {
        threshold: ColourThreshold::Hsv {
            h_min: 0,
            h_max: 179,
            s_min: 0,
            s_max: 255,
            v_min: 0,
            v_max: 80,
        },
        ..Default::default()
    };

    let detector = LineDetector::new(params.clone()).unwrap();
    c.bench_function("LineDetector::detect", |b| b.iter(|| detector.detect(&frame)));

    params.corner.enabled = false;
    let detector = LineDetector::new(params).unwrap();
    c.bench_function("LineDetector::detect::no_corners", |b| {
        b.iter(|| detector.detect(&frame))
    });
}

criterion_group!(benches, line_det_benchmark);
criterion_main!(benches);
