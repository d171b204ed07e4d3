//! Criterion benchmarks for cadence-core DSP primitives.
//!
//! Run with: cargo bench -p cadence-core
#![allow(missing_docs)]

use cadence_core::biquad::{DynamicBiquad, FilterKind, rbj_coefficients};
use cadence_core::ramp::Ramp;
use cadence_core::ring_buffer::RingBuffer;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn bench_biquad(c: &mut Criterion) {
    let mut group = c.benchmark_group("DynamicBiquad");
    let target = rbj_coefficients(FilterKind::LowPass, 1000.0 / SAMPLE_RATE, 0.707, 0.0);

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);

        group.bench_with_input(
            BenchmarkId::new("process_settled", block_size),
            &block_size,
            |b, _| {
                let mut filter = DynamicBiquad::new();
                filter.set_coefficients(target);
                b.iter(|| {
                    for &sample in &input {
                        black_box(filter.process(black_box(sample)));
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("process_with_gradient", block_size),
            &block_size,
            |b, &size| {
                let mut filter = DynamicBiquad::new();
                b.iter(|| {
                    filter.load_gradient(target, size as u32);
                    for &sample in &input {
                        black_box(filter.process(black_box(sample)));
                    }
                });
            },
        );
    }

    group.bench_function("rbj_coefficient_calc", |b| {
        b.iter(|| {
            black_box(rbj_coefficients(
                FilterKind::LowPass,
                black_box(1000.0 / SAMPLE_RATE),
                black_box(0.707),
                black_box(0.0),
            ))
        });
    });

    group.finish();
}

fn bench_ring_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("RingBuffer");

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);

        group.bench_with_input(
            BenchmarkId::new("read_write", block_size),
            &block_size,
            |b, _| {
                let mut rb = RingBuffer::new(4096);
                b.iter(|| {
                    for &sample in &input {
                        black_box(rb.read_write(black_box(sample), black_box(1000)));
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("read_interpolated", block_size),
            &block_size,
            |b, _| {
                let mut rb = RingBuffer::new(4096);
                for &sample in &input {
                    rb.write(sample);
                }
                b.iter(|| {
                    black_box(rb.read_interpolated(black_box(512.5)));
                });
            },
        );
    }

    group.finish();
}

fn bench_ramp(c: &mut Criterion) {
    let mut group = c.benchmark_group("Ramp");

    for &block_size in BLOCK_SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block_size, |b, &size| {
            b.iter(|| {
                let mut ramp = Ramp::over(0.0, 1.0, size as u32);
                for _ in 0..size {
                    black_box(ramp.next());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_biquad, bench_ring_buffer, bench_ramp);
criterion_main!(benches);
