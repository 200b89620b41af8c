//! Criterion benchmarks for the matvec kernels
//!
//! Compares the scalar fallback, the dispatched SIMD path and the reference
//! BLAS oracle on square aligned shapes, in both traversals.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use matvec_common::Traversal;
use matvec_kernels::{
    Dispatcher, FallbackKernel, MatvecKernel, OracleKernel, ReferenceBlas, SIMD_WIDTH,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;

struct BenchmarkData {
    matrix: Vec<f32>,
    vec_mul: Vec<f32>,
    vec_add: Vec<f32>,
    res: Vec<f32>,
}

impl BenchmarkData {
    fn square(n: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut uniform = |len: usize| -> Vec<f32> {
            (0..len).map(|_| rng.random_range(-1.0f32..1.0)).collect()
        };
        Self {
            matrix: uniform(n * n),
            vec_mul: uniform(n),
            vec_add: uniform(n),
            res: vec![0.0; n],
        }
    }
}

const SIZES: [usize; 4] = [64, 256, 512, 1024];

fn bench_traversal(c: &mut Criterion, traversal: Traversal) {
    let dispatcher = Dispatcher::detect();
    let oracle = OracleKernel::new(ReferenceBlas);
    let mut group = c.benchmark_group(format!("matvec_{traversal}"));

    for n in SIZES {
        debug_assert_eq!(n % SIMD_WIDTH, 0);
        let mut data = BenchmarkData::square(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        let label = format!("{n}x{n}");

        group.bench_with_input(BenchmarkId::new("fallback", &label), &n, |b, &n| {
            b.iter(|| {
                FallbackKernel
                    .apply(
                        traversal,
                        black_box(&data.matrix),
                        black_box(&data.vec_mul),
                        black_box(&data.vec_add),
                        black_box(&mut data.res),
                        n,
                        n,
                    )
                    .unwrap()
            });
        });

        let simd_name = dispatcher.simd_kernel_name().unwrap_or("dispatched");
        group.bench_with_input(BenchmarkId::new(simd_name, &label), &n, |b, &n| {
            b.iter(|| {
                dispatcher
                    .matvec(
                        traversal,
                        black_box(&data.matrix),
                        black_box(&data.vec_mul),
                        black_box(&data.vec_add),
                        black_box(&mut data.res),
                        n,
                        n,
                    )
                    .unwrap()
            });
        });

        group.bench_with_input(BenchmarkId::new(oracle.name(), &label), &n, |b, &n| {
            b.iter(|| {
                oracle
                    .apply(
                        traversal,
                        black_box(&data.matrix),
                        black_box(&data.vec_mul),
                        black_box(&data.vec_add),
                        black_box(&mut data.res),
                        n,
                        n,
                    )
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_row_major(c: &mut Criterion) {
    bench_traversal(c, Traversal::RowMajor);
}

fn bench_transposed(c: &mut Criterion) {
    bench_traversal(c, Traversal::Transposed);
}

/// Misaligned shapes measure the cost of the fallback route through dispatch.
fn bench_misaligned_dispatch(c: &mut Criterion) {
    let dispatcher = Dispatcher::detect();
    let mut group = c.benchmark_group("matvec_misaligned");

    for n in [63usize, 255] {
        let mut data = BenchmarkData::square(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("dispatched", format!("{n}x{n}")), &n, |b, &n| {
            b.iter(|| {
                dispatcher
                    .matvec(
                        Traversal::RowMajor,
                        black_box(&data.matrix),
                        black_box(&data.vec_mul),
                        black_box(&data.vec_add),
                        black_box(&mut data.res),
                        n,
                        n,
                    )
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_row_major, bench_transposed, bench_misaligned_dispatch);
criterion_main!(benches);
