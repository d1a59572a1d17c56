//! Benchmarks for full ALS sweeps on polynomial patterns

use bstt_als::{Als, AlsConfig, NoopObserver};
use bstt_basis::{legendre_measures, random_grouped_homogeneous_polynomial, random_polynomial};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use scirs2_core::ndarray_ext::{Array1, Array2};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};
use std::hint::black_box;

fn sample(num_samples: usize, order: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(42);
    let points = Array2::from_shape_fn((num_samples, order), |_| 2.0 * rng.random::<f64>() - 1.0);
    let values = points
        .rows()
        .into_iter()
        .map(|p| 1.0 / (1.0 + p.dot(&p)))
        .collect();
    (points, values)
}

fn bench_polynomial_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("polynomial_sweep");
    group.sample_size(20);

    for &(samples, order, degree) in &[(500, 4, 3), (2000, 4, 3), (2000, 6, 4)] {
        let (points, values) = sample(samples, order);
        let meas = legendre_measures(&points.view(), degree, -1.0, 1.0).expect("valid interval");
        let mut rng = StdRng::seed_from_u64(7);
        let tt = random_polynomial(&vec![degree; order], degree, &mut rng).expect("valid pattern");

        group.bench_with_input(
            BenchmarkId::new("total_degree", format!("n{}_o{}_d{}", samples, order, degree)),
            &tt,
            |b, tt| {
                b.iter(|| {
                    let mut tt = tt.clone();
                    let mut als = Als::builder(&mut tt, &meas)
                        .values(&values.view())
                        .observer(NoopObserver)
                        .build()
                        .expect("valid engine");
                    black_box(als.sweep().expect("sweep"))
                })
            },
        );
    }

    group.finish();
}

fn bench_grouped_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouped_homogeneous_run");
    group.sample_size(10);

    for &(samples, order, degree, group_size) in &[(1000, 5, 3, 2), (1000, 5, 3, 4)] {
        let (points, values) = sample(samples, order);
        let meas = legendre_measures(&points.view(), degree, -1.0, 1.0).expect("valid interval");
        let mut rng = StdRng::seed_from_u64(11);
        let tt = random_grouped_homogeneous_polynomial(&vec![degree; order], degree, group_size, &mut rng)
            .expect("valid pattern");

        group.bench_with_input(
            BenchmarkId::new("run", format!("n{}_o{}_g{}", samples, order, group_size)),
            &tt,
            |b, tt| {
                b.iter(|| {
                    let mut tt = tt.clone();
                    let mut als = Als::builder(&mut tt, &meas)
                        .values(&values.view())
                        .config(AlsConfig::default().with_max_sweeps(3))
                        .observer(NoopObserver)
                        .build()
                        .expect("valid engine");
                    black_box(als.run().expect("run"))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_polynomial_sweep, bench_grouped_run);
criterion_main!(benches);
