//! Benchmarks for the fixed specialization pipelines.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use stencilop_compiler::{specialize, OperatorOptions, Platform, Strategy};
use stencilop_ir::{Assignment, Cluster, Dimension, Expr, Index, Interval, IterationSpace};

/// A 2D diffusion step plus a coupled output cluster, enough work to
/// exercise fusion, blocking, and the flop-reduction passes.
fn stencil_clusters() -> Vec<Cluster> {
    let ispace = IterationSpace::new(vec![
        Interval::new(Dimension::time("t"), 0, 0),
        Interval::new(Dimension::space("x"), 0, 0),
        Interval::new(Dimension::space("y"), 0, 0),
    ]);
    let at = |t: i64, x: i64, y: i64| {
        Expr::access(
            "u",
            vec![Index::new("t", t), Index::new("x", x), Index::new("y", y)],
        )
    };
    let c = Expr::access("c", vec![Index::new("x", 0), Index::new("y", 0)]);
    let laplacian = Expr::add(
        Expr::add(at(0, 1, 0), at(0, -1, 0)),
        Expr::add(at(0, 0, 1), at(0, 0, -1)),
    );
    let update = Cluster::new(
        vec![Assignment::new(
            at(1, 0, 0),
            Expr::add(at(0, 0, 0), Expr::mul(c.clone(), laplacian)),
        )],
        ispace.clone(),
    );
    let energy = Cluster::new(
        vec![Assignment::new(
            Expr::access("e", vec![Index::new("t", 1), Index::new("x", 0), Index::new("y", 0)]),
            Expr::mul(Expr::pow(at(1, 0, 0), 2), c),
        )],
        ispace,
    );
    vec![update, energy]
}

fn bench_fixed_pipelines(c: &mut Criterion) {
    let mut group = c.benchmark_group("specialize");
    for strategy in [Strategy::base(), Strategy::openmp(), Strategy::fsg()] {
        group.bench_function(strategy.name, |b| {
            b.iter(|| {
                specialize(
                    black_box(stencil_clusters()),
                    &strategy,
                    &OperatorOptions::new(),
                    Platform::cpu64(),
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fixed_pipelines);
criterion_main!(benches);
