//! # Trajectory Solve Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ctrl_lib::{
    latency,
    model::Control,
    path_fit::PathModel,
    traj_opt::{Params, TrajOpt},
};

fn solve_benchmark(c: &mut Criterion) {
    // ---- Build a representative planning problem ----

    // A gentle left bend ahead of the vehicle, as fitted from a typical
    // waypoint set
    let path = PathModel::new([0.236, 0.105, -1.5e-3, -5.0e-7]);

    let opt = TrajOpt::new(Params {
        solve_budget_s: 10.0,
        ..Default::default()
    });

    let state = latency::initial_state(&path, 20.0);

    c.bench_function("solve_cold", |b| {
        b.iter(|| {
            opt.solve(black_box(&state), black_box(&path), None)
                .unwrap()
        })
    });

    // Warm started from a converged sequence, the common case in steady
    // operation
    let warm: Vec<Control> = opt.solve(&state, &path, None).unwrap().controls;

    c.bench_function("solve_warm", |b| {
        b.iter(|| {
            opt.solve(black_box(&state), black_box(&path), Some(&warm))
                .unwrap()
        })
    });
}

criterion_group!(benches, solve_benchmark);
criterion_main!(benches);
