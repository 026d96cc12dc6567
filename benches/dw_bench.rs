//! Criterion benchmarks for u-dwsearch.
//!
//! Uses synthetic block-angular problems (groups of binaries with one local
//! cardinality row each, coupled by a single linking row) to measure
//! structure detection and whole heuristic calls.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_dwsearch::dw::{DwConfig, DwHeuristic};
use u_dwsearch::model::{MasterProblem, ObjectiveSense, SimpleMipSolver};
use u_dwsearch::partition::{PartitionConfig, Partitioner};

// ===========================================================================
// Synthetic problem
// ===========================================================================

fn block_angular(blocks: usize, size: usize, seed: u64) -> MasterProblem {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut p = MasterProblem::new(ObjectiveSense::Minimize);
    let link = p.add_row(f64::NEG_INFINITY, (blocks * 2) as f64);
    let locals: Vec<usize> = (0..blocks).map(|_| p.add_row(f64::NEG_INFINITY, 3.0)).collect();
    for &local in &locals {
        for _ in 0..size {
            let cost = -rng.random_range(1.0..10.0);
            p.add_column(cost, 0.0, 1.0, true, &[(local, 1.0), (link, 1.0)])
                .expect("valid column");
        }
    }
    p
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    group.sample_size(10);

    for &(blocks, size) in &[(4usize, 25usize), (16, 25), (64, 25)] {
        let problem = block_angular(blocks, size, 42);
        let config = PartitionConfig::default();
        group.bench_with_input(
            BenchmarkId::new(format!("b{}_s{}", blocks, size), blocks),
            &(problem, config),
            |b, (p, c)| {
                b.iter(|| {
                    let structure = Partitioner::find_structure(black_box(p), black_box(c));
                    black_box(structure)
                })
            },
        );
    }
    group.finish();
}

fn bench_heuristic(c: &mut Criterion) {
    let mut group = c.benchmark_group("dw_heuristic");
    group.sample_size(10);

    for &blocks in &[2usize, 4, 8] {
        let problem = block_angular(blocks, 8, 7);
        let config = DwConfig::default().with_seed(42);
        group.bench_with_input(
            BenchmarkId::from_parameter(blocks),
            &(problem, config),
            |b, (p, c)| {
                b.iter(|| {
                    let n = p.num_columns();
                    let mut dw = DwHeuristic::new(SimpleMipSolver::new(p.clone()), c.clone())
                        .expect("valid heuristic");
                    dw.pass_in_solution(&vec![0.0; n]).expect("zero start");
                    let mut objective = 0.0;
                    let mut solution = vec![0.0; n];
                    for _ in 0..5 {
                        dw.run(&mut objective, &mut solution);
                    }
                    black_box(objective)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_partition, bench_heuristic);
criterion_main!(benches);
