// benches/diameter.rs - Cost of scoring one candidate at common sizes
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use maze_engine::generator::randomize;
use maze_engine::reachability::estimate_diameter;
use maze_engine::{Dimensions, Grid};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn bench_estimate_diameter(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate_diameter");
    group.sample_size(10);

    for (w, h, d) in [(32u64, 32u64, 1u64), (362, 362, 2), (1024, 1024, 4)] {
        let dims = Dimensions::new(w, h, d).expect("bench dimensions are valid");
        let mut grid = Grid::new(dims);
        randomize(&mut grid, &mut StdRng::seed_from_u64(42), 0.41);

        group.bench_with_input(BenchmarkId::from_parameter(dims), &grid, |b, grid| {
            b.iter(|| estimate_diameter(black_box(grid)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_estimate_diameter);
criterion_main!(benches);
