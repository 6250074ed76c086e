// benches/bench_shortest_path.rs
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use traffic_routing::{EngineConfig, IntersectionId, TrafficNetwork};

// Square grid of two-way streets with random weights. Roughly one road in
// twenty is closed so the search has to go around.
fn create_grid(side: u32, seed: u64) -> TrafficNetwork {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut network = TrafficNetwork::new(EngineConfig::default()).unwrap();
    let node = |row: u32, col: u32| IntersectionId(row * side + col);

    for row in 0..side {
        for col in 0..side {
            network.add_intersection(node(row, col)).unwrap();
        }
    }
    for row in 0..side {
        for col in 0..side {
            let mut neighbours = Vec::new();
            if col + 1 < side {
                neighbours.push(node(row, col + 1));
            }
            if row + 1 < side {
                neighbours.push(node(row + 1, col));
            }
            for next in neighbours {
                network
                    .add_road(node(row, col), next, rng.random_range(1..50), true)
                    .unwrap();
                if rng.random_bool(0.05) {
                    network.close_road(node(row, col), next).unwrap();
                }
            }
        }
    }
    network
}

fn bench_shortest_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("shortest_path");
    group.measurement_time(Duration::from_secs(5));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    // Corner to corner on grids of 100, 900 and 2500 intersections.
    for &side in [10u32, 30, 50].iter() {
        let network = create_grid(side, 2024);
        let src = IntersectionId(0);
        let dest = IntersectionId(side * side - 1);

        group.bench_with_input(BenchmarkId::from_parameter(side * side), &side, |b, _| {
            b.iter(|| {
                let path = network.shortest_path(black_box(src), black_box(dest));
                black_box(path)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_shortest_path);
criterion_main!(benches);
