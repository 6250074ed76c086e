use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use traffic_routing::flow_analyzer::CongestionLevel;
use traffic_routing::shared_data::RouteOutcome;
use traffic_routing::{EngineConfig, IntersectionId, NetworkError, TrafficNetwork};

const A: IntersectionId = IntersectionId(1);
const B: IntersectionId = IntersectionId(2);
const C: IntersectionId = IntersectionId(3);
const D: IntersectionId = IntersectionId(4);

fn city() -> TrafficNetwork {
    let mut network = TrafficNetwork::new(EngineConfig::default()).unwrap();
    for (id, name) in [(A, "A"), (B, "B"), (C, "C"), (D, "D")] {
        network.add_named_intersection(id, name).unwrap();
    }
    network.add_road(A, B, 4, false).unwrap();
    network.add_road(A, C, 2, false).unwrap();
    network.add_road(C, B, 1, false).unwrap();
    network.add_road(B, D, 5, false).unwrap();
    network.add_road(C, D, 8, false).unwrap();
    network
}

/// Random directed network with some closed roads.
fn random_network(rng: &mut StdRng, nodes: u32) -> TrafficNetwork {
    let mut network = TrafficNetwork::new(EngineConfig::default()).unwrap();
    for raw in 0..nodes {
        network.add_intersection(IntersectionId(raw)).unwrap();
    }
    for from in 0..nodes {
        for to in 0..nodes {
            if from != to && rng.random_bool(0.3) {
                let weight = rng.random_range(0..20);
                network
                    .add_road(IntersectionId(from), IntersectionId(to), weight, false)
                    .unwrap();
                if rng.random_bool(0.15) {
                    network.close_road(IntersectionId(from), IntersectionId(to)).unwrap();
                }
            }
        }
    }
    network
}

/// Reference all-pairs distances over open roads.
fn floyd_warshall(network: &TrafficNetwork, nodes: u32) -> Vec<Vec<Option<u64>>> {
    let n = nodes as usize;
    let mut dist = vec![vec![None; n]; n];
    for (i, row) in dist.iter_mut().enumerate() {
        row[i] = Some(0);
    }
    for road in network.roads().roads() {
        if road.is_open() {
            let (f, t) = (road.from.0 as usize, road.to.0 as usize);
            let w = u64::from(road.weight);
            if dist[f][t].map_or(true, |d| w < d) {
                dist[f][t] = Some(w);
            }
        }
    }
    for k in 0..n {
        for i in 0..n {
            for j in 0..n {
                if let (Some(ik), Some(kj)) = (dist[i][k], dist[k][j]) {
                    if dist[i][j].map_or(true, |d| ik + kj < d) {
                        dist[i][j] = Some(ik + kj);
                    }
                }
            }
        }
    }
    dist
}

#[test]
fn scenario_cheapest_route() {
    let network = city();
    let path = network.shortest_path(A, D).unwrap().unwrap();
    assert_eq!(path.nodes, vec![A, C, B, D]);
    assert_eq!(path.distance, 2 + 1 + 5);
}

#[test]
fn scenario_closure_diverts_route() {
    let mut network = city();
    network.close_road(C, B).unwrap();
    let path = network.shortest_path(A, D).unwrap().unwrap();
    assert_eq!(path.nodes, vec![A, B, D]);
    assert_eq!(path.distance, 9);
}

#[test]
fn scenario_all_exits_closed() {
    let mut network = city();
    network.close_road(A, B).unwrap();
    network.close_road(A, C).unwrap();
    assert_eq!(network.shortest_path(A, D).unwrap(), None);

    let err = network.route_between(A, D).unwrap_err();
    assert!(err.is_no_path());
}

#[test]
fn scenario_tracked_vehicle_sees_congestion() {
    let mut network = city();
    network.register_vehicle(1, vec![A, B, D]).unwrap();
    network.set_count(A, B, 15).unwrap();

    let report = network.track_movement(1).unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!((report[0].from, report[0].to), (A, B));
    assert_eq!(report[0].level, CongestionLevel::Congested);
    assert_eq!(report[1].level, CongestionLevel::Normal);
}

#[test]
fn lookup_by_name_after_removal() {
    let mut network = city();
    network.remove_intersection(B).unwrap();
    assert!(network.find_intersection("B").is_none());
    assert!(network.find_intersection(B).is_none());
    assert!(network.roads().roads().iter().all(|road| !road.touches(B)));
    assert_eq!(network.shortest_path(A, D).unwrap().unwrap().nodes, vec![A, C, D]);
}

#[test]
fn vehicle_loses_route_when_endpoint_is_removed() {
    let mut network = city();
    network.register_vehicle(4, vec![A, B, D]).unwrap();
    network.remove_intersection(D).unwrap();
    assert_eq!(network.recalculate_route(4).unwrap(), RouteOutcome::NoRoute);
    assert!(network.track_movement(4).unwrap().is_empty());
}

#[test]
fn failed_operations_leave_network_unchanged() {
    let mut network = city();
    let before = network.to_edge_list();
    let revision = network.revision();

    assert!(matches!(network.add_road(A, B, 1, false), Err(NetworkError::DuplicateEdge { .. })));
    assert!(matches!(network.add_road(A, IntersectionId(50), 1, true), Err(NetworkError::UnknownEndpoint(_))));
    assert!(matches!(network.reopen_road(D, A), Err(NetworkError::RoadNotFound { .. })));
    assert!(matches!(network.add_intersection(C), Err(NetworkError::DuplicateEntity(_))));

    assert_eq!(network.to_edge_list(), before);
    assert_eq!(network.revision(), revision);
}

#[test]
fn random_paths_are_valid_and_optimal() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..20 {
        let nodes = 12;
        let network = random_network(&mut rng, nodes);
        let reference = floyd_warshall(&network, nodes);

        for s in 0..nodes {
            for d in 0..nodes {
                let (src, dest) = (IntersectionId(s), IntersectionId(d));
                let found = network.shortest_path(src, dest).unwrap();
                assert_eq!(
                    found.as_ref().map(|path| path.distance),
                    reference[s as usize][d as usize],
                    "distance {} -> {}",
                    s,
                    d
                );

                if let Some(path) = found {
                    assert_eq!(path.source(), Some(src));
                    assert_eq!(path.destination(), Some(dest));
                    let mut total = 0u64;
                    for (from, to) in path.legs() {
                        let road = network.roads().road(from, to).expect("route uses a stored road");
                        assert!(road.is_open());
                        total += u64::from(road.weight);
                    }
                    assert_eq!(total, path.distance);

                    let again = network.shortest_path(src, dest).unwrap().unwrap();
                    assert_eq!(again.distance, path.distance);
                }
            }
        }
    }
}

#[test]
fn closing_and_reopening_restores_distance() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let nodes = 10;
        let mut network = random_network(&mut rng, nodes);
        let src = IntersectionId(rng.random_range(0..nodes));
        let dest = IntersectionId(rng.random_range(0..nodes));
        if src == dest {
            continue;
        }
        let original = network.shortest_path(src, dest).unwrap().map(|p| p.distance);

        let closing: Vec<(IntersectionId, IntersectionId)> = network
            .roads()
            .roads()
            .iter()
            .filter(|road| road.to == dest && road.from != src && road.is_open())
            .map(|road| (road.from, road.to))
            .collect();
        for &(from, to) in &closing {
            network.close_road(from, to).unwrap();
        }
        if let Some(path) = network.shortest_path(src, dest).unwrap() {
            assert_eq!(path.nodes.len(), 2, "only the direct road may remain");
        }
        for &(from, to) in &closing {
            network.reopen_road(from, to).unwrap();
        }

        let restored = network.shortest_path(src, dest).unwrap().map(|p| p.distance);
        assert_eq!(restored, original);
    }
}

#[test]
fn counts_never_decrease_under_traversal() {
    let mut network = city();
    let mut last = 0;
    for _ in 0..30 {
        let count = network.record_traversal(B, D).unwrap();
        assert!(count >= last);
        last = count;
    }
    assert_eq!(network.congestion().count(B, D), 30);
    assert_eq!(network.congestion_level(B, D), CongestionLevel::Congested);
}

#[test]
fn removal_purges_random_intersections() {
    let mut rng = StdRng::seed_from_u64(7);
    let nodes = 15;
    let mut network = random_network(&mut rng, nodes);
    for raw in 0..nodes {
        if rng.random_bool(0.4) {
            network.remove_intersection(IntersectionId(raw)).unwrap();
            assert!(network.find_intersection(raw).is_none());
            assert!(network
                .roads()
                .roads()
                .iter()
                .all(|road| !road.touches(IntersectionId(raw))));
        }
    }
    assert_eq!(network.roads().road_count(), network.roads().roads().len());
}
