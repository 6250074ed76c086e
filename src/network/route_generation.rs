// route_generation.rs
//
// Shortest-route search over the road network. Dijkstra's algorithm with a
// binary-heap frontier; closed roads are invisible to the search but stay in
// storage. The search is written against the `RoadGraph` capability so any
// adjacency representation (per-node lists, dense matrix, snapshot) can be
// searched the same way.

use crate::error::{NetworkError, Result};
use crate::network::intersection::IntersectionId;
use crate::network::store::RoadNetwork;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Read access needed by the shortest-route search.
pub trait RoadGraph {
    fn has_intersection(&self, id: IntersectionId) -> bool;

    /// Calls `visit(to, weight)` for every open road leaving `from`.
    fn for_each_open_road<F: FnMut(IntersectionId, u32)>(&self, from: IntersectionId, visit: F);
}

impl RoadGraph for RoadNetwork {
    fn has_intersection(&self, id: IntersectionId) -> bool {
        self.contains(id)
    }

    fn for_each_open_road<F: FnMut(IntersectionId, u32)>(&self, from: IntersectionId, mut visit: F) {
        if let Some(intersection) = self.get(from) {
            for road in intersection.roads().iter().filter(|road| road.is_open()) {
                visit(road.to, road.weight);
            }
        }
    }
}

/// An ordered route and its total weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub nodes: Vec<IntersectionId>,
    pub distance: u64,
}

impl Path {
    pub fn source(&self) -> Option<IntersectionId> {
        self.nodes.first().copied()
    }

    pub fn destination(&self) -> Option<IntersectionId> {
        self.nodes.last().copied()
    }

    /// Consecutive `(from, to)` pairs along the route.
    pub fn legs(&self) -> impl Iterator<Item = (IntersectionId, IntersectionId)> + '_ {
        self.nodes.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

/// Computes the cheapest open route from `src` to `dest`.
///
/// Returns `Ok(None)` when `dest` cannot be reached; that is an ordinary
/// outcome, distinct from the `UnknownEndpoint` error raised when either
/// endpoint is missing. Equal-cost candidates are settled by ascending
/// intersection id, so results are reproducible.
pub fn shortest_path<G: RoadGraph>(
    graph: &G,
    src: IntersectionId,
    dest: IntersectionId,
) -> Result<Option<Path>> {
    shortest_path_excluding(graph, src, dest, |_, _| false)
}

/// Like [`shortest_path`], but additionally ignores every road for which
/// `skip(from, to)` returns true.
pub fn shortest_path_excluding<G, S>(
    graph: &G,
    src: IntersectionId,
    dest: IntersectionId,
    skip: S,
) -> Result<Option<Path>>
where
    G: RoadGraph,
    S: Fn(IntersectionId, IntersectionId) -> bool,
{
    for endpoint in [src, dest] {
        if !graph.has_intersection(endpoint) {
            return Err(NetworkError::UnknownEndpoint(endpoint));
        }
    }

    let mut dist: HashMap<IntersectionId, u64> = HashMap::new();
    let mut came_from: HashMap<IntersectionId, IntersectionId> = HashMap::new();
    let mut frontier = BinaryHeap::new();

    dist.insert(src, 0);
    frontier.push(Reverse((0u64, src)));

    while let Some(Reverse((cost, current))) = frontier.pop() {
        if current == dest {
            break;
        }
        // Stale entry, a cheaper one was already settled.
        if dist.get(&current).is_some_and(|&best| cost > best) {
            continue;
        }

        graph.for_each_open_road(current, |next, weight| {
            if skip(current, next) {
                return;
            }
            let candidate = cost + u64::from(weight);
            let improves = dist.get(&next).map_or(true, |&best| candidate < best);
            if improves {
                dist.insert(next, candidate);
                came_from.insert(next, current);
                frontier.push(Reverse((candidate, next)));
            }
        });
    }

    let Some(&distance) = dist.get(&dest) else {
        log::debug!("No open route from {} to {}", src, dest);
        return Ok(None);
    };

    // Walk predecessor links back from the destination.
    let mut nodes = vec![dest];
    let mut cursor = dest;
    while let Some(&previous) = came_from.get(&cursor) {
        if cursor == src {
            break;
        }
        nodes.push(previous);
        cursor = previous;
    }
    nodes.reverse();

    if nodes.first() != Some(&src) || (nodes.len() == 1 && nodes[0] != src) {
        log::debug!("Discarding route to {} that does not start at {}", dest, src);
        return Ok(None);
    }

    log::debug!("Route {} -> {} costs {} over {} node(s)", src, dest, distance, nodes.len());
    Ok(Some(Path { nodes, distance }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: IntersectionId = IntersectionId(1);
    const B: IntersectionId = IntersectionId(2);
    const C: IntersectionId = IntersectionId(3);
    const D: IntersectionId = IntersectionId(4);

    /// Dense adjacency matrix view, `None` where no open road exists.
    struct MatrixGraph {
        weights: Vec<Vec<Option<u32>>>,
    }

    impl RoadGraph for MatrixGraph {
        fn has_intersection(&self, id: IntersectionId) -> bool {
            (id.0 as usize) < self.weights.len()
        }

        fn for_each_open_road<F: FnMut(IntersectionId, u32)>(&self, from: IntersectionId, mut visit: F) {
            for (to, weight) in self.weights[from.0 as usize].iter().enumerate() {
                if let Some(weight) = weight {
                    visit(IntersectionId(to as u32), *weight);
                }
            }
        }
    }

    fn diamond() -> RoadNetwork {
        let mut network = RoadNetwork::new();
        for id in [A, B, C, D] {
            network.add_intersection(id).unwrap();
        }
        network.add_road(A, B, 4, false).unwrap();
        network.add_road(A, C, 2, false).unwrap();
        network.add_road(C, B, 1, false).unwrap();
        network.add_road(B, D, 5, false).unwrap();
        network.add_road(C, D, 8, false).unwrap();
        network
    }

    #[test]
    fn picks_cheapest_route() {
        let path = shortest_path(&diamond(), A, D).unwrap().unwrap();
        assert_eq!(path.nodes, vec![A, C, B, D]);
        assert_eq!(path.distance, 8);
        assert_eq!(path.legs().collect::<Vec<_>>(), vec![(A, C), (C, B), (B, D)]);
    }

    #[test]
    fn closed_roads_are_skipped() {
        let mut network = diamond();
        network.close_road(C, B).unwrap();
        let path = shortest_path(&network, A, D).unwrap().unwrap();
        assert_eq!(path.nodes, vec![A, B, D]);
        assert_eq!(path.distance, 9);
    }

    #[test]
    fn unreachable_destination_is_none() {
        let mut network = diamond();
        network.close_road(A, B).unwrap();
        network.close_road(A, C).unwrap();
        assert_eq!(shortest_path(&network, A, D).unwrap(), None);
        // Roads are one-way, nothing leads back to A.
        assert_eq!(shortest_path(&diamond(), D, A).unwrap(), None);
    }

    #[test]
    fn unknown_endpoint_is_an_error() {
        let err = shortest_path(&diamond(), A, IntersectionId(99)).unwrap_err();
        assert!(matches!(err, NetworkError::UnknownEndpoint(IntersectionId(99))));
    }

    #[test]
    fn source_equal_to_destination() {
        let path = shortest_path(&diamond(), B, B).unwrap().unwrap();
        assert_eq!(path.nodes, vec![B]);
        assert_eq!(path.distance, 0);
    }

    #[test]
    fn ties_resolve_by_lowest_id() {
        let mut network = RoadNetwork::new();
        for id in [A, B, C, D] {
            network.add_intersection(id).unwrap();
        }
        // A -> C -> D and A -> B -> D both cost 2.
        network.add_road(A, C, 1, false).unwrap();
        network.add_road(A, B, 1, false).unwrap();
        network.add_road(C, D, 1, false).unwrap();
        network.add_road(B, D, 1, false).unwrap();
        for _ in 0..5 {
            let path = shortest_path(&network, A, D).unwrap().unwrap();
            assert_eq!(path.nodes, vec![A, B, D]);
        }
    }

    #[test]
    fn excluded_road_forces_detour() {
        let path = shortest_path_excluding(&diamond(), A, D, |from, to| from == C && to == B)
            .unwrap()
            .unwrap();
        assert_eq!(path.nodes, vec![A, B, D]);
    }

    #[test]
    fn matrix_and_list_views_agree() {
        // Same diamond, ids shifted to zero-based matrix indices.
        let mut weights = vec![vec![None; 5]; 5];
        weights[1][2] = Some(4);
        weights[1][3] = Some(2);
        weights[3][2] = Some(1);
        weights[2][4] = Some(5);
        weights[3][4] = Some(8);
        let matrix = MatrixGraph { weights };

        let from_matrix = shortest_path(&matrix, A, D).unwrap().unwrap();
        let from_lists = shortest_path(&diamond(), A, D).unwrap().unwrap();
        assert_eq!(from_matrix, from_lists);
    }
}
