use crate::error::{NetworkError, Result};
use crate::flow_analyzer::congestion::CongestionTracker;
use crate::network::intersection::IntersectionId;
use crate::network::store::RoadNetwork;
use crate::shared_data::TraversalReport;

/// Walks a route road by road, counting one traversal per road and reporting
/// the congestion status of each road as the vehicle passes.
///
/// # Behavior
///
/// - Routes with fewer than two intersections produce an empty report.
/// - Every road along the route is looked up before anything is counted; if
///   one is missing the walk fails with `RoadNotFound` and no counter moves.
/// - Closed roads are still counted: a stored route may predate a closure.
pub fn walk_route(
    route: &[IntersectionId],
    network: &RoadNetwork,
    tracker: &mut CongestionTracker,
) -> Result<Vec<TraversalReport>> {
    if route.len() < 2 {
        return Ok(Vec::new());
    }

    let legs: Vec<(IntersectionId, IntersectionId)> =
        route.windows(2).map(|pair| (pair[0], pair[1])).collect();

    if let Some(&(from, to)) = legs
        .iter()
        .find(|(from, to)| network.road(*from, *to).is_none())
    {
        return Err(NetworkError::RoadNotFound { from, to });
    }

    Ok(legs
        .into_iter()
        .map(|(from, to)| {
            let count = tracker.record_traversal(from, to);
            TraversalReport {
                from,
                to,
                count,
                level: tracker.congestion_level(from, to),
            }
        })
        .collect())
}
