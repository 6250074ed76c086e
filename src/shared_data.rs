// src/shared_data.rs

use crate::control_system::traffic_light_controller::SignalMode;
use crate::flow_analyzer::congestion::CongestionLevel;
use crate::network::intersection::IntersectionId;
use crate::network::route_generation::Path;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One row of the congestion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CongestionRow {
    pub from: IntersectionId,
    pub to: IntersectionId,
    pub count: u32,
    pub level: CongestionLevel,
}

/// One row of the signal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRow {
    pub intersection: IntersectionId,
    pub green_secs: u32,
    pub mode: SignalMode,
}

/// Snapshot used only while ranking intersections for signal management.
/// Ordered by density, then by lower id first, so a max-heap pops the
/// busiest intersection first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSignal {
    pub intersection: IntersectionId,
    pub green_secs: u32,
    pub vehicle_density: u32,
}

impl Ord for TrafficSignal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.vehicle_density
            .cmp(&other.vehicle_density)
            .then_with(|| other.intersection.cmp(&self.intersection))
            .then_with(|| self.green_secs.cmp(&other.green_secs))
    }
}

impl PartialOrd for TrafficSignal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Status of one road as a tracked vehicle passes over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalReport {
    pub from: IntersectionId,
    pub to: IntersectionId,
    pub count: u32,
    pub level: CongestionLevel,
}

/// Result of recalculating one vehicle's route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteOutcome {
    Updated(Path),
    /// No open route exists; the vehicle's route is now empty.
    NoRoute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteUpdate {
    pub vehicle_id: u32,
    pub outcome: RouteOutcome,
}
