// src/engine/traffic_network.rs
//
// The engine facade. Owns the road store, the congestion counters, the signal
// controller and the registered vehicles, and keeps their derived state in
// step: every count change re-times the signals at both ends of the road, and
// removals purge the state that referred to the removed element.

use crate::communication::records::{
    ClosureRecord, RoadRecord, SignalTimingRecord, TrafficUpdateRecord, VehicleRecord,
};
use crate::config::EngineConfig;
use crate::control_system::traffic_light_controller::{SignalMode, TrafficLightController};
use crate::error::{NetworkError, Result};
use crate::flow_analyzer::congestion::{CongestionLevel, CongestionTracker};
use crate::network::intersection::{Intersection, IntersectionId, IntersectionRef};
use crate::network::movement::walk_route;
use crate::network::road::Road;
use crate::network::route_generation::{
    shortest_path, shortest_path_excluding, Path, RoadGraph,
};
use crate::network::store::RoadNetwork;
use crate::network::vehicles::Vehicle;
use crate::shared_data::{
    CongestionRow, RouteOutcome, RouteUpdate, SignalRow, TrafficSignal, TraversalReport,
};
use std::collections::{BTreeMap, BTreeSet};

/// Route for `vehicle` between its registered origin and destination, or
/// `None` when either endpoint is gone or no open route connects them.
pub(crate) fn plan_route<G: RoadGraph>(graph: &G, vehicle: &Vehicle) -> Option<Path> {
    let (Some(origin), Some(destination)) = (vehicle.origin, vehicle.destination) else {
        return None;
    };
    match shortest_path(graph, origin, destination) {
        Ok(path) => path,
        Err(err) => {
            log::warn!("Vehicle {} cannot be routed: {}", vehicle.id, err);
            None
        }
    }
}

pub struct TrafficNetwork {
    config: EngineConfig,
    roads: RoadNetwork,
    congestion: CongestionTracker,
    signals: TrafficLightController,
    vehicles: BTreeMap<u32, Vehicle>,
    /// Intersections each emergency vehicle currently holds in override.
    emergency_holds: BTreeMap<u32, BTreeSet<IntersectionId>>,
    /// Overrides set directly through `emergency_override`. They end only
    /// with `clear_override`.
    manual_overrides: BTreeSet<IntersectionId>,
}

impl TrafficNetwork {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            congestion: CongestionTracker::new(config.congestion_threshold),
            signals: TrafficLightController::new(&config),
            roads: RoadNetwork::new(),
            vehicles: BTreeMap::new(),
            emergency_holds: BTreeMap::new(),
            manual_overrides: BTreeSet::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn roads(&self) -> &RoadNetwork {
        &self.roads
    }

    pub fn congestion(&self) -> &CongestionTracker {
        &self.congestion
    }

    pub fn signals(&self) -> &TrafficLightController {
        &self.signals
    }

    pub fn revision(&self) -> u64 {
        self.roads.revision()
    }

    // --- Road network -----------------------------------------------------

    pub fn add_intersection(&mut self, id: IntersectionId) -> Result<()> {
        self.roads.add_intersection(id)?;
        self.signals.register(id);
        Ok(())
    }

    pub fn add_named_intersection(&mut self, id: IntersectionId, name: &str) -> Result<()> {
        self.roads.add_named_intersection(id, name)?;
        self.signals.register(id);
        Ok(())
    }

    /// Removes the intersection, every road touching it, its counters and its
    /// signal. Neighbours that lost a road are re-timed.
    pub fn remove_intersection(&mut self, id: IntersectionId) -> Result<()> {
        let neighbours = self.roads.remove_intersection(id)?;
        self.congestion.forget_intersection(id);
        self.signals.remove(id);
        for held in self.emergency_holds.values_mut() {
            held.remove(&id);
        }
        self.manual_overrides.remove(&id);
        self.retime_signals(&neighbours)
    }

    pub fn find_intersection<'a>(&self, key: impl Into<IntersectionRef<'a>>) -> Option<&Intersection> {
        self.roads.find_intersection(key)
    }

    pub fn add_road(
        &mut self,
        from: IntersectionId,
        to: IntersectionId,
        weight: u32,
        bidirectional: bool,
    ) -> Result<()> {
        self.roads.add_road(from, to, weight, bidirectional)
    }

    /// Removes the road (both directions when bidirectional) and its counters.
    pub fn remove_road(&mut self, from: IntersectionId, to: IntersectionId) -> Result<Road> {
        let removed = self.roads.remove_road(from, to)?;
        self.congestion.reset_count(from, to);
        if removed.bidirectional {
            self.congestion.reset_count(to, from);
        }
        self.retime_signals(&[from, to])?;
        Ok(removed)
    }

    pub fn update_road_weight(
        &mut self,
        from: IntersectionId,
        to: IntersectionId,
        new_weight: u32,
    ) -> Result<()> {
        self.roads.update_road_weight(from, to, new_weight)
    }

    pub fn close_road(&mut self, from: IntersectionId, to: IntersectionId) -> Result<()> {
        self.roads.close_road(from, to)
    }

    pub fn reopen_road(&mut self, from: IntersectionId, to: IntersectionId) -> Result<()> {
        self.roads.reopen_road(from, to)
    }

    pub fn to_edge_list(&self) -> String {
        self.roads.to_edge_list()
    }

    // --- Congestion -------------------------------------------------------

    pub fn record_traversal(&mut self, from: IntersectionId, to: IntersectionId) -> Result<u32> {
        self.require_road(from, to)?;
        let count = self.congestion.record_traversal(from, to);
        self.retime_signals(&[from, to])?;
        Ok(count)
    }

    /// Overwrites the vehicle count of a road, and of its mirror when the
    /// road is bidirectional.
    pub fn set_count(&mut self, from: IntersectionId, to: IntersectionId, value: u32) -> Result<()> {
        let bidirectional = self.require_road(from, to)?.bidirectional;
        self.congestion.set_count(from, to, value);
        if bidirectional {
            self.congestion.set_count(to, from, value);
        }
        self.retime_signals(&[from, to])
    }

    pub fn reset_count(&mut self, from: IntersectionId, to: IntersectionId) -> Result<()> {
        let bidirectional = self.require_road(from, to)?.bidirectional;
        self.congestion.reset_count(from, to);
        if bidirectional {
            self.congestion.reset_count(to, from);
        }
        self.retime_signals(&[from, to])
    }

    /// Clears every counter and returns all signals to their base timing.
    pub fn reset_all_counts(&mut self) -> Result<()> {
        self.congestion.reset_all();
        let all: Vec<IntersectionId> = self.roads.intersections().iter().map(|i| i.id).collect();
        self.retime_signals(&all)
    }

    pub fn congestion_level(&self, from: IntersectionId, to: IntersectionId) -> CongestionLevel {
        self.congestion.congestion_level(from, to)
    }

    pub fn congested_roads(&self) -> Vec<(IntersectionId, IntersectionId)> {
        self.congestion.congested_roads()
    }

    /// Adds `count / weight_divisor` to the road's weight so later searches
    /// steer away from it. Each call adds again; nothing is reset.
    /// Returns the new weight.
    pub fn adjust_weight_for_congestion(
        &mut self,
        from: IntersectionId,
        to: IntersectionId,
    ) -> Result<u32> {
        let weight = self.require_road(from, to)?.weight;
        let increase = self.congestion.count(from, to) / self.config.weight_divisor;
        let adjusted = weight.saturating_add(increase);
        if increase > 0 {
            self.roads.update_road_weight(from, to, adjusted)?;
        }
        Ok(adjusted)
    }

    pub fn congestion_table(&self) -> Vec<CongestionRow> {
        self.congestion.congestion_table()
    }

    /// Total vehicles counted on roads entering or leaving `id`.
    pub fn vehicle_density(&self, id: IntersectionId) -> u32 {
        self.congestion.incident_count(id)
    }

    // --- Signals ----------------------------------------------------------

    pub fn emergency_override(&mut self, id: IntersectionId) -> Result<()> {
        self.signals.emergency_override(id)?;
        self.manual_overrides.insert(id);
        Ok(())
    }

    pub fn clear_override(&mut self, id: IntersectionId) -> Result<u32> {
        let density = self.vehicle_density(id);
        let green = self.signals.clear_override(id, density)?;
        self.manual_overrides.remove(&id);
        Ok(green)
    }

    pub fn adjust_duration(&mut self, id: IntersectionId) -> Result<u32> {
        let density = self.vehicle_density(id);
        self.signals.adjust_duration(id, density)
    }

    pub fn set_signal_timing(&mut self, id: IntersectionId, duration: u32) -> Result<u32> {
        let density = self.vehicle_density(id);
        self.signals.set_signal_timing(id, duration, density)
    }

    pub fn signal_mode(&self, id: IntersectionId) -> Option<SignalMode> {
        self.signals.mode(id)
    }

    pub fn rank_for_management(&self) -> Vec<TrafficSignal> {
        self.signals
            .rank_for_management(|id| self.congestion.incident_count(id))
    }

    pub fn signal_table(&self) -> Vec<SignalRow> {
        self.signals.signal_table()
    }

    // --- Routing ----------------------------------------------------------

    /// `Ok(None)` when no open route exists.
    pub fn shortest_path(&self, src: IntersectionId, dest: IntersectionId) -> Result<Option<Path>> {
        shortest_path(&self.roads, src, dest)
    }

    /// Like `shortest_path`, but an unreachable destination is an error.
    pub fn route_between(&self, src: IntersectionId, dest: IntersectionId) -> Result<Path> {
        self.shortest_path(src, dest)?
            .ok_or(NetworkError::NoPath { from: src, to: dest })
    }

    /// Alternative route from `from` to `to` that avoids the direct road
    /// between them, for traffic diverted off a congested road. The store is
    /// not modified.
    pub fn reroute_around(&self, from: IntersectionId, to: IntersectionId) -> Result<Option<Path>> {
        self.require_road(from, to)?;
        log::info!("Rerouting traffic around congested road {} -> {}", from, to);
        shortest_path_excluding(&self.roads, from, to, |a, b| a == from && b == to)
    }

    // --- Vehicles ---------------------------------------------------------

    pub fn register_vehicle(&mut self, id: u32, route: Vec<IntersectionId>) -> Result<()> {
        self.insert_vehicle(Vehicle::new(id, route))
    }

    /// Registers a vehicle and puts every signal on its route into
    /// emergency override until the vehicle is released.
    pub fn register_emergency_vehicle(&mut self, id: u32, route: Vec<IntersectionId>) -> Result<()> {
        let vehicle = Vehicle::emergency(id, route);
        let held: BTreeSet<IntersectionId> = vehicle.route.iter().copied().collect();
        self.insert_vehicle(vehicle)?;
        self.hold_overrides(id, held)
    }

    /// Ends an emergency vehicle's priority. Overrides still held by other
    /// emergency vehicles, or set directly with `emergency_override`, stay in
    /// place.
    pub fn release_emergency_vehicle(&mut self, id: u32) -> Result<()> {
        let vehicle = self
            .vehicles
            .get_mut(&id)
            .ok_or(NetworkError::VehicleNotFound(id))?;
        vehicle.is_emergency = false;

        let released = self.emergency_holds.remove(&id).unwrap_or_default();
        self.release_holds(released)
    }

    pub fn vehicle(&self, id: u32) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Replaces the vehicle's route with the current shortest route between
    /// its registered origin and destination. Without one, the route is left
    /// empty and `NoRoute` is reported.
    pub fn recalculate_route(&mut self, id: u32) -> Result<RouteOutcome> {
        let vehicle = self
            .vehicles
            .get(&id)
            .ok_or(NetworkError::VehicleNotFound(id))?;
        let path = plan_route(&self.roads, vehicle);
        self.install_route(id, path)
    }

    /// Recalculates every registered vehicle, in id order.
    pub fn recalculate_all_routes(&mut self) -> Result<Vec<RouteUpdate>> {
        let ids: Vec<u32> = self.vehicles.keys().copied().collect();
        let mut updates = Vec::with_capacity(ids.len());
        for vehicle_id in ids {
            let outcome = self.recalculate_route(vehicle_id)?;
            updates.push(RouteUpdate { vehicle_id, outcome });
        }
        Ok(updates)
    }

    /// Walks the vehicle's route, counting one traversal per road and
    /// reporting each road's congestion level.
    pub fn track_movement(&mut self, id: u32) -> Result<Vec<TraversalReport>> {
        let vehicle = self
            .vehicles
            .get(&id)
            .ok_or(NetworkError::VehicleNotFound(id))?;
        let reports = walk_route(&vehicle.route, &self.roads, &mut self.congestion)?;
        if reports.is_empty() {
            return Ok(reports);
        }

        let touched: BTreeSet<IntersectionId> = reports
            .iter()
            .flat_map(|leg| [leg.from, leg.to])
            .collect();
        let touched: Vec<IntersectionId> = touched.into_iter().collect();
        self.retime_signals(&touched)?;

        if self.config.adjust_weights_on_traversal {
            for leg in &reports {
                self.adjust_weight_for_congestion(leg.from, leg.to)?;
            }
        }
        Ok(reports)
    }

    /// Tracks every registered vehicle in id order. A vehicle whose stored
    /// route has gone stale reports its own error; the others still move.
    pub fn track_all_movements(&mut self) -> Vec<(u32, Result<Vec<TraversalReport>>)> {
        let ids: Vec<u32> = self.vehicles.keys().copied().collect();
        ids.into_iter()
            .map(|id| (id, self.track_movement(id)))
            .collect()
    }

    /// Applies a batch of weight updates, then recalculates every vehicle.
    /// All roads are checked first; a missing one fails the batch untouched.
    pub fn apply_traffic_update(&mut self, updates: &[TrafficUpdateRecord]) -> Result<Vec<RouteUpdate>> {
        for update in updates {
            self.require_road(update.from, update.to)?;
        }
        for update in updates {
            self.roads
                .update_road_weight(update.from, update.to, update.weight)?;
        }
        self.recalculate_all_routes()
    }

    // --- Record ingestion -------------------------------------------------

    /// Adds a directed road, creating missing endpoints. A duplicate road is
    /// rejected before any endpoint is created.
    pub fn ingest_road(&mut self, record: &RoadRecord) -> Result<()> {
        if self.roads.road(record.from, record.to).is_some() {
            return Err(NetworkError::DuplicateEdge {
                from: record.from,
                to: record.to,
            });
        }
        for endpoint in [record.from, record.to] {
            if !self.roads.contains(endpoint) {
                self.add_intersection(endpoint)?;
            }
        }
        self.add_road(record.from, record.to, record.weight, false)
    }

    pub fn ingest_closure(&mut self, record: &ClosureRecord) -> Result<()> {
        self.close_road(record.from, record.to)
    }

    pub fn ingest_vehicle(&mut self, record: &VehicleRecord) -> Result<()> {
        self.register_vehicle(record.id, record.route.clone())
    }

    pub fn ingest_emergency_vehicle(&mut self, record: &VehicleRecord) -> Result<()> {
        self.register_emergency_vehicle(record.id, record.route.clone())
    }

    pub fn ingest_signal_timing(&mut self, record: &SignalTimingRecord) -> Result<()> {
        self.set_signal_timing(record.intersection, record.duration)?;
        Ok(())
    }

    // --- Internals ----------------------------------------------------------

    pub(crate) fn vehicle_endpoints(&self) -> Vec<Vehicle> {
        self.vehicles.values().cloned().collect()
    }

    /// Stores a freshly planned route. Emergency vehicles move their
    /// overrides to the new route.
    pub(crate) fn install_route(&mut self, id: u32, path: Option<Path>) -> Result<RouteOutcome> {
        let vehicle = self
            .vehicles
            .get_mut(&id)
            .ok_or(NetworkError::VehicleNotFound(id))?;

        let outcome = match path {
            Some(path) => {
                vehicle.route = path.nodes.clone();
                log::info!("Updated route for vehicle {}: {:?}", id, path.nodes);
                RouteOutcome::Updated(path)
            }
            None => {
                vehicle.route.clear();
                log::warn!("No valid route found for vehicle {}", id);
                RouteOutcome::NoRoute
            }
        };

        if vehicle.is_emergency {
            let held: BTreeSet<IntersectionId> = vehicle.route.iter().copied().collect();
            self.hold_overrides(id, held)?;
        }
        Ok(outcome)
    }

    fn insert_vehicle(&mut self, vehicle: Vehicle) -> Result<()> {
        if self.vehicles.contains_key(&vehicle.id) {
            return Err(NetworkError::DuplicateEntity(format!("vehicle {}", vehicle.id)));
        }
        if let Some(&missing) = vehicle.route.iter().find(|&&node| !self.roads.contains(node)) {
            return Err(NetworkError::UnknownEndpoint(missing));
        }
        log::info!("Vehicle {} registered with route {:?}", vehicle.id, vehicle.route);
        self.vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    /// Makes `intersections` the full set held by emergency vehicle `id`.
    /// Intersections it no longer holds are released.
    fn hold_overrides(&mut self, id: u32, intersections: BTreeSet<IntersectionId>) -> Result<()> {
        for &intersection in &intersections {
            if self.signals.mode(intersection) != Some(SignalMode::EmergencyOverride) {
                self.signals.emergency_override(intersection)?;
            }
        }
        let previous = self
            .emergency_holds
            .insert(id, intersections)
            .unwrap_or_default();
        let dropped: BTreeSet<IntersectionId> = match self.emergency_holds.get(&id) {
            Some(current) => previous.difference(current).copied().collect(),
            None => previous,
        };
        self.release_holds(dropped)
    }

    /// Returns each intersection to density timing unless another holder
    /// still keeps it in override.
    fn release_holds(&mut self, intersections: BTreeSet<IntersectionId>) -> Result<()> {
        for intersection in intersections {
            let still_held = self.manual_overrides.contains(&intersection)
                || self
                    .emergency_holds
                    .values()
                    .any(|held| held.contains(&intersection));
            if !still_held && self.signals.signal(intersection).is_some() {
                let density = self.vehicle_density(intersection);
                self.signals.clear_override(intersection, density)?;
            }
        }
        Ok(())
    }

    fn require_road(&self, from: IntersectionId, to: IntersectionId) -> Result<&Road> {
        self.roads
            .road(from, to)
            .ok_or(NetworkError::RoadNotFound { from, to })
    }

    /// Re-times the signals of `intersections` from their current density.
    fn retime_signals(&mut self, intersections: &[IntersectionId]) -> Result<()> {
        for &id in intersections {
            if self.signals.signal(id).is_some() {
                let density = self.congestion.incident_count(id);
                self.signals.adjust_duration(id, density)?;
            }
        }
        Ok(())
    }
}
