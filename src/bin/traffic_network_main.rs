// traffic_network_main.rs
//
// Loads a road network and its vehicles from a data directory, recalculates
// every route and prints the congestion and signal reports.
//
// Usage: traffic_network_main [DATA_DIR]

use std::path::{Path, PathBuf};

use traffic_routing::communication::records::{
    read_records, ClosureRecord, FromFields, RecordFormat, RoadRecord, SignalTimingRecord,
    TrafficUpdateRecord, VehicleRecord,
};
use traffic_routing::global_variables::{
    FILE_CLOSURES, FILE_CONFIG, FILE_EMERGENCY_VEHICLES, FILE_ROAD_NETWORK, FILE_SIGNAL_TIMINGS,
    FILE_TRAFFIC_UPDATES, FILE_VEHICLES,
};
use traffic_routing::shared_data::RouteOutcome;
use traffic_routing::{EngineConfig, Result, SharedNetwork, TrafficNetwork};

/// Reads one record file. Missing files yield no records; malformed lines are
/// reported and skipped.
fn load<T: FromFields>(dir: &Path, file: &str) -> Vec<T> {
    let path = dir.join(file);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(_) => {
            log::info!("{} not found, skipping", path.display());
            return Vec::new();
        }
    };
    read_records::<T, _>(text.as_bytes(), RecordFormat::detect(&text))
        .into_iter()
        .filter_map(|record| match record {
            Ok(record) => Some(record),
            Err(e) => {
                eprintln!("{}: {}", file, e);
                None
            }
        })
        .collect()
}

fn build_network(dir: &Path) -> Result<TrafficNetwork> {
    let config_path = dir.join(FILE_CONFIG);
    let config = if config_path.exists() {
        EngineConfig::from_json_file(&config_path)?
    } else {
        EngineConfig::default()
    };
    let mut network = TrafficNetwork::new(config)?;

    for record in load::<RoadRecord>(dir, FILE_ROAD_NETWORK) {
        if let Err(e) = network.ingest_road(&record) {
            eprintln!("Road {} -> {} skipped: {}", record.from, record.to, e);
        }
    }
    for record in load::<ClosureRecord>(dir, FILE_CLOSURES) {
        if let Err(e) = network.ingest_closure(&record) {
            eprintln!("Closure {} -> {} skipped: {}", record.from, record.to, e);
        }
    }
    for record in load::<SignalTimingRecord>(dir, FILE_SIGNAL_TIMINGS) {
        if let Err(e) = network.ingest_signal_timing(&record) {
            eprintln!("Signal timing for {} skipped: {}", record.intersection, e);
        }
    }
    for record in load::<VehicleRecord>(dir, FILE_VEHICLES) {
        if let Err(e) = network.ingest_vehicle(&record) {
            eprintln!("Vehicle {} skipped: {}", record.id, e);
        }
    }
    for record in load::<VehicleRecord>(dir, FILE_EMERGENCY_VEHICLES) {
        if let Err(e) = network.ingest_emergency_vehicle(&record) {
            eprintln!("Emergency vehicle {} skipped: {}", record.id, e);
        }
    }
    Ok(network)
}

fn print_network(network: &TrafficNetwork) {
    println!("Road network:");
    for intersection in network.roads().intersections() {
        let roads: Vec<String> = intersection
            .roads()
            .iter()
            .map(|road| {
                format!(
                    "({}, {}{})",
                    road.to,
                    road.weight,
                    if road.closed { ", closed" } else { "" }
                )
            })
            .collect();
        println!("  Node {}: {}", intersection.id, roads.join(" -> "));
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    println!("Loading traffic data from {}...", dir.display());

    let network = match build_network(&dir) {
        Ok(network) => network,
        Err(e) => {
            eprintln!("Failed to load network: {}", e);
            return;
        }
    };
    print_network(&network);

    let shared = SharedNetwork::new(network);
    match shared.recalculate_all_routes().await {
        Ok(updates) => {
            println!("\nRoutes:");
            for update in updates {
                match update.outcome {
                    RouteOutcome::Updated(path) => println!(
                        "  Vehicle {}: {:?} (cost {})",
                        update.vehicle_id, path.nodes, path.distance
                    ),
                    RouteOutcome::NoRoute => {
                        println!("  Vehicle {}: no valid route", update.vehicle_id)
                    }
                }
            }
        }
        Err(e) => eprintln!("Route recalculation failed: {}", e),
    }

    let updates = load::<TrafficUpdateRecord>(&dir, FILE_TRAFFIC_UPDATES);
    let result = shared.with_write(|network| {
        if !updates.is_empty() {
            match network.apply_traffic_update(&updates) {
                Ok(changed) => println!(
                    "\nApplied {} traffic update(s), {} route(s) recalculated",
                    updates.len(),
                    changed.len()
                ),
                Err(e) => eprintln!("\nTraffic updates rejected: {}", e),
            }
        }

        println!("\nVehicle movement:");
        for (id, tracked) in network.track_all_movements() {
            match tracked {
                Ok(legs) => {
                    let trail: Vec<String> = legs
                        .iter()
                        .map(|leg| format!("{} -> {} ({:?})", leg.from, leg.to, leg.level))
                        .collect();
                    println!("  Vehicle {}: {}", id, trail.join(", "));
                }
                Err(e) => eprintln!("  Vehicle {} not tracked: {}", id, e),
            }
        }
        Ok(())
    });
    if let Err(e) = result {
        eprintln!("Vehicle tracking failed: {}", e);
    }

    let report = shared.with_read(|network| {
        println!("\nRoad congestion levels:");
        for row in network.congestion_table() {
            println!("  {} -> {}: {} vehicles ({:?})", row.from, row.to, row.count, row.level);
        }
        println!("\nSignal management (busiest first):");
        for signal in network.rank_for_management() {
            println!(
                "  Intersection {}: green for {}s (vehicle density {})",
                signal.intersection, signal.green_secs, signal.vehicle_density
            );
        }
    });
    if let Err(e) = report {
        eprintln!("Report failed: {}", e);
    }
}
