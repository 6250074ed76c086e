//! Road-network routing engine for a small city: intersections and roads in a
//! weighted graph, shortest routes under closures and congestion, and traffic
//! signal timing that follows measured load.

pub mod communication;
pub mod config;
pub mod control_system;
pub mod engine;
pub mod error;
pub mod flow_analyzer;
pub mod global_variables;
pub mod network;
pub mod shared_data;

pub use config::EngineConfig;
pub use engine::shared::SharedNetwork;
pub use engine::traffic_network::TrafficNetwork;
pub use error::{NetworkError, Result};
pub use network::intersection::IntersectionId;
pub use network::route_generation::Path;
