// engine/mod.rs
pub mod shared;
pub mod traffic_network;
