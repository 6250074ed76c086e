// network/mod.rs
pub mod intersection;
pub mod movement;
pub mod road;
pub mod route_generation;
pub mod store;
pub mod vehicles;
