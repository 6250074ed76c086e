use crate::network::intersection::IntersectionId;
use serde::{Deserialize, Serialize};

/// Represents a vehicle with a planned route through the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: u32,
    /// First intersection of the route given at registration.
    pub origin: Option<IntersectionId>,
    /// Last intersection of the route given at registration.
    pub destination: Option<IntersectionId>,
    /// Current route. Replaced wholesale on recalculation and left empty
    /// while no open route exists.
    pub route: Vec<IntersectionId>,
    /// Emergency vehicles hold signal overrides along their route.
    pub is_emergency: bool,
}

impl Vehicle {
    pub fn new(id: u32, route: Vec<IntersectionId>) -> Self {
        Self {
            id,
            origin: route.first().copied(),
            destination: route.last().copied(),
            route,
            is_emergency: false,
        }
    }

    pub fn emergency(id: u32, route: Vec<IntersectionId>) -> Self {
        Self {
            is_emergency: true,
            ..Self::new(id, route)
        }
    }

    /// A vehicle moves only along routes with at least one road.
    pub fn has_active_route(&self) -> bool {
        self.route.len() >= 2
    }
}
