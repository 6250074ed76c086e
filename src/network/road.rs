use crate::network::intersection::IntersectionId;
use serde::{Deserialize, Serialize};

/// Represents a directed road (edge) between two intersections.
/// A bidirectional road is stored as two `Road`s, one per direction, both
/// carrying `bidirectional = true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    /// Start intersection (node).
    pub from: IntersectionId,
    /// End intersection (node).
    pub to: IntersectionId,
    /// Travel cost.
    pub weight: u32,
    /// Closed roads stay in storage but are skipped by route searches.
    pub closed: bool,
    /// Weight updates, closures and removal apply to the reverse road too.
    pub bidirectional: bool,
}

impl Road {
    pub fn new(from: IntersectionId, to: IntersectionId, weight: u32, bidirectional: bool) -> Self {
        Self {
            from,
            to,
            weight,
            closed: false,
            bidirectional,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.closed
    }

    /// Returns true if `id` is either endpoint of the road.
    pub fn touches(&self, id: IntersectionId) -> bool {
        self.from == id || self.to == id
    }
}
