use crate::network::road::Road;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable integer handle of an intersection. Handles are chosen by the caller
/// and stay valid until that intersection is removed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct IntersectionId(pub u32);

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for IntersectionId {
    fn from(raw: u32) -> Self {
        IntersectionId(raw)
    }
}

/// Lookup key accepted by `find_intersection`: either the integer handle or the
/// human-readable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionRef<'a> {
    Id(IntersectionId),
    Name(&'a str),
}

impl From<IntersectionId> for IntersectionRef<'_> {
    fn from(id: IntersectionId) -> Self {
        IntersectionRef::Id(id)
    }
}

impl From<u32> for IntersectionRef<'_> {
    fn from(raw: u32) -> Self {
        IntersectionRef::Id(IntersectionId(raw))
    }
}

impl<'a> From<&'a str> for IntersectionRef<'a> {
    fn from(name: &'a str) -> Self {
        IntersectionRef::Name(name)
    }
}

/// Represents a traffic intersection (node).
#[derive(Debug, Clone)]
pub struct Intersection {
    /// Unique identifier for the intersection.
    pub id: IntersectionId,
    /// Intersection name, unique across the network. Intersections added by
    /// id alone have none and are found by their id's decimal form.
    pub name: Option<String>,
    /// Outgoing roads, in insertion order.
    pub(crate) roads: Vec<Road>,
}

impl Intersection {
    pub fn new(id: IntersectionId, name: Option<String>) -> Self {
        Self {
            id,
            name,
            roads: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Outgoing roads, closed ones included.
    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub(crate) fn road_to(&self, to: IntersectionId) -> Option<&Road> {
        self.roads.iter().find(|road| road.to == to)
    }

    pub(crate) fn road_to_mut(&mut self, to: IntersectionId) -> Option<&mut Road> {
        self.roads.iter_mut().find(|road| road.to == to)
    }
}
