use crate::communication::records::{read_road_records, RecordFormat};
use crate::error::{NetworkError, Result};
use crate::network::intersection::{Intersection, IntersectionId, IntersectionRef};
use crate::network::road::Road;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Owns every intersection and road of the city.
///
/// Intersections live in a growable slot arena. Removing one frees its slot for
/// reuse without moving any other intersection, so outstanding handles of
/// unrelated intersections remain valid. Two indexes sit on top of the arena:
/// id → slot and name → id.
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    slots: Vec<Option<Intersection>>,
    free_slots: Vec<usize>,
    index: HashMap<IntersectionId, usize>,
    names: HashMap<String, IntersectionId>,
    road_count: usize,
    /// Bumped by every successful mutation.
    revision: u64,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unnamed intersection. Only an existing id can make this fail.
    pub fn add_intersection(&mut self, id: IntersectionId) -> Result<()> {
        self.insert_intersection(id, None)
    }

    pub fn add_named_intersection(
        &mut self,
        id: IntersectionId,
        name: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(NetworkError::DuplicateEntity(format!(
                "intersection name '{}'",
                name
            )));
        }
        self.insert_intersection(id, Some(name))
    }

    fn insert_intersection(&mut self, id: IntersectionId, name: Option<String>) -> Result<()> {
        if self.index.contains_key(&id) {
            return Err(NetworkError::DuplicateEntity(format!("intersection {}", id)));
        }

        let intersection = Intersection::new(id, name.clone());
        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.slots[slot] = Some(intersection);
                slot
            }
            None => {
                self.slots.push(Some(intersection));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
        if let Some(name) = name {
            self.names.insert(name, id);
        }
        self.revision += 1;
        log::info!("Intersection {} added (slot {})", id, slot);
        Ok(())
    }

    /// Removes an intersection together with every road that starts or ends
    /// there. Returns the neighbouring intersections that lost a road, sorted.
    ///
    /// Bidirectional mirrors are verified before anything is touched, so a
    /// broken mirror aborts the removal with the network unchanged.
    pub fn remove_intersection(&mut self, id: IntersectionId) -> Result<Vec<IntersectionId>> {
        let slot = *self
            .index
            .get(&id)
            .ok_or(NetworkError::IntersectionNotFound(id))?;

        let mut neighbours = Vec::new();
        for road in self.incident_roads(id) {
            if road.bidirectional && road.from != road.to {
                let (back_from, back_to) = (road.to, road.from);
                let mirrored = self
                    .road(back_from, back_to)
                    .map(|back| back.bidirectional)
                    .unwrap_or(false);
                if !mirrored {
                    return Err(NetworkError::InternalInconsistency(format!(
                        "bidirectional road {} -> {} has no mirror",
                        road.from, road.to
                    )));
                }
            }
            let other = if road.from == id { road.to } else { road.from };
            if other != id {
                neighbours.push(other);
            }
        }
        neighbours.sort();
        neighbours.dedup();

        let removed = self.slots[slot].take().ok_or_else(|| {
            NetworkError::InternalInconsistency(format!("slot {} of intersection {} is empty", slot, id))
        })?;
        let mut dropped_roads = removed.roads.len();
        for intersection in self.slots.iter_mut().flatten() {
            let before = intersection.roads.len();
            intersection.roads.retain(|road| road.to != id);
            dropped_roads += before - intersection.roads.len();
        }

        self.road_count -= dropped_roads;
        self.index.remove(&id);
        if let Some(name) = &removed.name {
            self.names.remove(name);
        }
        self.free_slots.push(slot);
        self.revision += 1;
        log::info!(
            "Intersection {} removed along with {} road(s)",
            id,
            dropped_roads
        );
        Ok(neighbours)
    }

    /// Adds a road. With `bidirectional` the reverse direction is created as
    /// well and the pair is kept in sync from then on. Self-loops are always
    /// stored one-way.
    pub fn add_road(
        &mut self,
        from: IntersectionId,
        to: IntersectionId,
        weight: u32,
        bidirectional: bool,
    ) -> Result<()> {
        for endpoint in [from, to] {
            if !self.index.contains_key(&endpoint) {
                return Err(NetworkError::UnknownEndpoint(endpoint));
            }
        }
        let bidirectional = bidirectional && from != to;

        if self.road(from, to).is_some() {
            return Err(NetworkError::DuplicateEdge { from, to });
        }
        if bidirectional && self.road(to, from).is_some() {
            return Err(NetworkError::DuplicateEdge { from: to, to: from });
        }

        self.intersection_mut(from)?
            .roads
            .push(Road::new(from, to, weight, bidirectional));
        self.road_count += 1;
        if bidirectional {
            self.intersection_mut(to)?
                .roads
                .push(Road::new(to, from, weight, true));
            self.road_count += 1;
        }
        self.revision += 1;
        log::info!(
            "Road {} -> {} added with weight {}{}",
            from,
            to,
            weight,
            if bidirectional { " (both ways)" } else { "" }
        );
        Ok(())
    }

    /// Removes a road (and its mirror when bidirectional). Returns the forward
    /// road as it was stored.
    pub fn remove_road(&mut self, from: IntersectionId, to: IntersectionId) -> Result<Road> {
        let mirrored = self.check_mirror(from, to)?;

        let source = self.intersection_mut(from)?;
        let position = source
            .roads
            .iter()
            .position(|road| road.to == to)
            .ok_or(NetworkError::RoadNotFound { from, to })?;
        let removed = source.roads.remove(position);
        self.road_count -= 1;

        if mirrored {
            let target = self.intersection_mut(to)?;
            target.roads.retain(|road| road.to != from);
            self.road_count -= 1;
        }
        self.revision += 1;
        log::info!("Road {} -> {} removed", from, to);
        Ok(removed)
    }

    pub fn update_road_weight(
        &mut self,
        from: IntersectionId,
        to: IntersectionId,
        new_weight: u32,
    ) -> Result<()> {
        self.modify_road(from, to, |road| road.weight = new_weight)?;
        log::info!("Road {} -> {} weight set to {}", from, to, new_weight);
        Ok(())
    }

    pub fn close_road(&mut self, from: IntersectionId, to: IntersectionId) -> Result<()> {
        self.modify_road(from, to, |road| road.closed = true)?;
        log::info!("Road {} -> {} closed", from, to);
        Ok(())
    }

    pub fn reopen_road(&mut self, from: IntersectionId, to: IntersectionId) -> Result<()> {
        self.modify_road(from, to, |road| road.closed = false)?;
        log::info!("Road {} -> {} reopened", from, to);
        Ok(())
    }

    /// Looks an intersection up by id or by name. A name that matches no
    /// named intersection is tried as the decimal id of an unnamed one.
    pub fn find_intersection<'a>(&self, key: impl Into<IntersectionRef<'a>>) -> Option<&Intersection> {
        match key.into() {
            IntersectionRef::Id(id) => self.get(id),
            IntersectionRef::Name(name) => match self.names.get(name) {
                Some(&id) => self.get(id),
                None => {
                    let id = IntersectionId(name.parse().ok()?);
                    self.get(id).filter(|intersection| intersection.name.is_none())
                }
            },
        }
    }

    pub fn get(&self, id: IntersectionId) -> Option<&Intersection> {
        let slot = *self.index.get(&id)?;
        self.slots.get(slot)?.as_ref()
    }

    pub fn contains(&self, id: IntersectionId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn road(&self, from: IntersectionId, to: IntersectionId) -> Option<&Road> {
        self.get(from)?.road_to(to)
    }

    /// All intersections, ordered by id.
    pub fn intersections(&self) -> Vec<&Intersection> {
        let mut all: Vec<&Intersection> = self.slots.iter().flatten().collect();
        all.sort_by_key(|intersection| intersection.id);
        all
    }

    /// All directed roads, grouped by origin in id order.
    pub fn roads(&self) -> Vec<&Road> {
        self.intersections()
            .into_iter()
            .flat_map(|intersection| intersection.roads.iter())
            .collect()
    }

    /// Roads leaving or entering `id`.
    pub fn incident_roads(&self, id: IntersectionId) -> Vec<&Road> {
        self.slots
            .iter()
            .flatten()
            .flat_map(|intersection| intersection.roads.iter())
            .filter(|road| road.touches(id))
            .collect()
    }

    pub fn intersection_count(&self) -> usize {
        self.index.len()
    }

    pub fn road_count(&self) -> usize {
        self.road_count
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Line-based export, one directed road per line as `from to weight`.
    /// Closure and bidirectional flags are not part of the format.
    pub fn to_edge_list(&self) -> String {
        let mut out = String::new();
        for road in self.roads() {
            let _ = writeln!(out, "{} {} {}", road.from, road.to, road.weight);
        }
        out
    }

    /// Rebuilds a network from `to_edge_list` output. Endpoints are created on
    /// first sight and every road is directed.
    pub fn from_edge_list(text: &str) -> Result<Self> {
        let mut network = RoadNetwork::new();
        for record in read_road_records(text.as_bytes(), RecordFormat::Whitespace) {
            let record = record?;
            for endpoint in [record.from, record.to] {
                if !network.contains(endpoint) {
                    network.add_intersection(endpoint)?;
                }
            }
            network.add_road(record.from, record.to, record.weight, false)?;
        }
        Ok(network)
    }

    fn intersection_mut(&mut self, id: IntersectionId) -> Result<&mut Intersection> {
        let slot = *self
            .index
            .get(&id)
            .ok_or(NetworkError::IntersectionNotFound(id))?;
        self.slots
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or_else(|| {
                NetworkError::InternalInconsistency(format!(
                    "index points intersection {} at empty slot {}",
                    id, slot
                ))
            })
    }

    /// Confirms `from -> to` exists and, when it is bidirectional, that its
    /// mirror exists too. Returns whether the mirror has to be updated.
    fn check_mirror(&self, from: IntersectionId, to: IntersectionId) -> Result<bool> {
        let road = self
            .road(from, to)
            .ok_or(NetworkError::RoadNotFound { from, to })?;
        if !road.bidirectional {
            return Ok(false);
        }
        match self.road(to, from) {
            Some(back) if back.bidirectional => Ok(true),
            _ => Err(NetworkError::InternalInconsistency(format!(
                "bidirectional road {} -> {} has no mirror",
                from, to
            ))),
        }
    }

    /// Applies `change` to `from -> to` and, for bidirectional roads, to the
    /// mirror. Both lookups succeed before either road is modified.
    fn modify_road(
        &mut self,
        from: IntersectionId,
        to: IntersectionId,
        change: impl Fn(&mut Road),
    ) -> Result<()> {
        let mirrored = self.check_mirror(from, to)?;

        if let Some(road) = self.intersection_mut(from)?.road_to_mut(to) {
            change(road);
        }
        if mirrored {
            if let Some(road) = self.intersection_mut(to)?.road_to_mut(from) {
                change(road);
            }
        }
        self.revision += 1;
        Ok(())
    }
}
