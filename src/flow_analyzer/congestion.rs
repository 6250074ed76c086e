// congestion.rs
//
// Per-road vehicle counters and the threshold classification built on them.
// Counts are keyed by directed road; the level is computed on demand and never
// stored.

use crate::network::intersection::IntersectionId;
use crate::shared_data::CongestionRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CongestionLevel {
    Normal,
    Congested,
}

/// Classifies a vehicle count against a threshold. Exceeding the threshold
/// is congestion, reaching it is not.
pub fn classify(count: u32, threshold: u32) -> CongestionLevel {
    if count > threshold {
        CongestionLevel::Congested
    } else {
        CongestionLevel::Normal
    }
}

#[derive(Debug, Clone)]
pub struct CongestionTracker {
    threshold: u32,
    counts: BTreeMap<(IntersectionId, IntersectionId), u32>,
}

impl CongestionTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            counts: BTreeMap::new(),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// One more vehicle used `from -> to`. Returns the new count.
    pub fn record_traversal(&mut self, from: IntersectionId, to: IntersectionId) -> u32 {
        let count = self.counts.entry((from, to)).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn set_count(&mut self, from: IntersectionId, to: IntersectionId, value: u32) {
        self.counts.insert((from, to), value);
    }

    pub fn count(&self, from: IntersectionId, to: IntersectionId) -> u32 {
        self.counts.get(&(from, to)).copied().unwrap_or(0)
    }

    pub fn congestion_level(&self, from: IntersectionId, to: IntersectionId) -> CongestionLevel {
        classify(self.count(from, to), self.threshold)
    }

    pub fn reset_count(&mut self, from: IntersectionId, to: IntersectionId) {
        self.counts.remove(&(from, to));
    }

    pub fn reset_all(&mut self) {
        self.counts.clear();
    }

    /// Drops every counter on a road touching `id`.
    pub fn forget_intersection(&mut self, id: IntersectionId) {
        self.counts.retain(|&(from, to), _| from != id && to != id);
    }

    /// Sum of the counts on every road entering or leaving `id`.
    pub fn incident_count(&self, id: IntersectionId) -> u32 {
        self.counts
            .iter()
            .filter(|((from, to), _)| *from == id || *to == id)
            .fold(0u32, |total, (_, &count)| total.saturating_add(count))
    }

    /// Every tracked road, ordered by `(from, to)`.
    pub fn congestion_table(&self) -> Vec<CongestionRow> {
        self.counts
            .iter()
            .map(|(&(from, to), &count)| CongestionRow {
                from,
                to,
                count,
                level: classify(count, self.threshold),
            })
            .collect()
    }

    pub fn congested_roads(&self) -> Vec<(IntersectionId, IntersectionId)> {
        self.counts
            .iter()
            .filter(|(_, count)| classify(**count, self.threshold) == CongestionLevel::Congested)
            .map(|(&road, _)| road)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: IntersectionId = IntersectionId(1);
    const B: IntersectionId = IntersectionId(2);
    const C: IntersectionId = IntersectionId(3);

    #[test]
    fn counts_only_grow_under_traversal() {
        let mut tracker = CongestionTracker::new(10);
        let mut last = 0;
        for _ in 0..25 {
            let count = tracker.record_traversal(A, B);
            assert!(count > last);
            last = count;
        }
        assert_eq!(tracker.count(A, B), 25);
        assert_eq!(tracker.count(B, A), 0);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut tracker = CongestionTracker::new(10);
        tracker.set_count(A, B, 10);
        assert_eq!(tracker.congestion_level(A, B), CongestionLevel::Normal);
        tracker.record_traversal(A, B);
        assert_eq!(tracker.congestion_level(A, B), CongestionLevel::Congested);
    }

    #[test]
    fn incident_count_sums_both_directions() {
        let mut tracker = CongestionTracker::new(10);
        tracker.set_count(A, B, 4);
        tracker.set_count(C, B, 3);
        tracker.set_count(A, C, 9);
        assert_eq!(tracker.incident_count(B), 7);
        assert_eq!(tracker.incident_count(A), 13);
    }

    #[test]
    fn forgetting_an_intersection_drops_its_roads() {
        let mut tracker = CongestionTracker::new(10);
        tracker.set_count(A, B, 4);
        tracker.set_count(B, C, 12);
        tracker.set_count(A, C, 1);
        tracker.forget_intersection(B);
        assert_eq!(tracker.congestion_table().len(), 1);
        assert_eq!(tracker.count(A, C), 1);
    }

    #[test]
    fn table_and_congested_roads() {
        let mut tracker = CongestionTracker::new(2);
        tracker.set_count(B, C, 3);
        tracker.set_count(A, B, 1);
        let table = tracker.congestion_table();
        assert_eq!(table[0].from, A);
        assert_eq!(table[0].level, CongestionLevel::Normal);
        assert_eq!(table[1].level, CongestionLevel::Congested);
        assert_eq!(tracker.congested_roads(), vec![(B, C)]);

        tracker.reset_count(B, C);
        assert!(tracker.congested_roads().is_empty());
        tracker.reset_all();
        assert!(tracker.congestion_table().is_empty());
    }
}
