use crate::config::EngineConfig;
use crate::error::{NetworkError, Result};
use crate::network::intersection::IntersectionId;
use crate::shared_data::{SignalRow, TrafficSignal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BinaryHeap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalMode {
    Normal,
    EmergencyOverride,
}

/// Signal state of one intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionSignal {
    /// Green duration before any density bonus (seconds).
    pub base_secs: u32,
    /// Green duration currently in force (seconds).
    pub green_secs: u32,
    pub mode: SignalMode,
}

pub struct TrafficLightController {
    signals: BTreeMap<IntersectionId, IntersectionSignal>,
    default_base_secs: u32,
    scale_factor: u32,
    emergency_green_secs: u32,
}

impl TrafficLightController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            signals: BTreeMap::new(),
            default_base_secs: config.base_green_secs,
            scale_factor: config.signal_scale_factor.max(1),
            emergency_green_secs: config.emergency_green_secs,
        }
    }

    /// Starts tracking a new intersection with the default timing.
    pub fn register(&mut self, id: IntersectionId) {
        self.signals.entry(id).or_insert(IntersectionSignal {
            base_secs: self.default_base_secs,
            green_secs: self.default_base_secs,
            mode: SignalMode::Normal,
        });
    }

    pub fn remove(&mut self, id: IntersectionId) -> Option<IntersectionSignal> {
        self.signals.remove(&id)
    }

    pub fn signal(&self, id: IntersectionId) -> Option<&IntersectionSignal> {
        self.signals.get(&id)
    }

    pub fn green_duration(&self, id: IntersectionId) -> Option<u32> {
        self.signals.get(&id).map(|signal| signal.green_secs)
    }

    pub fn mode(&self, id: IntersectionId) -> Option<SignalMode> {
        self.signals.get(&id).map(|signal| signal.mode)
    }

    /// Replaces the base duration of an intersection (signal-timing record)
    /// and recomputes its green time for the given density.
    pub fn set_signal_timing(
        &mut self,
        id: IntersectionId,
        base_secs: u32,
        density: u32,
    ) -> Result<u32> {
        self.signal_mut(id)?.base_secs = base_secs;
        log::info!("Signal {}: base green set to {}s", id, base_secs);
        self.adjust_duration(id, density)
    }

    /// Recomputes the green duration as `base + density / scale_factor`.
    /// An intersection under emergency override keeps its pinned duration.
    pub fn adjust_duration(&mut self, id: IntersectionId, density: u32) -> Result<u32> {
        let scale_factor = self.scale_factor;
        let signal = self.signal_mut(id)?;
        if signal.mode == SignalMode::EmergencyOverride {
            return Ok(signal.green_secs);
        }
        let adjusted = signal.base_secs.saturating_add(density / scale_factor);
        if adjusted != signal.green_secs {
            log::debug!(
                "Signal {}: green {}s -> {}s (density {})",
                id,
                signal.green_secs,
                adjusted,
                density
            );
            signal.green_secs = adjusted;
        }
        Ok(adjusted)
    }

    /// Pins the green duration for an emergency vehicle.
    pub fn emergency_override(&mut self, id: IntersectionId) -> Result<()> {
        let pinned = self.emergency_green_secs;
        let signal = self.signal_mut(id)?;
        signal.mode = SignalMode::EmergencyOverride;
        signal.green_secs = pinned;
        log::info!("Emergency override activated at intersection {} ({}s green)", id, pinned);
        Ok(())
    }

    /// Returns to density-driven timing.
    pub fn clear_override(&mut self, id: IntersectionId, density: u32) -> Result<u32> {
        let signal = self.signal_mut(id)?;
        if signal.mode == SignalMode::EmergencyOverride {
            log::info!("Clearing emergency override for intersection {}", id);
        }
        signal.mode = SignalMode::Normal;
        self.adjust_duration(id, density)
    }

    /// Intersections ordered by descending vehicle density, ties by ascending
    /// id. Read-only: the heap lives only for this call.
    pub fn rank_for_management(&self, density: impl Fn(IntersectionId) -> u32) -> Vec<TrafficSignal> {
        let mut heap: BinaryHeap<TrafficSignal> = self
            .signals
            .iter()
            .map(|(&intersection, signal)| TrafficSignal {
                intersection,
                green_secs: signal.green_secs,
                vehicle_density: density(intersection),
            })
            .collect();

        let mut ranked = Vec::with_capacity(heap.len());
        while let Some(signal) = heap.pop() {
            ranked.push(signal);
        }
        ranked
    }

    /// `(intersection, duration)` rows in id order.
    pub fn signal_table(&self) -> Vec<SignalRow> {
        self.signals
            .iter()
            .map(|(&intersection, signal)| SignalRow {
                intersection,
                green_secs: signal.green_secs,
                mode: signal.mode,
            })
            .collect()
    }

    fn signal_mut(&mut self, id: IntersectionId) -> Result<&mut IntersectionSignal> {
        self.signals
            .get_mut(&id)
            .ok_or(NetworkError::IntersectionNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(ids: &[u32]) -> TrafficLightController {
        let config = EngineConfig {
            base_green_secs: 20,
            signal_scale_factor: 4,
            emergency_green_secs: 60,
            ..EngineConfig::default()
        };
        let mut controller = TrafficLightController::new(&config);
        for &raw in ids {
            controller.register(IntersectionId(raw));
        }
        controller
    }

    #[test]
    fn density_extends_green_time() {
        let mut lights = controller(&[1]);
        assert_eq!(lights.adjust_duration(IntersectionId(1), 9).unwrap(), 22);
        assert_eq!(lights.adjust_duration(IntersectionId(1), 0).unwrap(), 20);
    }

    #[test]
    fn override_pins_duration_until_cleared() {
        let mut lights = controller(&[1]);
        let id = IntersectionId(1);
        lights.emergency_override(id).unwrap();
        assert_eq!(lights.mode(id), Some(SignalMode::EmergencyOverride));
        assert_eq!(lights.adjust_duration(id, 40).unwrap(), 60);

        assert_eq!(lights.clear_override(id, 40).unwrap(), 30);
        assert_eq!(lights.mode(id), Some(SignalMode::Normal));
    }

    #[test]
    fn signal_timing_record_sets_base() {
        let mut lights = controller(&[3]);
        assert_eq!(lights.set_signal_timing(IntersectionId(3), 45, 8).unwrap(), 47);
        assert_eq!(lights.signal(IntersectionId(3)).unwrap().base_secs, 45);
    }

    #[test]
    fn unknown_intersection_is_reported() {
        let mut lights = controller(&[]);
        assert!(matches!(
            lights.emergency_override(IntersectionId(5)),
            Err(NetworkError::IntersectionNotFound(IntersectionId(5)))
        ));
    }

    #[test]
    fn ranking_is_busiest_first_and_read_only() {
        let lights = controller(&[1, 2, 3, 4]);
        let densities = |id: IntersectionId| match id.0 {
            1 => 5,
            2 => 12,
            3 => 5,
            _ => 0,
        };
        let order: Vec<u32> = lights
            .rank_for_management(densities)
            .iter()
            .map(|signal| signal.intersection.0)
            .collect();
        assert_eq!(order, vec![2, 1, 3, 4]);
        assert!(lights
            .signal_table()
            .iter()
            .all(|row| row.green_secs == 20 && row.mode == SignalMode::Normal));
    }
}
