//! Tempo/meter events and the ordered tempo map

use serde::{Deserialize, Serialize};

/// A tempo and meter valid from `time_secs` until the next later event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEvent {
    /// Start of validity in seconds
    pub time_secs: f64,
    /// Tempo in quarter notes per minute
    pub bpm: f64,
    /// Time signature numerator (beats per bar)
    pub time_sig_num: u32,
    /// Time signature denominator (beat unit)
    pub time_sig_denom: u32,
}

impl Default for TempoEvent {
    fn default() -> Self {
        Self {
            time_secs: 0.0,
            bpm: 120.0,
            time_sig_num: 4,
            time_sig_denom: 4,
        }
    }
}

impl TempoEvent {
    pub fn new(time_secs: f64, bpm: f64, time_sig_num: u32, time_sig_denom: u32) -> Self {
        Self {
            time_secs,
            bpm,
            time_sig_num,
            time_sig_denom,
        }
    }

    /// Length of a quarter note in seconds
    pub fn quarter_secs(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Length of one beat of the meter (denominator-based) in seconds
    pub fn meter_beat_secs(&self) -> f64 {
        self.quarter_secs() * 4.0 / self.time_sig_denom as f64
    }

    /// Length of one bar of the meter in seconds
    pub fn meter_bar_secs(&self) -> f64 {
        self.time_sig_num as f64 * self.meter_beat_secs()
    }

    /// False if any field would make a unit length zero, negative or non-finite.
    /// Fields are public, so this is re-checked on every read.
    pub fn is_valid(&self) -> bool {
        self.bpm.is_finite() && self.bpm > 0.0 && self.time_sig_num > 0 && self.time_sig_denom > 0
    }
}

/// Tempo map kept sorted ascending by event time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoMap {
    events: Vec<TempoEvent>,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self {
            events: vec![TempoEvent::default()],
        }
    }
}

impl TempoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole map with a single event
    pub fn set_single(&mut self, event: TempoEvent) {
        self.events.clear();
        self.events.push(event);
    }

    /// Insert an event, keeping the map sorted. Events with equal times keep
    /// insertion order.
    pub fn insert(&mut self, event: TempoEvent) {
        self.events.push(event);
        self.events.sort_by(|a, b| a.time_secs.total_cmp(&b.time_secs));
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[TempoEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Last event at or before `time_secs`. Before the first event the
    /// earliest event applies; an empty map yields 120 BPM 4/4.
    pub fn at(&self, time_secs: f64) -> TempoEvent {
        let Some(first) = self.events.first() else {
            return TempoEvent::default();
        };

        self.events
            .iter()
            .rev()
            .find(|e| time_secs >= e.time_secs)
            .copied()
            .unwrap_or(*first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_has_one_event() {
        let map = TempoMap::new();
        assert_eq!(map.len(), 1);
        assert_eq!(map.at(10.0), TempoEvent::default());
    }

    #[test]
    fn test_lookup_takes_last_event_at_or_before() {
        let mut map = TempoMap::new();
        map.insert(TempoEvent::new(4.0, 90.0, 3, 4));
        map.insert(TempoEvent::new(2.0, 140.0, 4, 4));

        let times: Vec<f64> = map.events().iter().map(|e| e.time_secs).collect();
        assert_eq!(times, vec![0.0, 2.0, 4.0]);

        assert_eq!(map.at(1.999).bpm, 120.0);
        assert_eq!(map.at(2.0).bpm, 140.0); // takes effect exactly at its timestamp
        assert_eq!(map.at(3.5).bpm, 140.0);
        assert_eq!(map.at(100.0).bpm, 90.0);
    }

    #[test]
    fn test_before_first_event_uses_earliest() {
        let mut map = TempoMap::new();
        map.set_single(TempoEvent::new(5.0, 100.0, 4, 4));
        assert_eq!(map.at(1.0).bpm, 100.0);
        assert_eq!(map.at(-3.0).bpm, 100.0);
    }

    #[test]
    fn test_empty_map_falls_back_to_default() {
        let mut map = TempoMap::new();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.at(3.0), TempoEvent::new(0.0, 120.0, 4, 4));
    }

    #[test]
    fn test_unit_lengths() {
        let e = TempoEvent::new(0.0, 120.0, 6, 8);
        assert!((e.quarter_secs() - 0.5).abs() < 1e-12);
        assert!((e.meter_beat_secs() - 0.25).abs() < 1e-12);
        assert!((e.meter_bar_secs() - 1.5).abs() < 1e-12);
        assert!(e.is_valid());
        assert!(!TempoEvent::new(0.0, 0.0, 4, 4).is_valid());
        assert!(!TempoEvent::new(0.0, 120.0, 4, 0).is_valid());
    }
}
