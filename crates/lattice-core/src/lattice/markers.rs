use tracing::{debug, info};

use super::TimeLattice;
use crate::error::{LatticeError, Result};
use crate::marker::{AudioMarker, MarkerColor};

impl TimeLattice {
    /// Append a marker and return its id. Ids are never reused, even after
    /// `clear_markers`.
    pub fn add_marker(&mut self, time_secs: f64, label: impl Into<String>, color: MarkerColor) -> i32 {
        let id = self.next_marker_id;
        self.next_marker_id = self.next_marker_id.saturating_add(1);
        self.markers.push(AudioMarker::new(id, time_secs, label, color));
        debug!(id, time_secs, "Marker added");
        id
    }

    pub fn remove_marker(&mut self, id: i32) -> Option<AudioMarker> {
        let index = self.markers.iter().position(|m| m.id == id)?;
        Some(self.markers.remove(index))
    }

    pub fn clear_markers(&mut self) {
        self.markers.clear();
    }

    /// Markers in insertion order
    pub fn markers(&self) -> &[AudioMarker] {
        &self.markers
    }

    /// Closest marker strictly within `tolerance` of `time_secs`. On a tie
    /// the earlier-inserted marker wins.
    pub fn find_nearest_marker(&self, time_secs: f64, tolerance: f64) -> Option<&AudioMarker> {
        let mut nearest = None;
        let mut best = tolerance;
        for marker in &self.markers {
            let dist = (marker.time_secs - time_secs).abs();
            if dist < best {
                best = dist;
                nearest = Some(marker);
            }
        }
        nearest
    }

    pub fn export_markers_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.markers)?)
    }

    /// Replace the marker set. On error the current markers are kept. An id
    /// of `i32::MAX` leaves no id for the next marker and is rejected.
    pub fn import_markers_json(&mut self, json: &str) -> Result<()> {
        let markers: Vec<AudioMarker> = serde_json::from_str(json)?;
        let next_id = match markers.iter().map(|m| m.id).max() {
            Some(id) => id
                .checked_add(1)
                .ok_or_else(|| LatticeError::Parse(format!("marker id {id} leaves no room for new markers")))?,
            None => 1,
        };
        self.next_marker_id = next_id;
        self.markers = markers;
        info!(count = self.markers.len(), next_id = self.next_marker_id, "Imported markers");
        Ok(())
    }
}
