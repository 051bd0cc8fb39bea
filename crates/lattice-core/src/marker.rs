//! Edit markers

use serde::{Deserialize, Serialize};

/// Display colour carried with a marker, packed as 0xAARRGGBB. The lattice
/// never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerColor(pub u32);

impl MarkerColor {
    pub const YELLOW: Self = Self(0xFFFF_FF00);
    pub const CYAN: Self = Self(0xFF00_FFFF);
}

impl Default for MarkerColor {
    fn default() -> Self {
        Self::YELLOW
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMarker {
    #[serde(rename = "time")]
    pub time_secs: f64,
    pub label: String,
    #[serde(default)]
    pub color: MarkerColor,
    pub id: i32,
}

impl AudioMarker {
    pub fn new(id: i32, time_secs: f64, label: impl Into<String>, color: MarkerColor) -> Self {
        Self {
            time_secs,
            label: label.into(),
            color,
            id,
        }
    }
}
