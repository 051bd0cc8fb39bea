use std::path::{Path, PathBuf};

use lattice_core::{TempoEvent, TimeLattice, ValueResolution, DEFAULT_PPQN, DEFAULT_SAMPLE_RATE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    pub ppqn: u32,
    pub sample_rate: f64,
    pub bpm: f64,
    /// `[beats per bar, beat unit]`
    pub time_signature: [u32; 2],
    pub resolution: ValueResolution,
    pub transient_threshold: f64,
    pub crossfade_seconds: f64,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            ppqn: DEFAULT_PPQN,
            sample_rate: DEFAULT_SAMPLE_RATE,
            bpm: 120.0,
            time_signature: [4, 4],
            resolution: ValueResolution::default(),
            transient_threshold: 0.5,
            crossfade_seconds: 0.01,
        }
    }
}

impl LatticeConfig {
    /// A lattice with a single tempo event at time 0
    pub fn build_lattice(&self) -> TimeLattice {
        let mut lattice = TimeLattice::new(self.ppqn, self.sample_rate);
        let [num, denom] = self.time_signature;
        lattice.clear_tempo_map();
        lattice.add_tempo_change(TempoEvent::new(0.0, self.bpm, num, denom));
        lattice
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lattice")
        .join("config.toml")
}

/// Read the config at `path` (or the default location). A missing file
/// gives defaults silently; an unreadable one gives defaults with a warning.
pub fn load_config(path: Option<&Path>) -> LatticeConfig {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let Ok(text) = std::fs::read_to_string(&path) else {
        debug!(path = %path.display(), "No config file, using defaults");
        return LatticeConfig::default();
    };
    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
            LatticeConfig::default()
        }
    }
}
