//! Time and value quantization

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TimeLattice;
use super::grid::grid_indices;
use crate::breakpoint::{Breakpoint, BreakpointCurve};
use crate::error::LatticeError;

/// Fraction of a tick treated as float noise by Floor/Ceil
const ON_GRID_EPS: f64 = 1e-9;

/// How a time snaps to the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuantizeMode {
    #[default]
    Nearest,
    Floor,
    Ceil,
}

/// Bit depth of a value quantizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueResolution {
    /// MIDI CC, 128 steps
    Bit7,
    /// MIDI NRPN, 16384 steps
    #[default]
    Bit14,
    Bit24,
    Bit32,
}

impl ValueResolution {
    pub fn bits(&self) -> u32 {
        match self {
            Self::Bit7 => 7,
            Self::Bit14 => 14,
            Self::Bit24 => 24,
            Self::Bit32 => 32,
        }
    }

    /// `2^bits - 1`
    pub fn steps(&self) -> f64 {
        ((1u64 << self.bits()) - 1) as f64
    }

    /// Smallest value change worth keeping when simplifying a curve
    pub fn perceptual_threshold(&self) -> f64 {
        match self {
            Self::Bit7 => 0.02,
            Self::Bit14 => 0.001,
            Self::Bit24 => 0.0001,
            Self::Bit32 => 0.00001,
        }
    }
}

impl FromStr for ValueResolution {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches("bit") {
            "7" => Ok(Self::Bit7),
            "14" => Ok(Self::Bit14),
            "24" => Ok(Self::Bit24),
            "32" => Ok(Self::Bit32),
            _ => Err(LatticeError::Parse(format!("unknown resolution '{s}'"))),
        }
    }
}

impl TimeLattice {
    /// Snap to the tick grid within one second of `time`.
    ///
    /// Nearest takes the first grid point scanned (the earlier one) on a
    /// tie. Floor/Ceil step one tick from the nearest point when it lies
    /// on the wrong side, so every mode returns a grid point.
    pub fn quantize_to_grid(&self, time: f64, mode: QuantizeMode) -> f64 {
        let start = time - 1.0;
        let tick = self.tick_secs_at(start);

        let mut nearest: Option<(i64, f64)> = None;
        for k in grid_indices(start, time + 1.0, tick) {
            let dist = (time - k as f64 * tick).abs();
            if nearest.is_none_or(|(_, best)| dist < best) {
                nearest = Some((k, dist));
            }
        }
        let Some((k, _)) = nearest else {
            return time;
        };

        // within this distance a point counts as on the input's side
        let slack = tick * ON_GRID_EPS;
        let point = k as f64 * tick;
        let k = match mode {
            QuantizeMode::Nearest => k,
            QuantizeMode::Floor if point - time > slack => k.saturating_sub(1),
            QuantizeMode::Ceil if time - point > slack => k.saturating_add(1),
            _ => k,
        };
        k as f64 * tick
    }

    /// Snap to quarter-note beats by direct division
    pub fn quantize_to_beat(&self, time: f64, mode: QuantizeMode) -> f64 {
        snap(time, self.beat_duration(time), mode)
    }

    /// Snap to bar lines by direct division
    pub fn quantize_to_bar(&self, time: f64, mode: QuantizeMode) -> f64 {
        snap(time, self.bar_duration(time), mode)
    }

    /// Uniform quantizer over [-1, 1] with `2^bits - 1` steps. Input outside
    /// the range is clamped first.
    pub fn quantize_value(&self, value: f64, resolution: ValueResolution) -> f64 {
        let steps = resolution.steps();
        let normalized = (value.clamp(-1.0, 1.0) + 1.0) * 0.5;
        let quantized = (normalized * steps + 0.5).floor();
        quantized / steps * 2.0 - 1.0
    }

    /// Quantize every point's time (to the tick grid) and value.
    ///
    /// With `simplify`, a point is dropped when it is within half a tick
    /// and below the resolution's perceptual threshold of the last point
    /// kept. Single greedy pass in input order.
    pub fn quantize_breakpoints(
        &self,
        points: &[Breakpoint],
        resolution: ValueResolution,
        simplify: bool,
    ) -> Vec<Breakpoint> {
        let threshold = resolution.perceptual_threshold();
        let half_tick = self.tick_duration() * 0.5;
        let mut result: Vec<Breakpoint> = Vec::with_capacity(points.len());

        for point in points {
            let q = Breakpoint::new(
                self.quantize_to_grid(point.time, QuantizeMode::Nearest),
                self.quantize_value(point.value, resolution),
            );

            if simplify {
                if let Some(last) = result.last() {
                    if (q.time - last.time).abs() < half_tick && (q.value - last.value).abs() < threshold {
                        continue;
                    }
                }
            }
            result.push(q);
        }

        tracing::trace!(input = points.len(), output = result.len(), "Breakpoints quantized");
        result
    }

    /// Quantize and simplify a curve in place
    pub fn quantize_curve(&self, curve: &mut BreakpointCurve, resolution: ValueResolution) {
        let quantized = self.quantize_breakpoints(curve.points(), resolution, true);
        *curve = BreakpointCurve::from_points(quantized);
    }

    // ------------------------------------------------------------------
    // Grid snapping helpers
    // ------------------------------------------------------------------

    /// Round to an arbitrary spacing; non-positive spacing leaves `time`
    pub fn snap_to_grid(&self, time: f64, spacing: f64) -> f64 {
        if spacing > 0.0 && spacing.is_finite() {
            (time / spacing).round() * spacing
        } else {
            time
        }
    }

    pub fn is_on_grid(&self, time: f64, tolerance: f64) -> bool {
        (time - self.quantize_to_grid(time, QuantizeMode::Nearest)).abs() < tolerance
    }

    pub fn next_grid_point(&self, time: f64) -> f64 {
        self.quantize_to_grid(time + self.tick_duration(), QuantizeMode::Ceil)
    }

    pub fn previous_grid_point(&self, time: f64) -> f64 {
        self.quantize_to_grid(time - self.tick_duration(), QuantizeMode::Floor)
    }
}

fn snap(time: f64, unit: f64, mode: QuantizeMode) -> f64 {
    let n = time / unit;
    let n = match mode {
        QuantizeMode::Nearest => n.round(),
        QuantizeMode::Floor => n.floor(),
        QuantizeMode::Ceil => n.ceil(),
    };
    n * unit
}
