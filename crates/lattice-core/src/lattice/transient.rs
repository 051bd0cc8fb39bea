//! Energy-based transient detection and the transient-driven quantizers.
//!
//! The audio-level quantizers return their input unchanged; the shift each
//! transient would receive is available from the `plan_*` functions.

use tracing::debug;

use super::{QuantizeMode, TimeLattice};
use crate::buffer::AudioBuffer;
use crate::marker::{AudioMarker, MarkerColor};

const WINDOW: usize = 1024;
const HOP: usize = 512;
/// Fraction of the previous window's energy carried into the next onset test
const ENERGY_DECAY: f32 = 0.9;

const TRANSIENT_THRESHOLD: f64 = 0.5;
const BEAT_THRESHOLD: f64 = 0.4;

/// Planned displacement of one transient, both in seconds. `time` is on
/// the global timeline (clip start added).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransientShift {
    pub time: f64,
    pub shift: f64,
}

impl TimeLattice {
    /// Window start times (seconds, ascending) whose RMS rise over the
    /// decayed previous RMS exceeds `threshold`. Buffers no longer than one
    /// window yield nothing.
    pub fn detect_transients(&self, input: &AudioBuffer, threshold: f64) -> Vec<f64> {
        let channels = input.num_channels();
        if channels == 0 {
            return Vec::new();
        }

        let mut transients = Vec::new();
        let mut previous = 0.0f32;
        let mut start = 0;

        while start + WINDOW < input.len() {
            let energy: f32 = input
                .channels()
                .map(|data| data[start..start + WINDOW].iter().map(|s| s * s).sum::<f32>())
                .sum();
            let rms = (energy / (WINDOW * channels) as f32).sqrt();

            let onset = (rms - previous).max(0.0);
            if onset as f64 > threshold {
                transients.push(self.samples_to_seconds(start as i64));
            }

            previous = rms * ENERGY_DECAY;
            start += HOP;
        }

        debug!(count = transients.len(), threshold, "Detected transients");
        transients
    }

    /// Transients at a 0.4 threshold as cyan markers `Beat 1`, `Beat 2`, ...
    /// These are standalone; the lattice's own marker set is untouched.
    pub fn detect_beats(&self, input: &AudioBuffer) -> Vec<AudioMarker> {
        self.detect_transients(input, BEAT_THRESHOLD)
            .into_iter()
            .zip(1..)
            .map(|(time, id)| AudioMarker::new(id, time, format!("Beat {id}"), MarkerColor::CYAN))
            .collect()
    }

    // ------------------------------------------------------------------
    // Shift planning
    // ------------------------------------------------------------------

    /// Pull toward the tick grid: `(grid - t) * strength` per transient
    pub fn plan_quantize_shifts(&self, input: &AudioBuffer, start: f64, strength: f64) -> Vec<TransientShift> {
        self.global_transients(input, start)
            .map(|time| TransientShift {
                time,
                shift: (self.quantize_to_grid(time, QuantizeMode::Nearest) - time) * strength,
            })
            .collect()
    }

    /// Uniform random shift in `±amount` ticks. The same seed gives the
    /// same plan.
    pub fn plan_humanize_shifts(&self, input: &AudioBuffer, start: f64, amount: f64, seed: u64) -> Vec<TransientShift> {
        let mut rng = fastrand::Rng::with_seed(seed);
        let tick = self.tick_duration();
        self.global_transients(input, start)
            .map(|time| TransientShift {
                time,
                shift: (rng.f64() - 0.5) * 2.0 * amount * tick,
            })
            .collect()
    }

    /// Grid offset plus `template[i % len]` for the i-th transient. An empty
    /// template is plain quantization.
    pub fn plan_groove_shifts(&self, input: &AudioBuffer, start: f64, template: &[f64]) -> Vec<TransientShift> {
        self.global_transients(input, start)
            .enumerate()
            .map(|(i, time)| {
                let groove = if template.is_empty() { 0.0 } else { template[i % template.len()] };
                TransientShift {
                    time,
                    shift: self.quantize_to_grid(time, QuantizeMode::Nearest) - time + groove,
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Audio-level quantizers
    // ------------------------------------------------------------------

    pub fn quantize_audio(&self, input: &AudioBuffer, start: f64, strength: f64) -> AudioBuffer {
        let plan = self.plan_quantize_shifts(input, start, strength);
        debug!(transients = plan.len(), strength, "Quantize plan computed, audio unchanged");
        input.clone()
    }

    pub fn humanize(&self, input: &AudioBuffer, start: f64, amount: f64, seed: u64) -> AudioBuffer {
        let plan = self.plan_humanize_shifts(input, start, amount, seed);
        debug!(transients = plan.len(), amount, "Humanize plan computed, audio unchanged");
        input.clone()
    }

    pub fn groove_quantize(&self, input: &AudioBuffer, start: f64, template: &[f64]) -> AudioBuffer {
        let plan = self.plan_groove_shifts(input, start, template);
        debug!(transients = plan.len(), template_len = template.len(), "Groove plan computed, audio unchanged");
        input.clone()
    }

    fn global_transients(&self, input: &AudioBuffer, start: f64) -> impl Iterator<Item = f64> {
        self.detect_transients(input, TRANSIENT_THRESHOLD)
            .into_iter()
            .map(move |t| start + t)
    }
}
