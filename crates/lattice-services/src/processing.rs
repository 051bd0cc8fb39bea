//! Offline processing: apply breakpoint curves to audio, and beat- and
//! transient-driven slicing.

use std::f32::consts::FRAC_PI_4;

use lattice_core::{AudioBuffer, BreakpointCurve, TimeLattice};
use tracing::debug;

/// Region copied around each transient by [`isolate_transients`]
const TRANSIENT_WINDOW_SECS: f64 = 0.050;

fn curve_per_sample(curve: &BreakpointCurve, len: usize, sample_rate: f64) -> impl Iterator<Item = f32> + '_ {
    (0..len).map(move |i| curve.value_at(i as f64 / sample_rate) as f32)
}

/// Scale every channel by `1 + (env - 1) * intensity`. Intensity 0 leaves
/// the audio untouched, 1 applies the envelope as a plain gain.
pub fn apply_gain_curve(input: &AudioBuffer, curve: &BreakpointCurve, sample_rate: f64, intensity: f32) -> AudioBuffer {
    let gains: Vec<f32> = curve_per_sample(curve, input.len(), sample_rate)
        .map(|env| 1.0 + (env - 1.0) * intensity)
        .collect();

    let mut output = input.clone();
    for ch in 0..output.num_channels() {
        for (sample, gain) in output.channel_mut(ch).iter_mut().zip(&gains) {
            *sample *= gain;
        }
    }
    output
}

/// Equal-power pan of channels 0 and 1 by the curve (-1 left, +1 right).
/// Buffers with fewer than two channels are returned unchanged.
pub fn apply_pan_curve(input: &AudioBuffer, curve: &BreakpointCurve, sample_rate: f64, intensity: f32) -> AudioBuffer {
    let mut output = input.clone();
    if output.num_channels() < 2 {
        debug!(channels = output.num_channels(), "Pan curve needs stereo, skipping");
        return output;
    }

    for (i, pan) in curve_per_sample(curve, input.len(), sample_rate).enumerate() {
        let angle = ((pan * intensity).clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
        output.channel_mut(0)[i] *= angle.cos();
        output.channel_mut(1)[i] *= angle.sin();
    }
    output
}

/// Cut the buffer at every detected beat
pub fn split_by_beats(lattice: &TimeLattice, input: &AudioBuffer) -> Vec<AudioBuffer> {
    let times: Vec<f64> = lattice.detect_beats(input).iter().map(|b| b.time_secs).collect();
    debug!(beats = times.len(), "Splitting by beats");
    lattice.split(input, &times)
}

/// Silence everything except a 50 ms window centred on each transient
pub fn isolate_transients(lattice: &TimeLattice, input: &AudioBuffer, sensitivity: f64) -> AudioBuffer {
    let rate = lattice.sample_rate();
    let half = (TRANSIENT_WINDOW_SECS * rate) as usize / 2;
    let transients = lattice.detect_transients(input, sensitivity);

    let mut output = AudioBuffer::new(input.num_channels(), input.len());
    for &time in &transients {
        let centre = (time * rate) as usize;
        let range = input.clamp_range(centre.saturating_sub(half)..centre + half);
        for ch in 0..input.num_channels() {
            output.copy_from(ch, range.start, input, ch, range.clone());
        }
    }
    debug!(transients = transients.len(), "Isolated transients");
    output
}
