//! Sample-buffer editing. Every operation returns a new buffer; time
//! arguments are rounded half-up to samples and clamped to the input.

use std::f32::consts::FRAC_PI_2;
use std::ops::Range;

use tracing::debug;

use super::{QuantizeMode, TimeLattice};
use crate::buffer::AudioBuffer;

/// Radius of the zero-crossing search around a loop boundary
const LOOP_SEARCH_SECS: f64 = 0.010;

impl TimeLattice {
    fn sample_range(&self, input: &AudioBuffer, start: f64, end: f64) -> Range<usize> {
        input.clamp_range(self.sample_index(start)..self.sample_index(end))
    }

    /// Samples in `[start, end)`
    pub fn trim(&self, input: &AudioBuffer, start: f64, end: f64) -> AudioBuffer {
        input.slice(self.sample_range(input, start, end))
    }

    /// Everything except `[start, end)`
    pub fn cut(&self, input: &AudioBuffer, start: f64, end: f64) -> AudioBuffer {
        let range = self.sample_range(input, start, end);
        input.slice(0..range.start).concat(&input.slice(range.end..input.len()))
    }

    /// Partition at the given times into `times.len() + 1` segments
    pub fn split(&self, input: &AudioBuffer, times: &[f64]) -> Vec<AudioBuffer> {
        let mut bounds = Vec::with_capacity(times.len() + 2);
        bounds.push(0.0);
        bounds.extend_from_slice(times);
        bounds[1..].sort_by(f64::total_cmp);
        bounds.push(self.samples_to_seconds(input.len() as i64));

        bounds.windows(2).map(|w| self.trim(input, w[0], w[1])).collect()
    }

    /// Mix each clip into one buffer at its start position (seconds). The
    /// output takes the first clip's channel count and ends with the
    /// latest-ending clip. Empty or mismatched input gives an empty buffer.
    pub fn merge(&self, clips: &[AudioBuffer], positions: &[f64]) -> AudioBuffer {
        let Some(first) = clips.first() else {
            debug!("Merge called with no clips");
            return AudioBuffer::default();
        };
        if clips.len() != positions.len() {
            debug!(clips = clips.len(), positions = positions.len(), "Merge count mismatch");
            return AudioBuffer::default();
        }

        let starts: Vec<usize> = positions.iter().map(|&p| self.sample_index(p)).collect();
        let total = clips.iter().zip(&starts).map(|(c, &s)| s + c.len()).max().unwrap_or(0);

        let mut output = AudioBuffer::new(first.num_channels(), total);
        for (clip, &start) in clips.iter().zip(&starts) {
            for ch in 0..output.num_channels() {
                output.add_from(ch, start, clip, ch, 0..clip.len());
            }
        }
        output
    }

    /// Shift content by `amount` seconds (positive = later) within a buffer
    /// of the same length. The vacated region is silent when
    /// `fill_with_silence` is set, otherwise it keeps the input's samples.
    pub fn nudge(&self, input: &AudioBuffer, amount: f64, fill_with_silence: bool) -> AudioBuffer {
        let len = input.len();
        let shift = self.sample_index(amount.abs()).min(len);

        let mut output = if fill_with_silence {
            AudioBuffer::new(input.num_channels(), len)
        } else {
            input.clone()
        };

        for ch in 0..input.num_channels() {
            if amount > 0.0 {
                output.copy_from(ch, shift, input, ch, 0..len - shift);
            } else {
                output.copy_from(ch, 0, input, ch, shift..len);
            }
        }
        output
    }

    /// Linear-interpolation resample to `factor` times the length. Pitch
    /// moves with the length; use a real stretcher for production work.
    /// A non-positive or non-finite factor returns the input unchanged.
    pub fn time_stretch(&self, input: &AudioBuffer, factor: f64) -> AudioBuffer {
        if !(factor.is_finite() && factor > 0.0) {
            return input.clone();
        }
        let out_len = (input.len() as f64 * factor) as usize;
        resample(input, factor, out_len)
    }

    /// Join two clips with an equal-power overlap of `duration` seconds.
    /// Output channels follow `first`; a channel `second` lacks fades out
    /// over the overlap and is silent after it.
    pub fn crossfade(&self, first: &AudioBuffer, second: &AudioBuffer, duration: f64) -> AudioBuffer {
        let fade = self.sample_index(duration).min(first.len()).min(second.len());
        let fade_start = first.len() - fade;

        let mut output = AudioBuffer::new(first.num_channels(), first.len() + second.len() - fade);
        for ch in 0..output.num_channels() {
            output.copy_from(ch, 0, first, ch, 0..first.len());
            output.copy_from(ch, first.len(), second, ch, fade..second.len());
        }

        for i in 0..fade {
            let ratio = i as f32 / fade as f32;
            let fade_out = (ratio * FRAC_PI_2).cos();
            let fade_in = (ratio * FRAC_PI_2).sin();
            for ch in 0..output.num_channels() {
                let mixed = first.sample(ch, fade_start + i) * fade_out + second.sample(ch, i) * fade_in;
                output.set_sample(ch, fade_start + i, mixed);
            }
        }
        output
    }

    // ------------------------------------------------------------------
    // Loops
    // ------------------------------------------------------------------

    /// Move both loop boundaries to the nearest zero crossing within 10 ms.
    /// A boundary with no crossing nearby is kept.
    pub fn find_best_loop_points(&self, input: &AudioBuffer, approx_start: f64, approx_end: f64) -> (f64, f64) {
        let radius = self.sample_index(LOOP_SEARCH_SECS);
        let refine = |time: f64| {
            nearest_zero_crossing(input, self.sample_index(time), radius)
                .map_or(time, |idx| self.samples_to_seconds(idx as i64))
        };
        (refine(approx_start), refine(approx_end))
    }

    /// The region `[start, end)` repeated back to back
    pub fn create_loop(&self, input: &AudioBuffer, start: f64, end: f64, repeats: usize) -> AudioBuffer {
        let region = self.trim(input, start, end);
        let mut output = AudioBuffer::new(input.num_channels(), region.len() * repeats);
        for r in 0..repeats {
            for ch in 0..region.num_channels() {
                output.copy_from(ch, r * region.len(), &region, ch, 0..region.len());
            }
        }
        output
    }

    /// Stretch the audio between detected beats so each beat lands on the
    /// nearest quarter-note. The tail after the last beat keeps its length.
    pub fn warp_to_grid(&self, input: &AudioBuffer, beats: &[f64]) -> AudioBuffer {
        let duration = self.samples_to_seconds(input.len() as i64);
        let mut sources: Vec<f64> = beats.iter().copied().filter(|b| *b > 0.0 && *b < duration).collect();
        sources.sort_by(f64::total_cmp);
        sources.dedup();
        if sources.is_empty() {
            return input.clone();
        }

        let mut targets: Vec<f64> = sources
            .iter()
            .map(|&b| self.quantize_to_beat(b, QuantizeMode::Nearest))
            .collect();
        let tail_shift = targets[targets.len() - 1] - sources[sources.len() - 1];

        sources.insert(0, 0.0);
        targets.insert(0, 0.0);
        sources.push(duration);
        targets.push(duration + tail_shift);

        let mut output = AudioBuffer::new(input.num_channels(), 0);
        for (src, dst) in sources.windows(2).zip(targets.windows(2)) {
            let segment = self.trim(input, src[0], src[1]);
            let target_len = self.seconds_to_samples(dst[1]) - self.seconds_to_samples(dst[0]);
            if segment.is_empty() || target_len <= 0 {
                continue;
            }
            let factor = target_len as f64 / segment.len() as f64;
            output = output.concat(&resample(&segment, factor, target_len as usize));
        }
        debug!(beats = beats.len(), in_len = input.len(), out_len = output.len(), "Warped to grid");
        output
    }
}

fn resample(input: &AudioBuffer, factor: f64, out_len: usize) -> AudioBuffer {
    let mut output = AudioBuffer::new(input.num_channels(), out_len);
    let len = input.len();

    for ch in 0..input.num_channels() {
        let src = input.channel(ch);
        for (i, out) in output.channel_mut(ch).iter_mut().enumerate() {
            let pos = i as f64 / factor;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;

            *out = if idx + 1 < len {
                src[idx] * (1.0 - frac) + src[idx + 1] * frac
            } else if idx < len {
                src[idx]
            } else {
                0.0
            };
        }
    }
    output
}

/// Sign changes between adjacent samples of channel 0, plus exact zeros
fn nearest_zero_crossing(input: &AudioBuffer, target: usize, radius: usize) -> Option<usize> {
    if input.num_channels() == 0 || input.len() < 2 {
        return None;
    }
    let data = input.channel(0);
    let lo = target.saturating_sub(radius).max(1);
    let hi = (target + radius).min(data.len() - 1);

    (lo..=hi)
        .filter(|&i| {
            let (a, b) = (data[i - 1], data[i]);
            b == 0.0 || (a < 0.0 && b > 0.0) || (a > 0.0 && b < 0.0)
        })
        .min_by_key(|&i| i.abs_diff(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mono buffer at 1 kHz whose samples are their own index
    fn indexed(len: usize) -> (TimeLattice, AudioBuffer) {
        let lattice = TimeLattice::new(960, 1000.0);
        let buf = AudioBuffer::from_channels(vec![(0..len).map(|i| i as f32).collect()]);
        (lattice, buf)
    }

    #[test]
    fn test_trim() {
        let (lattice, buf) = indexed(100);
        let out = lattice.trim(&buf, 0.010, 0.015);
        assert_eq!(out.channel(0), &[10.0, 11.0, 12.0, 13.0, 14.0]);

        // clamped to the buffer
        assert_eq!(lattice.trim(&buf, -1.0, 0.003).len(), 3);
        assert_eq!(lattice.trim(&buf, 0.095, 5.0).len(), 5);
        assert!(lattice.trim(&buf, 0.050, 0.020).is_empty());
    }

    #[test]
    fn test_cut() {
        let (lattice, buf) = indexed(10);
        let out = lattice.cut(&buf, 0.002, 0.008);
        assert_eq!(out.channel(0), &[0.0, 1.0, 8.0, 9.0]);
        assert_eq!(lattice.cut(&buf, 0.5, 0.9).len(), 10);
    }

    #[test]
    fn test_trim_and_cut_lengths_sum() {
        let (lattice, buf) = indexed(1000);
        for (start, end) in [(0.1, 0.3), (0.0, 1.0), (0.9, 2.0), (0.5, 0.4)] {
            let trimmed = lattice.trim(&buf, start, end);
            let cut = lattice.cut(&buf, start, end);
            assert_eq!(trimmed.len() + cut.len(), buf.len());
        }
    }

    #[test]
    fn test_split_unsorted_times() {
        let (lattice, buf) = indexed(100);
        let parts = lattice.split(&buf, &[0.060, 0.020]);
        let lens: Vec<usize> = parts.iter().map(AudioBuffer::len).collect();
        assert_eq!(lens, vec![20, 40, 40]);
        assert_eq!(parts[1].sample(0, 0), 20.0);
    }

    #[test]
    fn test_split_lengths_sum() {
        let (lattice, buf) = indexed(1234);
        let parts = lattice.split(&buf, &[0.1, 0.1, 0.5, 3.0, -1.0]);
        assert_eq!(parts.len(), 6);
        assert_eq!(parts.iter().map(AudioBuffer::len).sum::<usize>(), buf.len());
        assert!(lattice.split(&buf, &[]).len() == 1);
    }

    #[test]
    fn test_merge_mixes_at_positions() {
        let lattice = TimeLattice::new(960, 1000.0);
        let a = AudioBuffer::from_channels(vec![vec![1.0; 4]]);
        let b = AudioBuffer::from_channels(vec![vec![0.5; 4]]);
        let out = lattice.merge(&[a, b], &[0.0, 0.002]);
        assert_eq!(out.channel(0), &[1.0, 1.0, 1.5, 1.5, 0.5, 0.5]);
    }

    #[test]
    fn test_merge_degenerate_input() {
        let lattice = TimeLattice::default();
        assert!(lattice.merge(&[], &[]).is_empty());
        let a = AudioBuffer::new(1, 4);
        assert!(lattice.merge(&[a], &[0.0, 1.0]).is_empty());
    }

    #[test]
    fn test_trim_cut_merge_reconstructs_length() {
        let (lattice, buf) = indexed(500);
        let trimmed = lattice.trim(&buf, 0.1, 0.2);
        let cut = lattice.cut(&buf, 0.1, 0.2);
        let head = lattice.trim(&cut, 0.0, 0.1);
        let tail = lattice.trim(&cut, 0.1, 1.0);
        let merged = lattice.merge(&[head, trimmed, tail], &[0.0, 0.1, 0.2]);
        assert_eq!(merged, buf);
    }

    #[test]
    fn test_nudge_forward_and_back() {
        let (lattice, buf) = indexed(6);
        let out = lattice.nudge(&buf, 0.002, true);
        assert_eq!(out.channel(0), &[0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);

        let out = lattice.nudge(&buf, -0.002, true);
        assert_eq!(out.channel(0), &[2.0, 3.0, 4.0, 5.0, 0.0, 0.0]);
        assert_eq!(out.len(), buf.len());
    }

    #[test]
    fn test_nudge_without_silence_keeps_vacated_samples() {
        let (lattice, buf) = indexed(6);
        let out = lattice.nudge(&buf, 0.002, false);
        assert_eq!(out.channel(0), &[0.0, 1.0, 0.0, 1.0, 2.0, 3.0]);

        let out = lattice.nudge(&buf, -0.002, false);
        assert_eq!(out.channel(0), &[2.0, 3.0, 4.0, 5.0, 4.0, 5.0]);
    }

    #[test]
    fn test_nudge_larger_than_buffer() {
        let (lattice, buf) = indexed(4);
        let out = lattice.nudge(&buf, 1.0, true);
        assert_eq!(out.channel(0), &[0.0; 4]);
    }

    #[test]
    fn test_time_stretch() {
        let lattice = TimeLattice::new(960, 1000.0);
        let buf = AudioBuffer::from_channels(vec![vec![0.0, 1.0, 2.0, 3.0]]);
        let out = lattice.time_stretch(&buf, 2.0);
        assert_eq!(out.channel(0), &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.0]);

        let out = lattice.time_stretch(&buf, 0.5);
        assert_eq!(out.channel(0), &[0.0, 2.0]);

        assert_eq!(lattice.time_stretch(&buf, 0.0), buf);
        assert_eq!(lattice.time_stretch(&buf, f64::NAN), buf);
    }

    #[test]
    fn test_crossfade_equal_power() {
        let lattice = TimeLattice::new(960, 1000.0);
        let a = AudioBuffer::from_channels(vec![vec![1.0; 10]]);
        let b = AudioBuffer::from_channels(vec![vec![1.0; 10]]);
        let out = lattice.crossfade(&a, &b, 0.004);
        assert_eq!(out.len(), 16);

        // head of a untouched, tail of b copied
        assert_eq!(out.sample(0, 0), 1.0);
        assert_eq!(out.sample(0, 15), 1.0);
        // overlap starts fully on a
        assert!((out.sample(0, 6) - 1.0).abs() < 1e-6);
        // cos + sin >= 1 across the quarter wave
        for i in 6..10 {
            assert!(out.sample(0, i) >= 1.0 - 1e-6);
        }
        let mid = (0.5f32 * FRAC_PI_2).cos() + (0.5f32 * FRAC_PI_2).sin();
        assert!((out.sample(0, 8) - mid).abs() < 1e-6);
    }

    #[test]
    fn test_crossfade_longer_than_clips() {
        let lattice = TimeLattice::new(960, 1000.0);
        let a = AudioBuffer::from_channels(vec![vec![1.0; 3]]);
        let b = AudioBuffer::from_channels(vec![vec![2.0; 5]]);
        let out = lattice.crossfade(&a, &b, 1.0);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_crossfade_into_fewer_channels() {
        let lattice = TimeLattice::new(960, 1000.0);
        let stereo = AudioBuffer::from_channels(vec![vec![1.0; 10], vec![1.0; 10]]);
        let mono = AudioBuffer::from_channels(vec![vec![1.0; 10]]);
        let out = lattice.crossfade(&stereo, &mono, 0.004);
        assert_eq!((out.num_channels(), out.len()), (2, 16));

        assert!((out.sample(1, 6) - 1.0).abs() < 1e-6);
        assert!((out.sample(1, 9) - (0.75f32 * FRAC_PI_2).cos()).abs() < 1e-6);
        assert!((10..16).all(|i| out.sample(1, i) == 0.0));
        assert!((10..16).all(|i| out.sample(0, i) == 1.0));
    }

    #[test]
    fn test_find_best_loop_points() {
        let lattice = TimeLattice::new(960, 1000.0);
        // zero crossings at index 7 (sign flip) and 40 (exact zero)
        let mut data = vec![1.0f32; 60];
        for s in data.iter_mut().skip(7) {
            *s = -1.0;
        }
        data[40] = 0.0;
        let buf = AudioBuffer::from_channels(vec![data]);

        let (start, end) = lattice.find_best_loop_points(&buf, 0.004, 0.045);
        assert!((start - 0.007).abs() < 1e-12);
        assert!((end - 0.040).abs() < 1e-12);

        let flat = AudioBuffer::from_channels(vec![vec![1.0; 60]]);
        assert_eq!(lattice.find_best_loop_points(&flat, 0.004, 0.045), (0.004, 0.045));
    }

    #[test]
    fn test_create_loop() {
        let (lattice, buf) = indexed(10);
        let out = lattice.create_loop(&buf, 0.002, 0.004, 3);
        assert_eq!(out.channel(0), &[2.0, 3.0, 2.0, 3.0, 2.0, 3.0]);
        assert!(lattice.create_loop(&buf, 0.002, 0.004, 0).is_empty());
    }

    #[test]
    fn test_warp_to_grid() {
        let lattice = TimeLattice::new(960, 1000.0);
        let buf = AudioBuffer::from_channels(vec![vec![0.25; 2000]]);

        // beat detected at 0.45 s moves to 0.5 s; tail keeps 1.55 s
        let out = lattice.warp_to_grid(&buf, &[0.45]);
        assert_eq!(out.len(), 2050);
        assert!(out.channel(0).iter().all(|&s| (s - 0.25).abs() < 1e-6));

        assert_eq!(lattice.warp_to_grid(&buf, &[]), buf);
        assert_eq!(lattice.warp_to_grid(&buf, &[5.0]), buf);
    }
}
