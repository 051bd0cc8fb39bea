//! The time lattice: tempo map, PPQN and sample rate, and every operation
//! that depends on them.
//!
//! Seconds is the pivot domain. `convert` always goes value → seconds →
//! value, so cross-domain error is bounded by two single-hop conversions.

mod edit;
mod grid;
mod markers;
mod quantize;
mod transient;

use tracing::{debug, warn};

use crate::marker::AudioMarker;
use crate::tempo::{TempoEvent, TempoMap};
use crate::time::{MusicalTime, TimeDomain};

pub use quantize::{QuantizeMode, ValueResolution};
pub use transient::TransientShift;

pub const DEFAULT_PPQN: u32 = 960;
pub const MIN_PPQN: u32 = 24;
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

/// SMPTE frame rate used by the generic converter
const SMPTE_FPS: f64 = 30.0;

/// Time grid state. Single-threaded: callers sharing one lattice across
/// threads must wrap it in their own lock.
#[derive(Debug, Clone)]
pub struct TimeLattice {
    ppqn: u32,
    sample_rate: f64,
    tempo_map: TempoMap,
    markers: Vec<AudioMarker>,
    next_marker_id: i32,
}

impl Default for TimeLattice {
    fn default() -> Self {
        Self::new(DEFAULT_PPQN, DEFAULT_SAMPLE_RATE)
    }
}

impl TimeLattice {
    pub fn new(ppqn: u32, sample_rate: f64) -> Self {
        let mut lattice = Self {
            ppqn: DEFAULT_PPQN,
            sample_rate: DEFAULT_SAMPLE_RATE,
            tempo_map: TempoMap::new(),
            markers: Vec::new(),
            next_marker_id: 1,
        };
        lattice.set_ppqn(ppqn);
        lattice.set_sample_rate(sample_rate);
        lattice
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Set ticks per quarter note; values below 24 are clamped
    pub fn set_ppqn(&mut self, ppqn: u32) {
        if ppqn < MIN_PPQN {
            warn!(requested = ppqn, clamped = MIN_PPQN, "PPQN below minimum");
        }
        self.ppqn = ppqn.max(MIN_PPQN);
        debug!(ppqn = self.ppqn, "PPQN updated");
    }

    pub fn ppqn(&self) -> u32 {
        self.ppqn
    }

    /// Set the sample rate; non-finite or sub-1 Hz rates become 1.0
    pub fn set_sample_rate(&mut self, rate: f64) {
        self.sample_rate = if rate.is_finite() { rate.max(1.0) } else { 1.0 };
        if self.sample_rate != rate {
            warn!(requested = rate, clamped = self.sample_rate, "Sample rate clamped");
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Replace the tempo map with a single 4/4 event
    pub fn set_tempo(&mut self, bpm: f64, time_secs: f64) {
        self.tempo_map.set_single(TempoEvent::new(time_secs, bpm, 4, 4));
        debug!(bpm, time_secs, "Tempo set");
    }

    pub fn add_tempo_change(&mut self, event: TempoEvent) {
        self.tempo_map.insert(event);
        debug!(time_secs = event.time_secs, bpm = event.bpm, "Tempo change added");
    }

    pub fn clear_tempo_map(&mut self) {
        self.tempo_map.clear();
    }

    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    /// Tempo in effect at `time_secs`: the last event at or before it, no
    /// interpolation between events.
    pub fn tempo_at(&self, time_secs: f64) -> TempoEvent {
        self.tempo_map.at(time_secs)
    }

    /// Tempo used for unit-length arithmetic. An event that would produce a
    /// zero or non-finite length is replaced by the default tempo.
    pub(crate) fn unit_tempo(&self, time_secs: f64) -> TempoEvent {
        let tempo = self.tempo_at(time_secs);
        if tempo.is_valid() {
            tempo
        } else {
            warn!(?tempo, "Invalid tempo event, using 120 BPM 4/4");
            TempoEvent::default()
        }
    }

    // ------------------------------------------------------------------
    // Unit lengths
    // ------------------------------------------------------------------

    /// Tick length in seconds at the tempo in effect at time 0
    pub fn tick_duration(&self) -> f64 {
        self.tick_secs_at(0.0)
    }

    /// Quarter-note length at `at`
    pub fn beat_duration(&self, at: f64) -> f64 {
        self.unit_tempo(at).quarter_secs()
    }

    /// `time_sig_num` quarter notes at `at`
    pub fn bar_duration(&self, at: f64) -> f64 {
        let tempo = self.unit_tempo(at);
        tempo.quarter_secs() * tempo.time_sig_num as f64
    }

    pub(crate) fn tick_secs_at(&self, at: f64) -> f64 {
        self.unit_tempo(at).quarter_secs() / self.ppqn as f64
    }

    // ------------------------------------------------------------------
    // Domain conversion
    // ------------------------------------------------------------------

    pub fn convert(&self, value: f64, from: TimeDomain, to: TimeDomain) -> f64 {
        let seconds = self.to_seconds(value, from);
        self.from_seconds(seconds, to)
    }

    /// Convert a value in `domain` to seconds.
    ///
    /// `MusicalTicks` uses the tempo at time 0 here but the tempo at the
    /// converted time in [`from_seconds`](Self::from_seconds). The two
    /// directions disagree once the tempo map has changes; existing
    /// callers depend on this.
    pub fn to_seconds(&self, value: f64, domain: TimeDomain) -> f64 {
        match domain {
            TimeDomain::AudioSamples => value / self.sample_rate,
            TimeDomain::Seconds => value,
            TimeDomain::MusicalTicks => value * self.tick_secs_at(0.0),
            TimeDomain::BarsBeatsTicks => self.musical_to_seconds(&MusicalTime::decode(value)),
            TimeDomain::SmpteFrames => value / SMPTE_FPS,
        }
    }

    pub fn from_seconds(&self, seconds: f64, domain: TimeDomain) -> f64 {
        match domain {
            TimeDomain::AudioSamples => seconds * self.sample_rate,
            TimeDomain::Seconds => seconds,
            TimeDomain::MusicalTicks => seconds / self.tick_secs_at(seconds),
            TimeDomain::BarsBeatsTicks => self.seconds_to_musical(seconds).encode(),
            TimeDomain::SmpteFrames => seconds * SMPTE_FPS,
        }
    }

    /// Split `seconds` into bars, beats and ticks using the meter in effect
    /// at `seconds`.
    pub fn seconds_to_musical(&self, seconds: f64) -> MusicalTime {
        let tempo = self.unit_tempo(seconds);
        let beat_len = tempo.meter_beat_secs();
        let bar_len = tempo.meter_bar_secs();

        // Pushes values a few ulps short of a bar/beat boundary across it
        let eps = 1.0 + seconds.max(1.0) * f64::EPSILON;

        let bars = (seconds * eps / bar_len).floor();
        let mut rest = (seconds - bars * bar_len).max(0.0);

        let beats = (rest * eps / beat_len).floor();
        rest = (rest - beats * beat_len).max(0.0);

        let ticks_fractional = rest * (self.ppqn as f64 / beat_len);
        let ticks = ticks_fractional.trunc();

        MusicalTime {
            // casts saturate; far-out times pin at i32::MAX
            bars: (bars as i32).saturating_add(1),
            beats: (beats as i32).saturating_add(1),
            ticks: ticks as i32,
            remainder: ticks_fractional - ticks,
        }
    }

    /// Inverse of [`seconds_to_musical`](Self::seconds_to_musical) using the
    /// meter at time 0; a musical position has no absolute time to look up.
    pub fn musical_to_seconds(&self, mt: &MusicalTime) -> f64 {
        let tempo = self.unit_tempo(0.0);
        let total_beats = (mt.bars as f64 - 1.0) * tempo.time_sig_num as f64
            + (mt.beats as f64 - 1.0)
            + (mt.ticks as f64 + mt.remainder) / self.ppqn as f64;
        total_beats * tempo.meter_beat_secs()
    }

    /// Round half-up to a sample index
    pub fn seconds_to_samples(&self, seconds: f64) -> i64 {
        (seconds * self.sample_rate + 0.5).floor() as i64
    }

    pub fn samples_to_seconds(&self, samples: i64) -> f64 {
        samples as f64 / self.sample_rate
    }

    /// Sample index for buffer addressing; negative times map to 0
    pub(crate) fn sample_index(&self, seconds: f64) -> usize {
        self.seconds_to_samples(seconds).max(0) as usize
    }
}
