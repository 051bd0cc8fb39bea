//! Grid generation. A single tempo, read at the start of the requested
//! range, governs the whole range.

use super::TimeLattice;
use crate::time::MusicalTime;

/// Past this magnitude grid indices are no longer exact in an `f64`
const MAX_GRID_INDEX: f64 = (1u64 << 53) as f64;

/// Indices `k` with `k * unit` inside `[start, end]`. Empty when the range
/// lies beyond [`MAX_GRID_INDEX`] units from zero.
pub(super) fn grid_indices(start: f64, end: f64, unit: f64) -> impl Iterator<Item = i64> {
    let (lo, hi) = ((start / unit).floor(), (end / unit).floor());
    let valid = start.is_finite()
        && end.is_finite()
        && end >= start
        && unit.is_finite()
        && unit > 0.0
        && lo.abs() < MAX_GRID_INDEX
        && hi.abs() < MAX_GRID_INDEX;
    let (first, last) = if valid { (lo as i64, hi as i64 + 1) } else { (0, -1) };

    (first..=last).filter(move |&k| {
        let time = k as f64 * unit;
        time >= start && time <= end
    })
}

fn grid_points(start: f64, end: f64, unit: f64) -> Vec<f64> {
    grid_indices(start, end, unit).map(|k| k as f64 * unit).collect()
}

impl TimeLattice {
    /// Every tick in `[start, end]`, ascending
    pub fn generate_ppqn_grid(&self, start: f64, end: f64) -> Vec<f64> {
        grid_points(start, end, self.tick_secs_at(start))
    }

    /// The tick grid expressed as musical time
    pub fn generate_musical_grid(&self, start: f64, end: f64) -> Vec<MusicalTime> {
        self.generate_ppqn_grid(start, end)
            .into_iter()
            .map(|t| self.seconds_to_musical(t))
            .collect()
    }

    /// Every quarter-note beat in `[start, end]`
    pub fn generate_beat_grid(&self, start: f64, end: f64) -> Vec<f64> {
        grid_points(start, end, self.beat_duration(start))
    }

    /// Every bar line in `[start, end]`
    pub fn generate_bar_grid(&self, start: f64, end: f64) -> Vec<f64> {
        grid_points(start, end, self.bar_duration(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tempo::TempoEvent;

    #[test]
    fn test_beat_grid() {
        let lattice = TimeLattice::default();
        assert_eq!(lattice.generate_beat_grid(0.0, 2.0), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(lattice.generate_beat_grid(0.1, 1.4), vec![0.5, 1.0]);
    }

    #[test]
    fn test_bar_grid() {
        let lattice = TimeLattice::default();
        assert_eq!(lattice.generate_bar_grid(0.0, 7.0), vec![0.0, 2.0, 4.0, 6.0]);
        assert!(lattice.generate_bar_grid(0.5, 1.5).is_empty());
    }

    #[test]
    fn test_ppqn_grid_spacing() {
        let lattice = TimeLattice::default();
        let tick = lattice.tick_duration();
        let grid = lattice.generate_ppqn_grid(1.0, 1.01);
        assert!(!grid.is_empty());
        assert!(grid.iter().all(|&t| (1.0..=1.01).contains(&t)));
        for pair in grid.windows(2) {
            assert!((pair[1] - pair[0] - tick).abs() < 1e-12);
        }
        // 10 ms at ~0.52 ms per tick
        assert_eq!(grid.len(), 20);
    }

    #[test]
    fn test_grid_uses_tempo_at_start_only() {
        let mut lattice = TimeLattice::default();
        lattice.add_tempo_change(TempoEvent::new(1.0, 60.0, 4, 4));
        // 120 BPM governs the whole range even past the change at 1.0
        assert_eq!(lattice.generate_beat_grid(0.0, 2.0), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(lattice.generate_beat_grid(1.0, 3.0), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_degenerate_ranges() {
        let lattice = TimeLattice::default();
        assert!(lattice.generate_beat_grid(2.0, 1.0).is_empty());
        assert!(lattice.generate_beat_grid(f64::NAN, 1.0).is_empty());
        assert_eq!(lattice.generate_beat_grid(1.0, 1.0), vec![1.0]);
    }

    #[test]
    fn test_far_out_ranges_are_empty() {
        let lattice = TimeLattice::default();
        assert!(lattice.generate_bar_grid(f64::MAX / 2.0, f64::MAX).is_empty());
        assert!(lattice.generate_ppqn_grid(1e16, 1e16 + 1.0).is_empty());
        assert!(lattice.generate_musical_grid(-1e300, -1e299).is_empty());
        // large but still exact: 2^40 s is a whole number of bars
        let far = (1u64 << 40) as f64;
        assert_eq!(lattice.generate_bar_grid(far, far + 1.0), vec![far]);
    }

    #[test]
    fn test_musical_grid() {
        let lattice = TimeLattice::new(24, 48_000.0);
        let grid = lattice.generate_musical_grid(1.9, 2.05);
        let first_of_bar_two = grid.iter().find(|mt| mt.bars == 2).unwrap();
        assert_eq!((first_of_bar_two.beats, first_of_bar_two.ticks), (1, 0));
        assert!(grid.windows(2).all(|w| (w[0].bars, w[0].beats, w[0].ticks) <= (w[1].bars, w[1].beats, w[1].ticks)));
    }
}
