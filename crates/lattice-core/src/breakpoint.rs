//! Breakpoint curves: ordered (time, value) control points

use serde::{Deserialize, Serialize};

/// A single control point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub time: f64,
    pub value: f64,
}

impl Breakpoint {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

impl From<(f64, f64)> for Breakpoint {
    fn from((time, value): (f64, f64)) -> Self {
        Self { time, value }
    }
}

/// Piecewise-linear curve. Every mutation leaves points sorted by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakpointCurve {
    points: Vec<Breakpoint>,
}

impl BreakpointCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from points in any order
    pub fn from_points(points: impl IntoIterator<Item = Breakpoint>) -> Self {
        let mut curve = Self {
            points: points.into_iter().collect(),
        };
        curve.sort();
        curve
    }

    pub fn points(&self) -> &[Breakpoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn add(&mut self, time: f64, value: f64) {
        self.points.push(Breakpoint::new(time, value));
        self.sort();
    }

    /// Move the point at `index`. Returns false if out of range.
    pub fn update(&mut self, index: usize, time: f64, value: f64) -> bool {
        let Some(point) = self.points.get_mut(index) else {
            return false;
        };
        *point = Breakpoint::new(time, value);
        self.sort();
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<Breakpoint> {
        (index < self.points.len()).then(|| self.points.remove(index))
    }

    /// Stable sort by time
    pub fn sort(&mut self) {
        self.points.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Thin the curve to roughly `target` points by keeping every
    /// `len / target`-th point, then re-append the final point if it was
    /// dropped.
    pub fn decimate(&mut self, target: usize) {
        if target == 0 || self.points.len() <= target {
            return;
        }
        let Some(&last) = self.points.last() else {
            return;
        };

        let step = self.points.len() / target;
        let mut kept: Vec<Breakpoint> = self.points.iter().step_by(step).take(target).copied().collect();

        if kept.last().is_some_and(|p| p.time != last.time) {
            kept.push(last);
        }
        self.points = kept;
    }

    /// Linearly interpolated value, held flat beyond either end
    pub fn value_at(&self, time: f64) -> f64 {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if time >= a.time && time <= b.time {
                let span = b.time - a.time;
                if span <= 0.0 {
                    return b.value;
                }
                return a.value + (time - a.time) / span * (b.value - a.value);
            }
        }
        last.value
    }
}

impl FromIterator<Breakpoint> for BreakpointCurve {
    fn from_iter<I: IntoIterator<Item = Breakpoint>>(iter: I) -> Self {
        Self::from_points(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(points: &[(f64, f64)]) -> BreakpointCurve {
        points.iter().copied().map(Breakpoint::from).collect()
    }

    #[test]
    fn test_mutations_keep_order() {
        let mut c = curve(&[(2.0, 0.2), (0.0, 0.0)]);
        c.add(1.0, 0.1);
        let times: Vec<f64> = c.points().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);

        assert!(c.update(0, 3.0, 0.3));
        let times: Vec<f64> = c.points().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);

        assert!(!c.update(10, 0.0, 0.0));
        assert_eq!(c.remove(1), Some(Breakpoint::new(2.0, 0.2)));
        assert_eq!(c.remove(5), None);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_value_at_interpolates_and_holds() {
        let c = curve(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        assert!((c.value_at(0.5) - 0.5).abs() < 1e-12);
        assert!((c.value_at(1.5) - 0.5).abs() < 1e-12);
        assert_eq!(c.value_at(-1.0), 0.0);
        assert_eq!(c.value_at(5.0), 0.0);
        assert_eq!(BreakpointCurve::new().value_at(1.0), 0.0);
        assert_eq!(curve(&[(1.0, 0.7)]).value_at(0.0), 0.7);
    }

    #[test]
    fn test_decimate_keeps_last_point() {
        let mut c: BreakpointCurve = (0..10).map(|i| Breakpoint::new(i as f64, i as f64)).collect();
        c.decimate(4);
        let times: Vec<f64> = c.points().iter().map(|p| p.time).collect();
        // step = 10 / 4 = 2
        assert_eq!(times, vec![0.0, 2.0, 4.0, 6.0, 9.0]);
    }

    #[test]
    fn test_decimate_noop_when_small() {
        let mut c = curve(&[(0.0, 0.0), (1.0, 1.0)]);
        c.decimate(5);
        assert_eq!(c.len(), 2);
        c.decimate(0);
        assert_eq!(c.len(), 2);
    }
}
