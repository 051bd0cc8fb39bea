//! Time domains and bars:beats:ticks musical time

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LatticeError;

/// The time representations the lattice converts between. Seconds is the
/// pivot: every conversion goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeDomain {
    /// Absolute sample count
    AudioSamples,
    /// Real-time seconds
    Seconds,
    /// PPQN-based ticks
    MusicalTicks,
    /// `bars * 1_000_000 + beats * 1_000 + ticks`
    BarsBeatsTicks,
    /// 30 fps frames, no drop-frame
    SmpteFrames,
}

impl TimeDomain {
    pub const ALL: [TimeDomain; 5] = [
        Self::AudioSamples,
        Self::Seconds,
        Self::MusicalTicks,
        Self::BarsBeatsTicks,
        Self::SmpteFrames,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AudioSamples => "samples",
            Self::Seconds => "seconds",
            Self::MusicalTicks => "ticks",
            Self::BarsBeatsTicks => "bbt",
            Self::SmpteFrames => "frames",
        }
    }
}

impl FromStr for TimeDomain {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LatticeError::Parse(format!("unknown time domain '{s}'")))
    }
}

/// Position in bars, beats and ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MusicalTime {
    /// 1-based
    pub bars: i32,
    /// 1-based
    pub beats: i32,
    /// 0-based
    pub ticks: i32,
    /// Sub-tick fraction in [0, 1)
    pub remainder: f64,
}

impl Default for MusicalTime {
    fn default() -> Self {
        Self {
            bars: 1,
            beats: 1,
            ticks: 0,
            remainder: 0.0,
        }
    }
}

impl MusicalTime {
    pub fn new(bars: i32, beats: i32, ticks: i32) -> Self {
        Self {
            bars,
            beats,
            ticks,
            remainder: 0.0,
        }
    }

    /// Compact numeric form used by the generic converter
    pub fn encode(&self) -> f64 {
        self.bars as f64 * 1_000_000.0 + self.beats as f64 * 1_000.0 + self.ticks as f64
    }

    /// Inverse of [`encode`](Self::encode); the fractional part is truncated
    pub fn decode(value: f64) -> Self {
        let encoded = value as i64;
        Self::new(
            (encoded / 1_000_000) as i32,
            ((encoded % 1_000_000) / 1_000) as i32,
            (encoded % 1_000) as i32,
        )
    }
}

impl fmt::Display for MusicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}:{:02}:{:03}", self.bars, self.beats, self.ticks)
    }
}

impl FromStr for MusicalTime {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .trim()
            .split(|c: char| !(c.is_ascii_digit() || c == '-'))
            .filter(|p| !p.is_empty())
            .collect();

        let [bars, beats, ticks] = parts.as_slice() else {
            return Err(LatticeError::Parse(format!("invalid musical time '{s}'")));
        };

        let field = |p: &str| p.parse::<i32>().map_err(|_| LatticeError::Parse(format!("invalid musical time '{s}'")));
        Ok(Self::new(field(bars)?, field(beats)?, field(ticks)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(MusicalTime::new(1, 1, 0).to_string(), "001:01:000");
        assert_eq!(MusicalTime::new(12, 3, 480).to_string(), "012:03:480");
    }

    #[test]
    fn test_parse() {
        let mt: MusicalTime = "002:04:120".parse().unwrap();
        assert_eq!(mt, MusicalTime::new(2, 4, 120));

        let mt: MusicalTime = "3.2.15".parse().unwrap();
        assert_eq!(mt, MusicalTime::new(3, 2, 15));

        assert!("1:2".parse::<MusicalTime>().is_err());
        assert!("bar one".parse::<MusicalTime>().is_err());
    }

    #[test]
    fn test_encode_decode() {
        let mt = MusicalTime::new(5, 3, 240);
        assert_eq!(mt.encode(), 5_003_240.0);
        assert_eq!(MusicalTime::decode(5_003_240.7), mt);
    }

    #[test]
    fn test_domain_names() {
        for domain in TimeDomain::ALL {
            assert_eq!(domain.name().parse::<TimeDomain>().unwrap(), domain);
        }
        assert!("parsecs".parse::<TimeDomain>().is_err());
    }
}
