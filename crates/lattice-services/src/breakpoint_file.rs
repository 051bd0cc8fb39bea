//! Plain-text breakpoint files.
//!
//! ```text
//! # Audio Workshop Breakpoint File
//! # Feature: Amplitude
//! # Source: drums.wav
//! # Sample Rate: 48000 Hz
//! # Format: time(seconds) value
//!
//! # Envelope
//! 0.000000	0.000000
//! 0.500000	1.000000
//!
//! ```

use std::fs;
use std::path::Path;

use lattice_core::{Breakpoint, BreakpointCurve};
use tracing::{debug, info};

use crate::error::{Result, ServiceError};

const TITLE: &str = "# Audio Workshop Breakpoint File";
const FEATURE: &str = "# Feature:";
const SOURCE: &str = "# Source:";
const SAMPLE_RATE: &str = "# Sample Rate:";
const FORMAT: &str = "# Format: time(seconds) value";

/// Header lines that never start an output block
const RESERVED: [&str; 6] = ["# Feature:", "# Source:", "# Sample Rate:", "# Generated:", "# Format:", "# Audio"];

/// One named curve in a file
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointOutput {
    pub name: String,
    pub curve: BreakpointCurve,
}

/// A feature's breakpoint curves plus the header describing their source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreakpointFile {
    pub feature: String,
    pub source: String,
    pub sample_rate: f64,
    pub outputs: Vec<BreakpointOutput>,
}

impl BreakpointFile {
    pub fn new(feature: impl Into<String>, source: impl Into<String>, sample_rate: f64) -> Self {
        Self {
            feature: feature.into(),
            source: source.into(),
            sample_rate,
            outputs: Vec::new(),
        }
    }

    pub fn push_output(&mut self, name: impl Into<String>, curve: BreakpointCurve) {
        self.outputs.push(BreakpointOutput {
            name: name.into(),
            curve,
        });
    }

    /// Parse file text. Unknown `#` lines open a new output; data lines
    /// need two numeric tokens and anything else is skipped. Outputs with
    /// no points are dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut file = Self::default();
        let mut name: Option<String> = None;
        let mut points: Vec<Breakpoint> = Vec::new();
        let mut skipped = 0usize;

        for line in text.lines() {
            if let Some(rest) = line.strip_prefix(FEATURE) {
                file.feature = rest.trim().to_string();
                continue;
            }
            if let Some(rest) = line.strip_prefix(SOURCE) {
                file.source = rest.trim().to_string();
                continue;
            }
            if let Some(rest) = line.strip_prefix(SAMPLE_RATE) {
                file.sample_rate = rest.trim().trim_end_matches("Hz").trim().parse().unwrap_or(0.0);
                continue;
            }
            if let Some(rest) = line.strip_prefix('#') {
                if !RESERVED.iter().any(|r| line.starts_with(r)) {
                    file.flush_output(name.take(), &mut points);
                    name = Some(rest.trim().to_string());
                }
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }

            let mut tokens = line.split([' ', '\t']).filter(|t| !t.is_empty());
            match (tokens.next().map(str::parse::<f64>), tokens.next().map(str::parse::<f64>)) {
                (Some(Ok(time)), Some(Ok(value))) => points.push(Breakpoint::new(time, value)),
                _ => skipped += 1,
            }
        }
        file.flush_output(name, &mut points);

        if file.outputs.is_empty() {
            return Err(ServiceError::Format("no breakpoint data".into()));
        }
        debug!(feature = %file.feature, outputs = file.outputs.len(), skipped, "Parsed breakpoint file");
        Ok(file)
    }

    fn flush_output(&mut self, name: Option<String>, points: &mut Vec<Breakpoint>) {
        if points.is_empty() {
            return;
        }
        let name = name.unwrap_or_else(|| format!("Output {}", self.outputs.len() + 1));
        self.push_output(name, BreakpointCurve::from_points(points.drain(..)));
    }

    /// Render with six-decimal values, one tab-separated pair per line
    pub fn render(&self) -> String {
        let mut out = format!(
            "{TITLE}\n{FEATURE} {}\n{SOURCE} {}\n{SAMPLE_RATE} {} Hz\n{FORMAT}\n\n",
            self.feature, self.source, self.sample_rate
        );
        for output in &self.outputs {
            out.push_str(&format!("# {}\n", output.name));
            for p in output.curve.points() {
                out.push_str(&format!("{:.6}\t{:.6}\n", p.time, p.value));
            }
            out.push('\n');
        }
        out
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = Self::parse(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), feature = %file.feature, "Loaded breakpoint file");
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())?;
        info!(path = %path.display(), outputs = self.outputs.len(), "Saved breakpoint file");
        Ok(())
    }
}
