//! lattice: command-line front end for the time lattice

mod config;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lattice_core::{AudioBuffer, QuantizeMode, TimeDomain, TimeLattice, ValueResolution};
use lattice_services::{
    apply_gain_curve, apply_pan_curve, isolate_transients, read_wav, split_by_beats, write_wav, BreakpointFile,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{load_config, LatticeConfig};

#[derive(Parser)]
#[command(name = "lattice", about = "Sample-accurate time grid for audio editing")]
struct Cli {
    /// Config file (defaults to <config dir>/lattice/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    ppqn: Option<u32>,
    #[arg(long, global = true)]
    bpm: Option<f64>,
    /// Used by commands that take no audio file
    #[arg(long, global = true)]
    sample_rate: Option<f64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a time value between domains
    Convert {
        value: f64,
        /// samples, seconds, ticks, bbt or frames
        #[arg(long, default_value = "seconds")]
        from: TimeDomain,
        #[arg(long, default_value = "bbt")]
        to: TimeDomain,
    },
    /// List grid points in a time range
    Grid {
        #[arg(long, value_enum, default_value_t = GridKind::Beats)]
        kind: GridKind,
        #[arg(long, default_value_t = 0.0)]
        start: f64,
        #[arg(long)]
        end: f64,
    },
    /// Snap a time to the grid
    Quantize {
        time: f64,
        #[arg(long, value_enum, default_value_t = Mode::Nearest)]
        mode: Mode,
        #[arg(long, value_enum, default_value_t = Unit::Tick)]
        unit: Unit,
    },
    /// Quantize and simplify every curve in a breakpoint file
    Curve {
        input: PathBuf,
        output: PathBuf,
        /// 7, 14, 24 or 32 (defaults to the configured resolution)
        #[arg(long)]
        resolution: Option<ValueResolution>,
    },
    /// Keep [start, end)
    Trim { input: PathBuf, output: PathBuf, start: f64, end: f64 },
    /// Remove [start, end)
    Cut { input: PathBuf, output: PathBuf, start: f64, end: f64 },
    /// Split at the given times into <dir>/part_N.wav
    Split {
        input: PathBuf,
        dir: PathBuf,
        #[arg(value_delimiter = ',')]
        times: Vec<f64>,
    },
    /// Shift audio by seconds (negative = earlier)
    Nudge {
        input: PathBuf,
        output: PathBuf,
        #[arg(allow_hyphen_values = true)]
        amount: f64,
        /// Keep the original samples in the vacated region
        #[arg(long)]
        keep: bool,
    },
    /// Resample to `factor` times the length
    Stretch { input: PathBuf, output: PathBuf, factor: f64 },
    /// Join two files with an equal-power crossfade
    Crossfade {
        first: PathBuf,
        second: PathBuf,
        output: PathBuf,
        /// Seconds (defaults to the configured crossfade)
        #[arg(long)]
        duration: Option<f64>,
    },
    /// Print detected transients
    Transients {
        input: PathBuf,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Detect beats; optionally save them as marker JSON
    Beats {
        input: PathBuf,
        #[arg(long)]
        markers: Option<PathBuf>,
        /// Also write each inter-beat segment to this directory
        #[arg(long)]
        split_dir: Option<PathBuf>,
    },
    /// Repeat a region, boundaries moved to zero crossings
    Loop {
        input: PathBuf,
        output: PathBuf,
        start: f64,
        end: f64,
        #[arg(long, default_value_t = 4)]
        repeats: usize,
    },
    /// Stretch segments so detected beats land on quarter notes
    Warp { input: PathBuf, output: PathBuf },
    /// Apply a breakpoint file's first curve as gain or pan
    Apply {
        input: PathBuf,
        breakpoints: PathBuf,
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = Target::Gain)]
        target: Target,
        #[arg(long, default_value_t = 1.0)]
        intensity: f32,
    },
    /// Silence everything but 50 ms around each transient
    Isolate {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        sensitivity: Option<f64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GridKind {
    Ticks,
    Beats,
    Bars,
    Musical,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Nearest,
    Floor,
    Ceil,
}

impl From<Mode> for QuantizeMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Nearest => QuantizeMode::Nearest,
            Mode::Floor => QuantizeMode::Floor,
            Mode::Ceil => QuantizeMode::Ceil,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Unit {
    Tick,
    Beat,
    Bar,
}

#[derive(Clone, Copy, ValueEnum)]
enum Target {
    Gain,
    Pan,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("lattice=info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref());
    if let Some(ppqn) = cli.ppqn {
        config.ppqn = ppqn;
    }
    if let Some(bpm) = cli.bpm {
        config.bpm = bpm;
    }
    if let Some(rate) = cli.sample_rate {
        config.sample_rate = rate;
    }

    run(cli.command, &config)
}

fn run(command: Command, config: &LatticeConfig) -> Result<()> {
    let mut lattice = config.build_lattice();

    match command {
        Command::Convert { value, from, to } => {
            let converted = lattice.convert(value, from, to);
            if to == TimeDomain::BarsBeatsTicks {
                let seconds = lattice.to_seconds(value, from);
                println!("{converted} ({})", lattice.seconds_to_musical(seconds));
            } else {
                println!("{converted}");
            }
        }
        Command::Grid { kind, start, end } => match kind {
            GridKind::Ticks => print_times(&lattice.generate_ppqn_grid(start, end)),
            GridKind::Beats => print_times(&lattice.generate_beat_grid(start, end)),
            GridKind::Bars => print_times(&lattice.generate_bar_grid(start, end)),
            GridKind::Musical => {
                for mt in lattice.generate_musical_grid(start, end) {
                    println!("{mt}");
                }
            }
        },
        Command::Quantize { time, mode, unit } => {
            let mode = QuantizeMode::from(mode);
            let snapped = match unit {
                Unit::Tick => lattice.quantize_to_grid(time, mode),
                Unit::Beat => lattice.quantize_to_beat(time, mode),
                Unit::Bar => lattice.quantize_to_bar(time, mode),
            };
            println!("{snapped:.9}");
        }
        Command::Curve { input, output, resolution } => {
            let mut file = BreakpointFile::load(&input)?;
            let resolution = resolution.unwrap_or(config.resolution);
            for out in &mut file.outputs {
                let before = out.curve.len();
                lattice.quantize_curve(&mut out.curve, resolution);
                info!(output = %out.name, before, after = out.curve.len(), "Quantized curve");
            }
            file.save(&output)?;
        }
        Command::Trim { input, output, start, end } => {
            let (buf, rate) = load(&mut lattice, &input)?;
            write_wav(&output, &lattice.trim(&buf, start, end), rate)?;
        }
        Command::Cut { input, output, start, end } => {
            let (buf, rate) = load(&mut lattice, &input)?;
            write_wav(&output, &lattice.cut(&buf, start, end), rate)?;
        }
        Command::Split { input, dir, times } => {
            let (buf, rate) = load(&mut lattice, &input)?;
            write_parts(&dir, &lattice.split(&buf, &times), rate)?;
        }
        Command::Nudge { input, output, amount, keep } => {
            let (buf, rate) = load(&mut lattice, &input)?;
            write_wav(&output, &lattice.nudge(&buf, amount, !keep), rate)?;
        }
        Command::Stretch { input, output, factor } => {
            let (buf, rate) = load(&mut lattice, &input)?;
            write_wav(&output, &lattice.time_stretch(&buf, factor), rate)?;
        }
        Command::Crossfade { first, second, output, duration } => {
            let (a, rate) = load(&mut lattice, &first)?;
            let (b, rate_b) = read_wav(&second)?;
            if rate != rate_b {
                bail!("sample rates differ: {rate} Hz vs {rate_b} Hz");
            }
            let duration = duration.unwrap_or(config.crossfade_seconds);
            write_wav(&output, &lattice.crossfade(&a, &b, duration), rate)?;
        }
        Command::Transients { input, threshold } => {
            let (buf, _) = load(&mut lattice, &input)?;
            print_times(&lattice.detect_transients(&buf, threshold.unwrap_or(config.transient_threshold)));
        }
        Command::Beats { input, markers, split_dir } => {
            let (buf, rate) = load(&mut lattice, &input)?;
            for beat in lattice.detect_beats(&buf) {
                println!("{:.6}\t{}\t{}", beat.time_secs, lattice.seconds_to_musical(beat.time_secs), beat.label);
                lattice.add_marker(beat.time_secs, beat.label, beat.color);
            }
            if let Some(path) = markers {
                fs::write(&path, lattice.export_markers_json()?)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            if let Some(dir) = split_dir {
                write_parts(&dir, &split_by_beats(&lattice, &buf), rate)?;
            }
        }
        Command::Loop { input, output, start, end, repeats } => {
            let (buf, rate) = load(&mut lattice, &input)?;
            let (start, end) = lattice.find_best_loop_points(&buf, start, end);
            info!(start, end, repeats, "Loop points");
            write_wav(&output, &lattice.create_loop(&buf, start, end, repeats), rate)?;
        }
        Command::Warp { input, output } => {
            let (buf, rate) = load(&mut lattice, &input)?;
            let beats: Vec<f64> = lattice.detect_beats(&buf).iter().map(|b| b.time_secs).collect();
            write_wav(&output, &lattice.warp_to_grid(&buf, &beats), rate)?;
        }
        Command::Apply { input, breakpoints, output, target, intensity } => {
            let (buf, rate) = load(&mut lattice, &input)?;
            let file = BreakpointFile::load(&breakpoints)?;
            let Some(first) = file.outputs.first() else {
                bail!("{} has no curves", breakpoints.display());
            };
            let processed = match target {
                Target::Gain => apply_gain_curve(&buf, &first.curve, rate as f64, intensity),
                Target::Pan => apply_pan_curve(&buf, &first.curve, rate as f64, intensity),
            };
            write_wav(&output, &processed, rate)?;
        }
        Command::Isolate { input, output, sensitivity } => {
            let (buf, rate) = load(&mut lattice, &input)?;
            let sensitivity = sensitivity.unwrap_or(config.transient_threshold);
            write_wav(&output, &isolate_transients(&lattice, &buf, sensitivity), rate)?;
        }
    }
    Ok(())
}

/// Read a WAV file and adopt its sample rate
fn load(lattice: &mut TimeLattice, path: &Path) -> Result<(AudioBuffer, u32)> {
    let (buf, rate) = read_wav(path).with_context(|| format!("reading {}", path.display()))?;
    lattice.set_sample_rate(rate as f64);
    Ok((buf, rate))
}

fn write_parts(dir: &Path, parts: &[AudioBuffer], rate: u32) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        write_wav(&dir.join(format!("part_{}.wav", i + 1)), part, rate)?;
    }
    info!(dir = %dir.display(), parts = parts.len(), "Wrote segments");
    Ok(())
}

fn print_times(times: &[f64]) {
    for t in times {
        println!("{t:.6}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["lattice", "--bpm", "90", "convert", "2.0", "--to", "ticks"]).unwrap();
        assert_eq!(cli.bpm, Some(90.0));
        assert!(matches!(
            cli.command,
            Command::Convert { from: TimeDomain::Seconds, to: TimeDomain::MusicalTicks, .. }
        ));

        let cli = Cli::try_parse_from(["lattice", "split", "in.wav", "out", "0.5,1.5"]).unwrap();
        let Command::Split { times, .. } = cli.command else {
            panic!("expected split");
        };
        assert_eq!(times, vec![0.5, 1.5]);

        let cli = Cli::try_parse_from(["lattice", "nudge", "in.wav", "out.wav", "-0.25"]).unwrap();
        assert!(matches!(cli.command, Command::Nudge { amount, keep: false, .. } if amount == -0.25));

        assert!(Cli::try_parse_from(["lattice", "convert", "1", "--from", "hours"]).is_err());
    }

    #[test]
    fn test_edit_commands_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let buf = AudioBuffer::from_channels(vec![vec![0.25; 4800]]);
        write_wav(&input, &buf, 48_000).unwrap();
        let config = LatticeConfig::default();

        let trimmed = dir.path().join("trim.wav");
        run(
            Command::Trim { input: input.clone(), output: trimmed.clone(), start: 0.01, end: 0.05 },
            &config,
        )
        .unwrap();
        assert_eq!(read_wav(&trimmed).unwrap().0.len(), 1920);

        let parts = dir.path().join("parts");
        run(Command::Split { input: input.clone(), dir: parts.clone(), times: vec![0.025] }, &config).unwrap();
        assert!(parts.join("part_1.wav").exists());
        assert!(parts.join("part_2.wav").exists());

        let missing = run(
            Command::Stretch { input: dir.path().join("missing.wav"), output: trimmed, factor: 2.0 },
            &config,
        );
        assert!(missing.is_err());
    }
}
