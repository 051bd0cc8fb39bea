//! WAV file I/O via hound

use std::path::Path;

use lattice_core::AudioBuffer;
use tracing::info;

use crate::error::{Result, ServiceError};

const WRITE_BITS: u16 = 24;

/// Read a WAV file into a planar buffer. Integer formats are scaled to
/// [-1, 1]. Returns the buffer and its sample rate.
pub fn read_wav(path: &Path) -> Result<(AudioBuffer, u32)> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let buffer = AudioBuffer::from_interleaved(&interleaved, spec.channels as usize);
    info!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        samples = buffer.len(),
        "Loaded WAV"
    );
    Ok((buffer, spec.sample_rate))
}

/// Write a buffer as 24-bit PCM. Samples are clamped to [-1, 1].
pub fn write_wav(path: &Path, buffer: &AudioBuffer, sample_rate: u32) -> Result<()> {
    if buffer.num_channels() == 0 {
        return Err(ServiceError::Format("cannot write a buffer with no channels".into()));
    }
    let channels = u16::try_from(buffer.num_channels())
        .map_err(|_| ServiceError::Format(format!("too many channels: {}", buffer.num_channels())))?;

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: WRITE_BITS,
        sample_format: hound::SampleFormat::Int,
    };
    let max_val = ((1_i32 << (WRITE_BITS - 1)) - 1) as f32;

    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in buffer.to_interleaved() {
        writer.write_sample((sample.clamp(-1.0, 1.0) * max_val) as i32)?;
    }
    writer.finalize()?;

    info!(path = %path.display(), channels, sample_rate, samples = buffer.len(), "Wrote WAV");
    Ok(())
}
