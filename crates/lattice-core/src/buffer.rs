//! Owned multi-channel sample buffer

use std::ops::Range;

/// Fixed-length planar f32 buffer. Channel `c` occupies
/// `data[c * len..(c + 1) * len]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    channels: usize,
    len: usize,
    data: Vec<f32>,
}

impl AudioBuffer {
    /// Zero-filled buffer
    pub fn new(channels: usize, len: usize) -> Self {
        Self {
            channels,
            len,
            data: vec![0.0; channels * len],
        }
    }

    /// Build from per-channel vectors. Shorter channels are zero-padded to
    /// the longest.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        let len = channels.iter().map(Vec::len).max().unwrap_or(0);
        let mut buffer = Self::new(channels.len(), len);
        for (ch, samples) in channels.iter().enumerate() {
            buffer.channel_mut(ch)[..samples.len()].copy_from_slice(samples);
        }
        buffer
    }

    /// De-interleave frames of `channels` samples. A trailing partial frame
    /// is dropped.
    pub fn from_interleaved(samples: &[f32], channels: usize) -> Self {
        if channels == 0 {
            return Self::default();
        }
        let len = samples.len() / channels;
        let mut buffer = Self::new(channels, len);
        for (i, frame) in samples.chunks_exact(channels).enumerate() {
            for (ch, &s) in frame.iter().enumerate() {
                buffer.data[ch * len + i] = s;
            }
        }
        buffer
    }

    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.data.len());
        for i in 0..self.len {
            for ch in 0..self.channels {
                out.push(self.data[ch * self.len + i]);
            }
        }
        out
    }

    pub fn num_channels(&self) -> usize {
        self.channels
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0 || self.channels == 0
    }

    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.data[ch * self.len..(ch + 1) * self.len]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        &mut self.data[ch * self.len..(ch + 1) * self.len]
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0
        self.data.chunks_exact(self.len.max(1)).take(self.channels)
    }

    /// Sample value, or 0.0 outside the buffer
    pub fn sample(&self, ch: usize, index: usize) -> f32 {
        if ch < self.channels && index < self.len {
            self.data[ch * self.len + index]
        } else {
            0.0
        }
    }

    pub fn set_sample(&mut self, ch: usize, index: usize, value: f32) {
        if ch < self.channels && index < self.len {
            self.data[ch * self.len + index] = value;
        }
    }

    /// Clamp a sample range to this buffer
    pub fn clamp_range(&self, range: Range<usize>) -> Range<usize> {
        let start = range.start.min(self.len);
        let end = range.end.clamp(start, self.len);
        start..end
    }

    /// Copy of `range` across all channels
    pub fn slice(&self, range: Range<usize>) -> AudioBuffer {
        let range = self.clamp_range(range);
        let mut out = AudioBuffer::new(self.channels, range.len());
        for ch in 0..self.channels {
            out.channel_mut(ch).copy_from_slice(&self.channel(ch)[range.clone()]);
        }
        out
    }

    /// Overwrite `dest_ch` from `dest_start` with `src_range` of `src_ch`.
    /// Both sides are clipped to their buffers.
    pub fn copy_from(
        &mut self,
        dest_ch: usize,
        dest_start: usize,
        src: &AudioBuffer,
        src_ch: usize,
        src_range: Range<usize>,
    ) {
        self.write_from(dest_ch, dest_start, src, src_ch, src_range, |d, s| *d = s);
    }

    /// Mix `src_range` of `src_ch` into `dest_ch` starting at `dest_start`
    pub fn add_from(
        &mut self,
        dest_ch: usize,
        dest_start: usize,
        src: &AudioBuffer,
        src_ch: usize,
        src_range: Range<usize>,
    ) {
        self.write_from(dest_ch, dest_start, src, src_ch, src_range, |d, s| *d += s);
    }

    fn write_from(
        &mut self,
        dest_ch: usize,
        dest_start: usize,
        src: &AudioBuffer,
        src_ch: usize,
        src_range: Range<usize>,
        op: impl Fn(&mut f32, f32),
    ) {
        if dest_ch >= self.channels || src_ch >= src.channels || dest_start >= self.len {
            return;
        }
        let src_range = src.clamp_range(src_range);
        let count = src_range.len().min(self.len - dest_start);
        let source = &src.channel(src_ch)[src_range.start..src_range.start + count];
        let dest = &mut self.channel_mut(dest_ch)[dest_start..dest_start + count];
        for (d, &s) in dest.iter_mut().zip(source) {
            op(d, s);
        }
    }

    /// Append `other` after this buffer's content. Channels beyond
    /// `other`'s count are padded with silence.
    pub fn concat(&self, other: &AudioBuffer) -> AudioBuffer {
        let channels = self.channels.max(other.channels);
        let mut out = AudioBuffer::new(channels, self.len + other.len);
        for ch in 0..channels {
            out.copy_from(ch, 0, self, ch, 0..self.len);
            out.copy_from(ch, self.len, other, ch, 0..other.len);
        }
        out
    }
}
