//! Planar audio buffer handed to `process_block`.

use crate::error::{HyperprismError, Result};

/// Planar audio block: one sample vector per channel, all the same length
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_samples]; num_channels],
        }
    }

    /// Wrap existing channel vectors
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self> {
        if let Some(first) = channels.first() {
            let len = first.len();
            if channels.iter().any(|c| c.len() != len) {
                return Err(HyperprismError::InvalidAudio {
                    reason: "channels have different lengths".to_string(),
                });
            }
        }
        Ok(Self { channels })
    }

    /// Build from interleaved frames `[L0, R0, L1, R1, ...]`
    pub fn from_interleaved(samples: &[f32], num_channels: usize) -> Result<Self> {
        if num_channels == 0 || samples.len() % num_channels != 0 {
            return Err(HyperprismError::InvalidAudio {
                reason: format!(
                    "Sample count {} is not divisible by channel count {}",
                    samples.len(),
                    num_channels
                ),
            });
        }
        let frames = samples.len() / num_channels;
        let mut buffer = Self::new(num_channels, frames);
        for (frame, chunk) in samples.chunks_exact(num_channels).enumerate() {
            for (ch, &sample) in chunk.iter().enumerate() {
                buffer.channels[ch][frame] = sample;
            }
        }
        Ok(buffer)
    }

    /// Interleave into `[L0, R0, L1, R1, ...]`
    pub fn to_interleaved(&self) -> Vec<f32> {
        let frames = self.num_samples();
        let mut out = Vec::with_capacity(frames * self.num_channels());
        for frame in 0..frames {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel
    pub fn num_samples(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.channels
    }

    /// Copy `len` samples per channel starting at `start` into a new buffer
    pub fn slice(&self, start: usize, len: usize) -> Self {
        let end = (start + len).min(self.num_samples());
        let start = start.min(end);
        Self {
            channels: self
                .channels
                .iter()
                .map(|c| c[start..end].to_vec())
                .collect(),
        }
    }

    /// Append the samples of `other` (channel counts must match)
    pub fn append(&mut self, other: &AudioBuffer) {
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            dst.extend_from_slice(src);
        }
    }

    /// Zero every sample
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Shorten every channel to `num_samples`
    pub fn truncate(&mut self, num_samples: usize) {
        for channel in &mut self.channels {
            channel.truncate(num_samples);
        }
    }

    /// Drop the first `count` samples of every channel
    pub fn drop_front(&mut self, count: usize) {
        for channel in &mut self.channels {
            let count = count.min(channel.len());
            channel.drain(..count);
        }
    }

    /// Check that every sample is finite
    pub fn is_valid(&self) -> bool {
        self.channels.iter().flatten().all(|s| s.is_finite())
    }

    /// RMS level in dB for a channel
    pub fn rms_db(&self, channel: usize) -> f64 {
        let Some(samples) = self.channels.get(channel) else {
            return f64::NEG_INFINITY;
        };
        if samples.is_empty() {
            return f64::NEG_INFINITY;
        }
        let sum_sq: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
        let rms = (sum_sq / samples.len() as f64).sqrt();
        if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Peak level in dB for a channel
    pub fn peak_db(&self, channel: usize) -> f64 {
        let Some(samples) = self.channels.get(channel) else {
            return f64::NEG_INFINITY;
        };
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        if peak > 0.0 {
            20.0 * (peak as f64).log10()
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Sine test tone on every channel
    pub fn sine(
        num_channels: usize,
        num_samples: usize,
        sample_rate: f64,
        frequency: f64,
        amplitude: f32,
    ) -> Self {
        let tone: Vec<f32> = (0..num_samples)
            .map(|n| {
                let t = n as f64 / sample_rate;
                amplitude * (std::f64::consts::TAU * frequency * t).sin() as f32
            })
            .collect();
        Self {
            channels: vec![tone; num_channels],
        }
    }
}
