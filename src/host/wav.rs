//! WAV file I/O for the offline host
//!
//! Reads 8/16/24/32-bit integer and 32-bit float WAV into planar `f32` and
//! writes 16, 24 or 32-bit (float) files. No resampling: processors run at
//! the file's own rate.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::buffer::AudioBuffer;
use crate::error::{HyperprismError, Result};
use crate::processor::MAX_CHANNELS;

/// Decoded audio with its sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    pub buffer: AudioBuffer,
    pub sample_rate: u32,
    /// Bit depth of the source file, reused on export by default
    pub bits_per_sample: u16,
}

/// Read a mono or stereo WAV file
pub fn read_wav(path: &Path) -> Result<WavAudio> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    if channels == 0 || channels > MAX_CHANNELS {
        return Err(HyperprismError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        });
    }

    let samples = read_samples_as_f32(reader, spec)?;
    let buffer = AudioBuffer::from_interleaved(&samples, channels)?;
    log::debug!(
        "Read {}: {} ch, {} Hz, {} bit, {} frames",
        path.display(),
        channels,
        spec.sample_rate,
        spec.bits_per_sample,
        buffer.num_samples()
    );

    Ok(WavAudio {
        buffer,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
    })
}

fn read_samples_as_f32<R: std::io::Read>(reader: WavReader<R>, spec: WavSpec) -> Result<Vec<f32>> {
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => Ok(reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?),
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = 1.0 / (1i64 << (bits - 1)) as f32;
            Ok(reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<Vec<_>, _>>()?)
        }
        (format, bits) => Err(HyperprismError::UnsupportedFormat {
            format: format!("{}-bit {:?}", bits, format),
        }),
    }
}

/// Write `buffer` as a WAV file at `bits_per_sample` (16, 24 or 32 float)
pub fn write_wav(path: &Path, buffer: &AudioBuffer, sample_rate: u32, bits_per_sample: u16) -> Result<()> {
    let sample_format = match bits_per_sample {
        16 | 24 => SampleFormat::Int,
        32 => SampleFormat::Float,
        other => {
            return Err(HyperprismError::UnsupportedFormat {
                format: format!("{}-bit output (only 16, 24, 32 supported)", other),
            })
        }
    };
    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate,
        bits_per_sample,
        sample_format,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for sample in buffer.to_interleaved() {
        match bits_per_sample {
            16 => writer.write_sample((sample * 32767.0).clamp(-32768.0, 32767.0) as i16)?,
            24 => writer.write_sample((sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32)?,
            _ => writer.write_sample(sample)?,
        }
    }
    writer.finalize()?;

    log::debug!(
        "Wrote {}: {} ch, {} Hz, {} bit",
        path.display(),
        buffer.num_channels(),
        sample_rate,
        bits_per_sample
    );
    Ok(())
}
