//! Offline host: drives a processor over a whole buffer block by block.

use crate::buffer::AudioBuffer;
use crate::config::RenderConfig;
use crate::dsp::ms_to_samples;
use crate::error::{HyperprismError, Result};
use crate::processor::{ProcessSpec, Processor};

/// Summary of a finished render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    /// Frames in the rendered output
    pub frames: usize,
    pub blocks: usize,
    /// Samples trimmed from the front for latency compensation
    pub latency_trimmed: usize,
    /// Meter readings after the last block
    pub meters: Vec<(&'static str, f32)>,
}

/// Render `input` through `processor`
///
/// The processor is prepared for the input's channel count and
/// `config.block_size`, then released again once the meters have been read.
/// With latency compensation on, `latency_samples()` of extra silence are fed
/// and the same number of samples dropped from the front, so the output lines
/// up with the input. `tail_ms` of silence is appended after the input.
pub fn render(
    processor: &mut dyn Processor,
    input: &AudioBuffer,
    sample_rate: f64,
    config: &RenderConfig,
) -> Result<(AudioBuffer, RenderReport)> {
    config.validate()?;

    let channels = input.num_channels();
    if !processor.is_bus_layout_supported(channels, channels) {
        return Err(HyperprismError::UnsupportedLayout {
            inputs: channels,
            outputs: channels,
        });
    }

    let spec = ProcessSpec::new(sample_rate, config.block_size, channels);
    processor.prepare(spec);

    let latency = if config.latency_compensation {
        processor.latency_samples()
    } else {
        0
    };
    let tail = ms_to_samples(config.tail_ms, sample_rate as f32);
    let total = input.num_samples() + tail + latency;
    log::info!(
        "Rendering {} frames through {} ({} ch, {} Hz, block {}, latency {})",
        input.num_samples(),
        processor.effect_id(),
        channels,
        sample_rate,
        config.block_size,
        latency
    );

    let mut output = AudioBuffer::new(channels, 0);
    let mut blocks = 0;
    let mut start = 0;
    while start < total {
        let len = config.block_size.min(total - start);
        let mut block = AudioBuffer::new(channels, len);
        let available = input.num_samples().saturating_sub(start).min(len);
        if available > 0 {
            for (dst, src) in block.channels_mut().iter_mut().zip(input.channels()) {
                dst[..available].copy_from_slice(&src[start..start + available]);
            }
        }
        processor.process_block(&mut block);
        output.append(&block);
        start += len;
        blocks += 1;
    }

    output.drop_front(latency);
    let meters = processor.meters().readings();
    processor.release();

    for (name, value) in &meters {
        log::info!("  {}: {:.4}", name, value);
    }
    if !output.is_valid() {
        log::warn!("Rendered output contains non-finite samples");
    }

    let report = RenderReport {
        frames: output.num_samples(),
        blocks,
        latency_trimmed: latency,
        meters,
    };
    Ok((output, report))
}
