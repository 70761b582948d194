//! Processor contract between a host and an effect core.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::buffer::AudioBuffer;
use crate::error::Result;
use crate::meters::MeterBank;
use crate::params::{ParamRange, ParameterStore};
use crate::state;

/// Most channels any processor accepts
pub const MAX_CHANNELS: usize = 2;

/// Processing configuration, frozen between `prepare` and `release`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    pub sample_rate: f64,
    pub max_block_size: usize,
    pub num_channels: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f64, max_block_size: usize, num_channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            num_channels,
        }
    }

    /// Sample rate as `f32` for coefficient math
    #[inline]
    pub fn rate(&self) -> f32 {
        self.sample_rate as f32
    }
}

impl Default for ProcessSpec {
    fn default() -> Self {
        Self::new(48000.0, 512, 2)
    }
}

/// An effect processor driven by a host
///
/// `process_block` runs on the audio thread and must not allocate, lock, log
/// or fail. Everything else runs on the control thread.
pub trait Processor: Send {
    /// Stable effect identifier (used in persisted state)
    fn effect_id(&self) -> &'static str;

    /// Human-readable name
    fn display_name(&self) -> &'static str;

    /// Parameter table shared with the host
    fn parameters(&self) -> &Arc<ParameterStore>;

    /// Meters published at block end
    fn meters(&self) -> &Arc<MeterBank>;

    /// Allocate and zero all DSP state for `spec`. May be called repeatedly.
    fn prepare(&mut self, spec: ProcessSpec);

    /// Free DSP state; `process_block` outputs silence until the next `prepare`
    fn release(&mut self);

    /// Zero DSP state (filter memory, envelopes, phases, delay lines)
    fn reset(&mut self);

    fn is_prepared(&self) -> bool;

    /// Process `buffer` in place
    fn process_block(&mut self, buffer: &mut AudioBuffer);

    /// Delay introduced by lookahead, in samples
    fn latency_samples(&self) -> usize {
        0
    }

    /// Mono or stereo, equal in and out
    fn is_bus_layout_supported(&self, inputs: usize, outputs: usize) -> bool {
        inputs == outputs && (1..=MAX_CHANNELS).contains(&inputs)
    }

    /// Serialize current parameter values
    fn get_state(&self) -> Result<Vec<u8>> {
        state::encode(self.parameters())
    }

    /// Restore parameter values; rejected data leaves every parameter unchanged
    fn set_state(&mut self, data: &[u8]) -> Result<()> {
        state::decode_into(self.parameters(), data).map(|_| ())
    }

    /// Publish a parameter value by id
    fn set_param(&self, id: &str, value: f32) -> Result<()> {
        self.parameters().set(id, value)
    }

    /// All parameters with ranges and current values as JSON
    fn get_params(&self) -> Value {
        let params: Vec<Value> = self
            .parameters()
            .iter()
            .map(|param| {
                let d = param.descriptor();
                let mut entry = json!({
                    "id": d.id,
                    "label": d.label,
                    "value": param.get(),
                    "default": d.default,
                    "display": param.display(),
                });
                match d.range {
                    ParamRange::Choice { options } => {
                        entry["options"] = json!(options);
                    }
                    range => {
                        entry["min"] = json!(range.min());
                        entry["max"] = json!(range.max());
                        entry["unit"] = json!(d.unit);
                    }
                }
                entry
            })
            .collect();

        json!({
            "effect": self.effect_id(),
            "name": self.display_name(),
            "latency_samples": self.latency_samples(),
            "params": params,
        })
    }
}

/// Common block preamble
///
/// Returns the prepared spec and the number of channels to process, or `None`
/// when the processor is not prepared (the buffer is then silenced). Channels
/// beyond the prepared count are zeroed.
#[inline]
pub(crate) fn begin_block(
    spec: Option<ProcessSpec>,
    buffer: &mut AudioBuffer,
) -> Option<(ProcessSpec, usize)> {
    let Some(spec) = spec else {
        buffer.clear();
        return None;
    };
    debug_assert!(
        buffer.num_samples() <= spec.max_block_size,
        "block of {} samples exceeds prepared maximum {}",
        buffer.num_samples(),
        spec.max_block_size
    );
    let active = spec.num_channels.min(buffer.num_channels());
    for channel in buffer.channels_mut().iter_mut().skip(active) {
        channel.fill(0.0);
    }
    Some((spec, active))
}

/// Implements the identity and shared-handle accessors of `Processor`
///
/// Expects `params`, `meters` and `spec: Option<ProcessSpec>` fields.
#[macro_export]
macro_rules! impl_processor_common {
    ($effect_id:expr, $display_name:expr) => {
        fn effect_id(&self) -> &'static str {
            $effect_id
        }

        fn display_name(&self) -> &'static str {
            $display_name
        }

        fn parameters(&self) -> &std::sync::Arc<$crate::params::ParameterStore> {
            &self.params
        }

        fn meters(&self) -> &std::sync::Arc<$crate::meters::MeterBank> {
            &self.meters
        }

        fn is_prepared(&self) -> bool {
            self.spec.is_some()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_block_silences_when_unprepared() {
        let mut buffer = AudioBuffer::sine(2, 64, 48000.0, 440.0, 0.5);
        assert_eq!(begin_block(None, &mut buffer), None);
        assert!(buffer.channels().iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn test_begin_block_zeroes_extra_channels() {
        let spec = ProcessSpec::new(48000.0, 64, 1);
        let mut buffer = AudioBuffer::sine(2, 64, 48000.0, 440.0, 0.5);
        assert_eq!(begin_block(Some(spec), &mut buffer), Some((spec, 1)));
        assert!(buffer.channel(0).iter().any(|&s| s != 0.0));
        assert!(buffer.channel(1).iter().all(|&s| s == 0.0));
    }
}
