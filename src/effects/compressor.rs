//! Compressor with soft knee and parallel mix
//!
//! Feed-forward, per-sample peak detection in dB. The gain computer output is
//! smoothed with separate attack/release one-pole coefficients, then makeup
//! and a dry/wet blend are applied.

use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::dsp::{db_to_linear, time_to_coeff, GainSmoother, LEVEL_EPSILON};
use crate::meters::MeterBank;
use crate::params::{ParamDescriptor, ParameterStore, Smoother};
use crate::processor::{begin_block, ProcessSpec, Processor};

pub const ID: &str = "compressor";

const THRESHOLD: usize = 0;
const RATIO: usize = 1;
const ATTACK: usize = 2;
const RELEASE: usize = 3;
const KNEE: usize = 4;
const MAKEUP: usize = 5;
const MIX: usize = 6;

pub const PARAMS: [ParamDescriptor; 7] = [
    ParamDescriptor::linear("threshold", "Threshold", "dB", -60.0, 0.0, -20.0),
    ParamDescriptor::skewed("ratio", "Ratio", ":1", 1.0, 20.0, 0.5, 4.0),
    ParamDescriptor::skewed("attack", "Attack", "ms", 0.1, 100.0, 0.4, 10.0),
    ParamDescriptor::skewed("release", "Release", "ms", 10.0, 2000.0, 0.4, 100.0),
    ParamDescriptor::linear("knee", "Knee", "dB", 0.0, 10.0, 2.0),
    ParamDescriptor::linear("makeup", "Makeup Gain", "dB", -20.0, 20.0, 0.0),
    ParamDescriptor::linear("mix", "Mix", "%", 0.0, 100.0, 100.0),
];

pub const METERS: &[&str] = &["gain_reduction"];
const GAIN_REDUCTION: usize = 0;

/// Knee widths below this use the hard-knee curve
const HARD_KNEE_DB: f32 = 0.1;

/// Gain reduction in dB for an input level
///
/// Soft knee spans `[T - knee, T + knee]` with a ratio that grows
/// quadratically across the span.
#[inline]
pub fn gain_reduction_db(level_db: f32, threshold: f32, ratio: f32, knee: f32) -> f32 {
    let hard = |level: f32| {
        if level > threshold {
            (level - threshold) * (1.0 - 1.0 / ratio)
        } else {
            0.0
        }
    };

    if knee < HARD_KNEE_DB {
        return hard(level_db);
    }

    let knee_start = threshold - knee;
    let knee_end = threshold + knee;
    if level_db <= knee_start {
        0.0
    } else if level_db >= knee_end {
        hard(level_db)
    } else {
        let progress = (level_db - knee_start) / (2.0 * knee);
        let effective_ratio = 1.0 + (ratio - 1.0) * progress * progress;
        (level_db - knee_start) * (1.0 - 1.0 / effective_ratio)
    }
}

/// Block-scoped settings read once from the parameter store
#[derive(Debug, Clone, Copy)]
struct Settings {
    threshold: f32,
    ratio: f32,
    knee: f32,
    attack: f32,
    release: f32,
    makeup: f32,
    mix: f32,
}

impl Settings {
    fn read(store: &ParameterStore, sample_rate: f32) -> Self {
        Self {
            threshold: store.read(THRESHOLD),
            ratio: store.read(RATIO),
            knee: store.read(KNEE),
            attack: time_to_coeff(store.read(ATTACK), sample_rate),
            release: time_to_coeff(store.read(RELEASE), sample_rate),
            makeup: db_to_linear(store.read(MAKEUP)),
            mix: store.read(MIX) * 0.01,
        }
    }
}

/// Feed-forward compressor
pub struct Compressor {
    params: Arc<ParameterStore>,
    meters: Arc<MeterBank>,
    spec: Option<ProcessSpec>,
    /// Smoothed gain per channel (unlinked detection)
    gains: Vec<GainSmoother>,
    makeup: Smoother,
    mix: Smoother,
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            params: Arc::new(ParameterStore::new(ID, &PARAMS)),
            meters: Arc::new(MeterBank::new(METERS)),
            spec: None,
            gains: Vec::new(),
            makeup: Smoother::default(),
            mix: Smoother::default(),
        }
    }

    /// Smoothed gain of a channel (1.0 = no reduction)
    pub fn channel_gain(&self, channel: usize) -> f32 {
        self.gains.get(channel).map_or(1.0, GainSmoother::gain)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Compressor {
    crate::impl_processor_common!(ID, "Compressor");

    fn prepare(&mut self, spec: ProcessSpec) {
        let settings = Settings::read(&self.params, spec.rate());
        self.gains = vec![GainSmoother::new(); spec.num_channels];
        self.makeup.prepare(spec.rate(), settings.makeup);
        self.mix.prepare(spec.rate(), settings.mix);
        self.meters.clear_all();
        self.spec = Some(spec);
        log::debug!("{} prepared at {} Hz", ID, spec.sample_rate);
    }

    fn release(&mut self) {
        self.spec = None;
        self.gains = Vec::new();
    }

    fn reset(&mut self) {
        for gain in &mut self.gains {
            gain.reset();
        }
    }

    fn process_block(&mut self, buffer: &mut AudioBuffer) {
        let Some((spec, active)) = begin_block(self.spec, buffer) else {
            return;
        };

        let s = Settings::read(&self.params, spec.rate());
        for gain in &mut self.gains {
            gain.set_coefficients(s.attack, s.release);
        }
        self.makeup.set_target(s.makeup);
        self.mix.set_target(s.mix);

        let channels = &mut buffer.channels_mut()[..active];
        let gains = &mut self.gains[..active];
        let num_samples = channels.first().map_or(0, Vec::len);

        for n in 0..num_samples {
            let makeup = self.makeup.next();
            let mix = self.mix.next();
            for (channel, gain) in channels.iter_mut().zip(gains.iter_mut()) {
                let dry = channel[n];
                let level_db = 20.0 * (dry.abs() + LEVEL_EPSILON).log10();
                let reduction = gain_reduction_db(level_db, s.threshold, s.ratio, s.knee);
                let g = gain.process(db_to_linear(-reduction));
                let wet = dry * g * makeup;
                channel[n] = dry * (1.0 - mix) + wet * mix;
            }
        }

        let reduction = gains
            .iter()
            .map(|g| 1.0 - g.gain())
            .fold(0.0f32, f32::max);
        self.meters.publish(GAIN_REDUCTION, reduction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    #[test_case(-30.0, 0.0 ; "below threshold")]
    #[test_case(-10.0, 7.5 ; "ten db over at 4 to 1")]
    #[test_case(0.0, 15.0 ; "twenty db over at 4 to 1")]
    fn test_hard_knee_curve(level: f32, expected: f32) {
        assert_abs_diff_eq!(gain_reduction_db(level, -20.0, 4.0, 0.0), expected, epsilon = 1e-4);
    }

    #[test]
    fn test_soft_knee_curve() {
        let (t, r, k) = (-20.0, 4.0, 6.0);
        assert_eq!(gain_reduction_db(t - k, t, r, k), 0.0);
        assert_eq!(gain_reduction_db(t - k - 1.0, t, r, k), 0.0);

        // Halfway through the knee the ratio is 1 + 3 * 0.25
        assert_abs_diff_eq!(
            gain_reduction_db(t, t, r, k),
            k * (1.0 - 1.0 / 1.75),
            epsilon = 1e-4
        );

        // Rising through the lower half
        let mut previous = 0.0;
        for i in 0..=60 {
            let gr = gain_reduction_db(t - k + i as f32 * 0.1, t, r, k);
            assert!(gr >= previous - 1e-5);
            previous = gr;
        }

        // Above the knee the hard curve applies
        assert_abs_diff_eq!(
            gain_reduction_db(t + k + 1.0, t, r, k),
            (k + 1.0) * 0.75,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_unity_ratio_is_transparent() {
        let mut comp = Compressor::new();
        comp.set_param("ratio", 1.0).unwrap();
        comp.set_param("threshold", -60.0).unwrap();
        comp.prepare(ProcessSpec::new(48000.0, 256, 1));

        let input = AudioBuffer::sine(1, 256, 48000.0, 440.0, 0.8);
        let mut buffer = input.clone();
        comp.process_block(&mut buffer);
        for (a, b) in buffer.channel(0).iter().zip(input.channel(0)) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(comp.meters().value(0), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_channels_are_detected_independently() {
        let mut comp = Compressor::new();
        comp.prepare(ProcessSpec::new(48000.0, 4800, 2));

        let mut buffer = AudioBuffer::new(2, 4800);
        buffer.channel_mut(0).fill(0.9);
        comp.process_block(&mut buffer);

        assert!(comp.channel_gain(0) < 0.5);
        assert_eq!(comp.channel_gain(1), 1.0);
        assert!(comp.meters().value(0) > 0.5);
    }

    #[test]
    fn test_zero_mix_passes_dry_signal() {
        let mut comp = Compressor::new();
        comp.set_param("mix", 0.0).unwrap();
        comp.set_param("threshold", -60.0).unwrap();
        comp.prepare(ProcessSpec::new(48000.0, 512, 1));

        let input = AudioBuffer::sine(1, 512, 48000.0, 1000.0, 0.5);
        let mut buffer = input.clone();
        comp.process_block(&mut buffer);
        assert_eq!(buffer, input);
    }
}
