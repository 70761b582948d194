//! Lookahead brick-wall limiter
//!
//! The detector runs on the undelayed signal while the audio passes through a
//! lookahead delay line, so the gain is already down when a peak reaches the
//! gain stage. A soft clipper and a final hard clip follow.

use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::dsp::{
    db_to_linear, ms_to_samples, time_to_coeff, DelayLine, Detector, EnvelopeFollower, GainSmoother,
    PeakHold,
};
use crate::meters::MeterBank;
use crate::params::{ParamDescriptor, ParameterStore, Smoother};
use crate::processor::{begin_block, ProcessSpec, Processor};

// ============================================================================
// Constants
// ============================================================================

pub const ID: &str = "limiter";

const CEILING: usize = 0;
const RELEASE: usize = 1;
const LOOKAHEAD: usize = 2;
const SOFT_CLIP: usize = 3;
const INPUT_GAIN: usize = 4;

/// Longest lookahead; the delay line is sized for it at prepare
pub const MAX_LOOKAHEAD_MS: f32 = 20.0;

pub const PARAMS: [ParamDescriptor; 5] = [
    ParamDescriptor::linear("ceiling", "Ceiling", "dB", -30.0, 0.0, -0.3),
    ParamDescriptor::skewed("release", "Release", "ms", 1.0, 1000.0, 0.4, 50.0),
    ParamDescriptor::linear("lookahead", "Lookahead", "ms", 0.0, MAX_LOOKAHEAD_MS, 5.0),
    ParamDescriptor::toggle("soft_clip", "Soft Clip", false),
    ParamDescriptor::linear("input_gain", "Input Gain", "dB", -20.0, 20.0, 0.0),
];

pub const METERS: &[&str] = &["gain_reduction", "peak_hit"];
const GAIN_REDUCTION: usize = 0;
const PEAK_HIT: usize = 1;

/// Gain attack time as a fraction of the lookahead
const ATTACK_FRACTION: f32 = 0.1;
/// Floor for the attack time when lookahead is very short
const MIN_ATTACK_MS: f32 = 0.05;
/// Soft clip curve shape
const SOFT_CLIP_DRIVE: f32 = 0.7;

// ============================================================================
// Helpers
// ============================================================================

/// `tanh` saturation that maps the ceiling region smoothly onto itself
#[inline]
fn soft_clip(y: f32, ceiling: f32) -> f32 {
    (y / ceiling * SOFT_CLIP_DRIVE).tanh() / SOFT_CLIP_DRIVE * ceiling
}

#[derive(Debug, Clone)]
struct Channel {
    hold: PeakHold,
    envelope: EnvelopeFollower,
    gain: GainSmoother,
    lookahead: DelayLine,
}

impl Channel {
    fn new(capacity: usize) -> Self {
        Self {
            hold: PeakHold::new(capacity),
            envelope: EnvelopeFollower::new(Detector::Peak),
            gain: GainSmoother::new(),
            lookahead: DelayLine::new(capacity),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    ceiling: f32,
    release: f32,
    attack: f32,
    lookahead: usize,
    soft_clip: bool,
    input_gain: f32,
}

impl Settings {
    fn read(store: &ParameterStore, sample_rate: f32) -> Self {
        let lookahead_ms = store.read(LOOKAHEAD);
        let attack_ms = (lookahead_ms * ATTACK_FRACTION).max(MIN_ATTACK_MS);
        Self {
            ceiling: db_to_linear(store.read(CEILING)),
            release: time_to_coeff(store.read(RELEASE), sample_rate),
            attack: time_to_coeff(attack_ms, sample_rate),
            lookahead: ms_to_samples(lookahead_ms, sample_rate),
            soft_clip: store.at(SOFT_CLIP).is_on(),
            input_gain: db_to_linear(store.read(INPUT_GAIN)),
        }
    }
}

// ============================================================================
// Limiter
// ============================================================================

/// Brick-wall limiter with true lookahead
///
/// Output never exceeds the ceiling. Reports the lookahead as latency.
pub struct Limiter {
    params: Arc<ParameterStore>,
    meters: Arc<MeterBank>,
    spec: Option<ProcessSpec>,
    channels: Vec<Channel>,
    input_gain: Smoother,
}

impl Limiter {
    pub fn new() -> Self {
        Self {
            params: Arc::new(ParameterStore::new(ID, &PARAMS)),
            meters: Arc::new(MeterBank::new(METERS)),
            spec: None,
            channels: Vec::new(),
            input_gain: Smoother::default(),
        }
    }

    /// Reset the latched peak indicator
    pub fn clear_peak_hit(&self) {
        self.meters.clear(PEAK_HIT);
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Limiter {
    crate::impl_processor_common!(ID, "Limiter");

    fn prepare(&mut self, spec: ProcessSpec) {
        let capacity = ms_to_samples(MAX_LOOKAHEAD_MS, spec.rate());
        self.channels = (0..spec.num_channels)
            .map(|_| Channel::new(capacity))
            .collect();
        self.input_gain
            .prepare(spec.rate(), db_to_linear(self.params.read(INPUT_GAIN)));
        self.meters.clear_all();
        self.spec = Some(spec);
        log::debug!(
            "{} prepared at {} Hz, lookahead capacity {} samples",
            ID,
            spec.sample_rate,
            capacity
        );
    }

    fn release(&mut self) {
        self.spec = None;
        self.channels = Vec::new();
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.hold.reset();
            channel.envelope.reset();
            channel.gain.reset();
            channel.lookahead.clear();
        }
    }

    fn latency_samples(&self) -> usize {
        let sample_rate = self.spec.map_or(0.0, |s| s.rate());
        ms_to_samples(self.params.read(LOOKAHEAD), sample_rate)
    }

    fn process_block(&mut self, buffer: &mut AudioBuffer) {
        let Some((spec, active)) = begin_block(self.spec, buffer) else {
            return;
        };

        let s = Settings::read(&self.params, spec.rate());
        for channel in &mut self.channels {
            channel.envelope.set_coefficients(0.0, s.release);
            channel.gain.set_coefficients(s.attack, s.release);
        }
        self.input_gain.set_target(s.input_gain);

        let buffers = &mut buffer.channels_mut()[..active];
        let states = &mut self.channels[..active];
        let num_samples = buffers.first().map_or(0, Vec::len);

        let mut max_reduction = 0.0f32;
        let mut hit = false;

        for n in 0..num_samples {
            let input_gain = self.input_gain.next();
            for (samples, state) in buffers.iter_mut().zip(states.iter_mut()) {
                let x = samples[n] * input_gain;

                // Peaks are held until they leave the lookahead delay
                let level = state.hold.process(x.abs(), s.lookahead);
                let envelope = state.envelope.process_instant(level);
                let over = envelope > s.ceiling;
                hit |= over;

                let target = if over { s.ceiling / envelope } else { 1.0 };
                let g = state.gain.process(target);
                max_reduction = max_reduction.max(1.0 - g);

                let mut y = state.lookahead.process(x, s.lookahead) * g;
                if s.soft_clip && y.abs() > s.ceiling {
                    y = soft_clip(y, s.ceiling);
                }
                samples[n] = y.clamp(-s.ceiling, s.ceiling);
            }
        }

        self.meters.publish(GAIN_REDUCTION, max_reduction);
        self.meters.latch(PEAK_HIT, hit);
    }
}
