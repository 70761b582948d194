//! Noise gate with hold and lookahead
//!
//! Each channel runs its own detector and gate state. The detector sees the
//! current input while the audio is delayed by the lookahead, so the gate can
//! open before a transient reaches the output.

use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::dsp::{
    db_to_linear, ms_to_samples, time_to_coeff, DelayLine, Detector, EnvelopeFollower,
};
use crate::meters::MeterBank;
use crate::params::{ParamDescriptor, ParameterStore};
use crate::processor::{begin_block, ProcessSpec, Processor};

// ============================================================================
// Constants
// ============================================================================

pub const ID: &str = "noise_gate";

const THRESHOLD: usize = 0;
const ATTACK: usize = 1;
const HOLD: usize = 2;
const RELEASE: usize = 3;
const RANGE: usize = 4;
const LOOKAHEAD: usize = 5;

pub const MAX_LOOKAHEAD_MS: f32 = 10.0;

pub const PARAMS: [ParamDescriptor; 6] = [
    ParamDescriptor::linear("threshold", "Threshold", "dB", -60.0, 0.0, -40.0),
    ParamDescriptor::skewed("attack", "Attack", "ms", 0.1, 100.0, 0.4, 1.0),
    ParamDescriptor::linear("hold", "Hold", "ms", 0.0, 500.0, 50.0),
    ParamDescriptor::skewed("release", "Release", "ms", 1.0, 5000.0, 0.3, 100.0),
    ParamDescriptor::linear("range", "Range", "dB", -60.0, 0.0, -60.0),
    ParamDescriptor::linear("lookahead", "Lookahead", "ms", 0.0, MAX_LOOKAHEAD_MS, 0.0),
];

pub const METERS: &[&str] = &["gate_open"];
const GATE_OPEN: usize = 0;

/// Gate state above which the gate counts as open
const OPEN_LEVEL: f32 = 0.5;
/// Gate state below which a closing gate counts as closed (-60 dB)
const CLOSED_LEVEL: f32 = 1.0e-3;

// ============================================================================
// Gate state
// ============================================================================

/// Where a channel is in its open/close cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateStage {
    #[default]
    Closed,
    /// Envelope above threshold
    Open,
    /// Below threshold, hold counter running
    Hold,
    /// Hold expired, gate state decaying
    Closing,
}

#[derive(Debug, Clone, Default)]
struct Channel {
    detector: EnvelopeFollower,
    /// Gate state in `[0, 1]`, smoothed toward the open/closed target
    gate: EnvelopeFollower,
    hold_counter: usize,
    stage: GateStage,
    lookahead: DelayLine,
}

impl Channel {
    fn new(lookahead_capacity: usize) -> Self {
        Self {
            detector: EnvelopeFollower::new(Detector::Peak),
            gate: EnvelopeFollower::new(Detector::Peak),
            lookahead: DelayLine::new(lookahead_capacity),
            ..Self::default()
        }
    }

    fn clear(&mut self) {
        self.detector.reset();
        self.gate.reset();
        self.hold_counter = 0;
        self.stage = GateStage::Closed;
        self.lookahead.clear();
    }

    /// Advance the state machine by one sample and return the gate state
    #[inline]
    fn step(&mut self, detection: f32, threshold: f32, hold_samples: usize) -> f32 {
        let envelope = self.detector.process(detection);
        let target = if envelope > threshold {
            self.hold_counter = hold_samples;
            self.stage = GateStage::Open;
            1.0
        } else if self.hold_counter > 0 {
            self.hold_counter -= 1;
            self.stage = GateStage::Hold;
            1.0
        } else {
            0.0
        };

        let gate = self.gate.process(target);
        if target == 0.0 {
            self.stage = if gate > CLOSED_LEVEL {
                GateStage::Closing
            } else {
                GateStage::Closed
            };
        }
        gate
    }
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    threshold: f32,
    attack: f32,
    release: f32,
    hold_samples: usize,
    floor: f32,
    lookahead: usize,
}

impl Settings {
    fn read(store: &ParameterStore, sample_rate: f32) -> Self {
        Self {
            threshold: db_to_linear(store.read(THRESHOLD)),
            attack: time_to_coeff(store.read(ATTACK), sample_rate),
            release: time_to_coeff(store.read(RELEASE), sample_rate),
            hold_samples: ms_to_samples(store.read(HOLD), sample_rate),
            floor: db_to_linear(store.read(RANGE)),
            lookahead: ms_to_samples(store.read(LOOKAHEAD), sample_rate),
        }
    }
}

// ============================================================================
// Noise Gate
// ============================================================================

/// Downward gate: attenuates to the range floor while the signal is quiet
pub struct NoiseGate {
    params: Arc<ParameterStore>,
    meters: Arc<MeterBank>,
    spec: Option<ProcessSpec>,
    channels: Vec<Channel>,
}

impl NoiseGate {
    pub fn new() -> Self {
        Self {
            params: Arc::new(ParameterStore::new(ID, &PARAMS)),
            meters: Arc::new(MeterBank::new(METERS)),
            spec: None,
            channels: Vec::new(),
        }
    }

    /// Current stage of a channel
    pub fn stage(&self, channel: usize) -> GateStage {
        self.channels
            .get(channel)
            .map_or(GateStage::Closed, |c| c.stage)
    }

    /// Current gate state of a channel (0 closed, 1 open)
    pub fn gate_state(&self, channel: usize) -> f32 {
        self.channels.get(channel).map_or(0.0, |c| c.gate.value())
    }
}

impl Default for NoiseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for NoiseGate {
    crate::impl_processor_common!(ID, "Noise Gate");

    fn prepare(&mut self, spec: ProcessSpec) {
        let capacity = ms_to_samples(MAX_LOOKAHEAD_MS, spec.rate());
        self.channels = (0..spec.num_channels)
            .map(|_| Channel::new(capacity))
            .collect();
        self.meters.clear_all();
        self.spec = Some(spec);
        log::debug!("{} prepared at {} Hz", ID, spec.sample_rate);
    }

    fn release(&mut self) {
        self.spec = None;
        self.channels = Vec::new();
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
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
        let buffers = &mut buffer.channels_mut()[..active];
        let states = &mut self.channels[..active];

        for (samples, state) in buffers.iter_mut().zip(states.iter_mut()) {
            state.detector.set_coefficients(s.attack, s.release);
            state.gate.set_coefficients(s.attack, s.release);
            for sample in samples.iter_mut() {
                let x = *sample;
                let gate = state.step(x, s.threshold, s.hold_samples);
                let gain = s.floor + (1.0 - s.floor) * gate;
                *sample = state.lookahead.process(x, s.lookahead) * gain;
            }
        }

        let open = states
            .iter()
            .map(|c| c.gate.value())
            .fold(0.0f32, f32::max)
            > OPEN_LEVEL;
        self.meters.publish(GATE_OPEN, if open { 1.0 } else { 0.0 });
    }
}
