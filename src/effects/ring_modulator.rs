//! Ring modulator
//!
//! Multiplies the input by a carrier that is itself amplitude-modulated. One
//! carrier/modulator phase pair is shared by every channel so stereo images
//! stay coherent.

use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::dsp::{Oscillator, Waveform};
use crate::meters::MeterBank;
use crate::params::{ParamDescriptor, ParameterStore, Smoother};
use crate::processor::{begin_block, ProcessSpec, Processor};

pub const ID: &str = "ring_modulator";

const CARRIER: usize = 0;
const MODULATOR: usize = 1;
const CARRIER_WAVE: usize = 2;
const MODULATOR_WAVE: usize = 3;
const MIX: usize = 4;

pub const PARAMS: [ParamDescriptor; 5] = [
    ParamDescriptor::skewed("carrier", "Carrier", "Hz", 1.0, 8000.0, 0.3, 440.0),
    ParamDescriptor::skewed("modulator", "Modulator", "Hz", 0.1, 1000.0, 0.3, 5.0),
    ParamDescriptor::choice("carrier_wave", "Carrier Wave", Waveform::LABELS, 0),
    ParamDescriptor::choice("modulator_wave", "Modulator Wave", Waveform::LABELS, 0),
    ParamDescriptor::linear("mix", "Mix", "%", 0.0, 100.0, 100.0),
];

/// `x · c · (1 + m) · 0.5`
#[inline]
pub fn ring(x: f32, carrier: f32, modulator: f32) -> f32 {
    x * carrier * (1.0 + modulator) * 0.5
}

pub struct RingModulator {
    params: Arc<ParameterStore>,
    meters: Arc<MeterBank>,
    spec: Option<ProcessSpec>,
    carrier: Oscillator,
    modulator: Oscillator,
    mix: Smoother,
}

impl RingModulator {
    pub fn new() -> Self {
        Self {
            params: Arc::new(ParameterStore::new(ID, &PARAMS)),
            meters: Arc::new(MeterBank::new(&[])),
            spec: None,
            carrier: Oscillator::new(),
            modulator: Oscillator::new(),
            mix: Smoother::default(),
        }
    }

    /// Shared `(carrier, modulator)` phases in radians
    pub fn phases(&self) -> (f32, f32) {
        (self.carrier.phase(), self.modulator.phase())
    }
}

impl Default for RingModulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for RingModulator {
    crate::impl_processor_common!(ID, "Ring Modulator");

    fn prepare(&mut self, spec: ProcessSpec) {
        self.carrier.reset();
        self.modulator.reset();
        self.mix.prepare(spec.rate(), self.params.read(MIX) * 0.01);
        self.spec = Some(spec);
        log::debug!("{} prepared at {} Hz", ID, spec.sample_rate);
    }

    fn release(&mut self) {
        self.spec = None;
    }

    fn reset(&mut self) {
        self.carrier.reset();
        self.modulator.reset();
    }

    fn process_block(&mut self, buffer: &mut AudioBuffer) {
        let Some((spec, active)) = begin_block(self.spec, buffer) else {
            return;
        };

        self.carrier
            .set_frequency(self.params.read(CARRIER), spec.rate());
        self.modulator
            .set_frequency(self.params.read(MODULATOR), spec.rate());
        let carrier_wave = Waveform::from_index(self.params.at(CARRIER_WAVE).index());
        let modulator_wave = Waveform::from_index(self.params.at(MODULATOR_WAVE).index());
        self.mix.set_target(self.params.read(MIX) * 0.01);

        let buffers = &mut buffer.channels_mut()[..active];
        let num_samples = buffers.first().map_or(0, Vec::len);

        for n in 0..num_samples {
            let mix = self.mix.next();
            let c = self.carrier.next(carrier_wave);
            let m = self.modulator.next(modulator_wave);
            for samples in buffers.iter_mut() {
                let x = samples[n];
                samples[n] = (1.0 - mix) * x + mix * ring(x, c, m);
            }
        }

        self.carrier.wrap();
        self.modulator.wrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    #[test]
    fn test_ring_formula() {
        assert_eq!(ring(1.0, 1.0, 1.0), 1.0);
        assert_eq!(ring(0.5, -1.0, 0.0), -0.25);
        assert_eq!(ring(0.5, 1.0, -1.0), 0.0);
    }

    #[test]
    fn test_stereo_channels_share_phase() {
        let mut rm = RingModulator::new();
        rm.prepare(ProcessSpec::new(48000.0, 512, 2));
        let mut buffer = AudioBuffer::sine(2, 512, 48000.0, 220.0, 0.5);
        rm.process_block(&mut buffer);
        assert_eq!(buffer.channel(0), buffer.channel(1));
    }

    #[test]
    fn test_phase_advances_by_block_length() {
        let mut rm = RingModulator::new();
        rm.set_param("carrier", 1000.0).unwrap();
        rm.set_param("modulator", 1.0).unwrap();
        rm.prepare(ProcessSpec::new(48000.0, 480, 1));
        let mut buffer = AudioBuffer::new(1, 480);
        rm.process_block(&mut buffer);

        // 480 samples is exactly 10 carrier cycles
        let (carrier, modulator) = rm.phases();
        assert!(carrier < 1e-3 || (TAU - carrier) < 1e-3);
        assert!((modulator - TAU * 0.01).abs() < 1e-4);
    }

    #[test]
    fn test_square_carrier_inverts_second_half_cycle() {
        let mut rm = RingModulator::new();
        rm.set_param("carrier", 1000.0).unwrap();
        rm.parameters()
            .set_from_str("carrier_wave", "Square")
            .unwrap();
        rm.set_param("modulator", 0.1).unwrap();
        rm.prepare(ProcessSpec::new(48000.0, 48, 1));

        let mut buffer = AudioBuffer::new(1, 48);
        buffer.channel_mut(0).fill(0.5);
        rm.process_block(&mut buffer);
        // One carrier cycle: + for 24 samples, - for 24, scaled by (1 + m) / 2 ~ 0.5
        assert!(buffer.channel(0)[..24].iter().all(|&s| s > 0.24));
        assert!(buffer.channel(0)[25..].iter().all(|&s| s < -0.24));
    }
}
