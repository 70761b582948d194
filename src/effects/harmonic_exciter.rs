//! Harmonic exciter
//!
//! Saturates the band above the exciter frequency and adds the result back
//! onto the untouched input. Warm mode adds even harmonics through `tanh`,
//! Bright mode odd harmonics through a cubic clipper.

use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::dsp::{FilterType, LinkwitzRiley};
use crate::meters::MeterBank;
use crate::params::{ParamDescriptor, ParameterStore, Smoother};
use crate::processor::{begin_block, ProcessSpec, Processor};

pub const ID: &str = "harmonic_exciter";

const DRIVE: usize = 0;
const FREQUENCY: usize = 1;
const HARMONICS: usize = 2;
const MIX: usize = 3;
const MODE: usize = 4;

pub const PARAMS: [ParamDescriptor; 5] = [
    ParamDescriptor::linear("drive", "Drive", "", 0.0, 1.0, 0.3),
    ParamDescriptor::skewed("frequency", "Frequency", "Hz", 1000.0, 20000.0, 0.4, 5000.0),
    ParamDescriptor::linear("harmonics", "Harmonics", "", 1.0, 5.0, 2.0),
    ParamDescriptor::linear("mix", "Mix", "", 0.0, 1.0, 0.5),
    ParamDescriptor::choice("type", "Type", ExciterMode::LABELS, 0),
];

/// Saturation character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExciterMode {
    Warm,
    Bright,
}

impl ExciterMode {
    pub const LABELS: &'static [&'static str] = &["Warm", "Bright"];

    fn from_index(index: usize) -> Self {
        if index == 1 {
            ExciterMode::Bright
        } else {
            ExciterMode::Warm
        }
    }

    /// Excitation signal for the driven high band
    #[inline]
    pub fn excite(self, driven: f32, harmonics: f32, drive: f32) -> f32 {
        match self {
            ExciterMode::Warm => {
                let sat = (driven * harmonics).tanh();
                let even = (sat * FRAC_PI_2).sin() * 0.3;
                sat + even * drive
            }
            ExciterMode::Bright => {
                let c = (driven * harmonics).clamp(-1.0, 1.0);
                let cubic = c - c * c * c / 3.0;
                let odd = (cubic * PI).sin() * 0.4;
                cubic + odd * drive
            }
        }
    }
}

pub struct HarmonicExciter {
    params: Arc<ParameterStore>,
    meters: Arc<MeterBank>,
    spec: Option<ProcessSpec>,
    filters: Vec<LinkwitzRiley>,
    frequency: f32,
    mix: Smoother,
}

impl HarmonicExciter {
    pub fn new() -> Self {
        Self {
            params: Arc::new(ParameterStore::new(ID, &PARAMS)),
            meters: Arc::new(MeterBank::new(&[])),
            spec: None,
            filters: Vec::new(),
            frequency: 0.0,
            mix: Smoother::default(),
        }
    }

    fn design(&mut self, sample_rate: f64, frequency: f32) {
        for filter in &mut self.filters {
            filter.set_frequency(FilterType::HighPass, sample_rate, frequency as f64);
        }
        self.frequency = frequency;
    }
}

impl Default for HarmonicExciter {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for HarmonicExciter {
    crate::impl_processor_common!(ID, "Harmonic Exciter");

    fn prepare(&mut self, spec: ProcessSpec) {
        self.filters = vec![LinkwitzRiley::default(); spec.num_channels];
        self.design(spec.sample_rate, self.params.read(FREQUENCY));
        self.mix.prepare(spec.rate(), self.params.read(MIX));
        self.spec = Some(spec);
        log::debug!("{} prepared at {} Hz", ID, spec.sample_rate);
    }

    fn release(&mut self) {
        self.spec = None;
        self.filters = Vec::new();
    }

    fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }

    fn process_block(&mut self, buffer: &mut AudioBuffer) {
        let Some((spec, active)) = begin_block(self.spec, buffer) else {
            return;
        };

        let frequency = self.params.read(FREQUENCY);
        if frequency != self.frequency {
            self.design(spec.sample_rate, frequency);
        }
        let drive = self.params.read(DRIVE);
        let harmonics = self.params.read(HARMONICS);
        let mode = ExciterMode::from_index(self.params.at(MODE).index());
        let drive_gain = 1.0 + 9.0 * drive;
        self.mix.set_target(self.params.read(MIX));

        let buffers = &mut buffer.channels_mut()[..active];
        let filters = &mut self.filters[..active];
        let num_samples = buffers.first().map_or(0, Vec::len);

        for n in 0..num_samples {
            let mix = self.mix.next();
            for (samples, filter) in buffers.iter_mut().zip(filters.iter_mut()) {
                let x = samples[n];
                let driven = filter.process(x) * drive_gain;
                samples[n] = x + mode.excite(driven, harmonics, drive) * mix;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ExciterMode::Warm ; "warm")]
    #[test_case(ExciterMode::Bright ; "bright")]
    fn test_excitation_is_bounded(mode: ExciterMode) {
        for i in -100..=100 {
            let driven = i as f32 * 0.1;
            let y = mode.excite(driven, 5.0, 1.0);
            assert!(y.abs() <= 1.3 + 1e-6, "{} -> {}", driven, y);
        }
        assert_eq!(mode.excite(0.0, 3.0, 1.0), 0.0);
    }

    #[test]
    fn test_bright_clips_to_cubic_ceiling() {
        // Clipped input lands on 1 - 1/3; zero drive drops the odd term
        let y = ExciterMode::Bright.excite(10.0, 1.0, 0.0);
        assert!((y - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_low_frequencies_pass_unchanged() {
        let mut exciter = HarmonicExciter::new();
        exciter.set_param("drive", 1.0).unwrap();
        exciter.set_param("mix", 1.0).unwrap();
        exciter.prepare(ProcessSpec::new(48000.0, 4800, 1));

        let input = AudioBuffer::sine(1, 4800, 48000.0, 100.0, 0.5);
        let mut buffer = input.clone();
        exciter.process_block(&mut buffer);
        // 100 Hz is far below the 5 kHz split
        assert!((buffer.rms_db(0) - input.rms_db(0)).abs() < 0.5);
    }

    #[test]
    fn test_high_band_gains_energy() {
        let mut exciter = HarmonicExciter::new();
        exciter.set_param("mix", 1.0).unwrap();
        exciter.prepare(ProcessSpec::new(48000.0, 4800, 1));

        let input = AudioBuffer::sine(1, 4800, 48000.0, 10000.0, 0.1);
        let mut buffer = input.clone();
        exciter.process_block(&mut buffer);
        assert!(buffer.rms_db(0) > input.rms_db(0) + 1.0);
    }
}
