//! Resonant filter effects (low pass, high pass, band pass, band reject)

use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::dsp::{db_to_linear, Biquad, BiquadCoeffs, FilterType};
use crate::meters::MeterBank;
use crate::params::{ParamDescriptor, ParameterStore, Smoother};
use crate::processor::{begin_block, ProcessSpec, Processor};

const CUTOFF: usize = 0;
const RESONANCE: usize = 1;
const OUTPUT_GAIN: usize = 2;

pub const PARAMS: [ParamDescriptor; 3] = [
    ParamDescriptor::skewed("cutoff", "Cutoff", "Hz", 20.0, 20000.0, 0.25, 1000.0),
    ParamDescriptor::skewed("resonance", "Resonance", "Q", 0.1, 10.0, 0.4, 0.707),
    ParamDescriptor::linear("output_gain", "Output Gain", "dB", -20.0, 20.0, 0.0),
];

/// Stable id of the effect for each filter response
pub fn effect_id(filter_type: FilterType) -> &'static str {
    match filter_type {
        FilterType::LowPass => "low_pass",
        FilterType::HighPass => "high_pass",
        FilterType::BandPass => "band_pass",
        FilterType::BandReject => "band_reject",
    }
}

fn display_name(filter_type: FilterType) -> &'static str {
    match filter_type {
        FilterType::LowPass => "Low Pass",
        FilterType::HighPass => "High Pass",
        FilterType::BandPass => "Band Pass",
        FilterType::BandReject => "Band Reject",
    }
}

/// Single biquad filter effect
///
/// Coefficients are redesigned at block start only when cutoff or
/// resonance moved.
pub struct FilterEffect {
    filter_type: FilterType,
    params: Arc<ParameterStore>,
    meters: Arc<MeterBank>,
    spec: Option<ProcessSpec>,
    filters: Vec<Biquad>,
    /// `(cutoff, q)` the current coefficients were designed for
    designed: (f32, f32),
    output_gain: Smoother,
}

impl FilterEffect {
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            filter_type,
            params: Arc::new(ParameterStore::new(effect_id(filter_type), &PARAMS)),
            meters: Arc::new(MeterBank::new(&[])),
            spec: None,
            filters: Vec::new(),
            designed: (0.0, 0.0),
            output_gain: Smoother::default(),
        }
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Coefficients currently in use
    pub fn coefficients(&self) -> Option<&BiquadCoeffs> {
        self.filters.first().map(Biquad::coefficients)
    }

    fn design(&mut self, sample_rate: f64, cutoff: f32, q: f32) {
        let coeffs = BiquadCoeffs::design(self.filter_type, sample_rate, cutoff as f64, q as f64);
        for filter in &mut self.filters {
            filter.set_coefficients(coeffs);
        }
        self.designed = (cutoff, q);
    }
}

impl Processor for FilterEffect {
    fn effect_id(&self) -> &'static str {
        effect_id(self.filter_type)
    }

    fn display_name(&self) -> &'static str {
        display_name(self.filter_type)
    }

    fn parameters(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    fn meters(&self) -> &Arc<MeterBank> {
        &self.meters
    }

    fn is_prepared(&self) -> bool {
        self.spec.is_some()
    }

    fn prepare(&mut self, spec: ProcessSpec) {
        self.filters = vec![Biquad::default(); spec.num_channels];
        self.design(
            spec.sample_rate,
            self.params.read(CUTOFF),
            self.params.read(RESONANCE),
        );
        self.output_gain
            .prepare(spec.rate(), db_to_linear(self.params.read(OUTPUT_GAIN)));
        self.spec = Some(spec);
        log::debug!("{} prepared at {} Hz", self.effect_id(), spec.sample_rate);
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

        let settings = (self.params.read(CUTOFF), self.params.read(RESONANCE));
        if settings != self.designed {
            self.design(spec.sample_rate, settings.0, settings.1);
        }
        self.output_gain
            .set_target(db_to_linear(self.params.read(OUTPUT_GAIN)));

        let buffers = &mut buffer.channels_mut()[..active];
        let filters = &mut self.filters[..active];
        let num_samples = buffers.first().map_or(0, Vec::len);

        for n in 0..num_samples {
            let gain = self.output_gain.next();
            for (samples, filter) in buffers.iter_mut().zip(filters.iter_mut()) {
                samples[n] = filter.process(samples[n]) * gain;
            }
        }
    }
}
