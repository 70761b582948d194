//! Bass maximiser
//!
//! Splits the input at the crossover frequency, boosts and optionally tightens
//! the low band, adds a zero-crossing driven sub-harmonic, and recombines it
//! with the untouched high band.

use std::f32::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::dsp::{db_to_linear, Biquad, BiquadCoeffs, Detector, EnvelopeFollower, BUTTERWORTH_Q};
use crate::meters::MeterBank;
use crate::params::{ParamDescriptor, ParameterStore, Smoother};
use crate::processor::{begin_block, ProcessSpec, Processor};

pub const ID: &str = "bass_maximiser";

const FREQUENCY: usize = 0;
const BOOST: usize = 1;
const HARMONICS: usize = 2;
const TIGHTNESS: usize = 3;
const OUTPUT_GAIN: usize = 4;
const PHASE_INVERT: usize = 5;

pub const PARAMS: [ParamDescriptor; 6] = [
    ParamDescriptor::skewed("frequency", "Frequency", "Hz", 20.0, 500.0, 0.4, 100.0),
    ParamDescriptor::linear("boost", "Boost", "dB", 0.0, 20.0, 6.0),
    ParamDescriptor::linear("harmonics", "Harmonics", "%", 0.0, 100.0, 25.0),
    ParamDescriptor::linear("tightness", "Tightness", "%", 0.0, 100.0, 50.0),
    ParamDescriptor::linear("output_gain", "Output Gain", "dB", -20.0, 20.0, 0.0),
    ParamDescriptor::toggle("phase_invert", "Phase Invert", false),
];

pub const METERS: &[&str] = &["bass_rms"];
const BASS_RMS: usize = 0;

/// Bass envelope coefficients (fixed, per-sample one-pole form)
const ENV_ATTACK: f32 = 0.01;
const ENV_RELEASE: f32 = 0.1;
/// Bass compressor threshold (linear)
const BASS_THRESHOLD: f32 = 0.5;
/// Phase advance of the sub-harmonic oscillator per zero crossing
const SUB_PHASE_STEP: f32 = FRAC_PI_2;

#[derive(Debug, Clone)]
struct Channel {
    low: Biquad,
    high: Biquad,
    envelope: EnvelopeFollower,
    sub_phase: f32,
    last_bass: f32,
}

impl Channel {
    fn new() -> Self {
        let mut envelope = EnvelopeFollower::new(Detector::Peak);
        envelope.set_coefficients(ENV_ATTACK, ENV_RELEASE);
        Self {
            low: Biquad::default(),
            high: Biquad::default(),
            envelope,
            sub_phase: 0.0,
            last_bass: 0.0,
        }
    }

    fn clear(&mut self) {
        self.low.reset();
        self.high.reset();
        self.envelope.reset();
        self.sub_phase = 0.0;
        self.last_bass = 0.0;
    }

    /// Sub-harmonic sample for the boosted bass `bass`
    ///
    /// Every sign change of the bass advances the phase by a quarter turn, so a
    /// steady tone moves the oscillator at half its own rate. The result is
    /// scaled by the bass itself and is not frequency-locked.
    #[inline]
    fn sub_harmonic(&mut self, bass: f32) -> f32 {
        if (bass < 0.0 && self.last_bass >= 0.0) || (bass >= 0.0 && self.last_bass < 0.0) {
            self.sub_phase += SUB_PHASE_STEP;
            if self.sub_phase >= TAU {
                self.sub_phase -= TAU;
            }
        }
        self.last_bass = bass;
        self.sub_phase.sin() * bass * 0.5
    }
}

/// Gain of the bass compressor for envelope `env`
#[inline]
fn bass_gain(env: f32, tightness: f32) -> f32 {
    if env <= BASS_THRESHOLD {
        return 1.0;
    }
    let ratio = 1.0 + 9.0 * tightness;
    let gain = (BASS_THRESHOLD + (env - BASS_THRESHOLD) / ratio) / env;
    gain * tightness + (1.0 - tightness)
}

pub struct BassMaximiser {
    params: Arc<ParameterStore>,
    meters: Arc<MeterBank>,
    spec: Option<ProcessSpec>,
    channels: Vec<Channel>,
    /// Crossover the filters were designed for
    crossover: f32,
    output_gain: Smoother,
}

impl BassMaximiser {
    pub fn new() -> Self {
        Self {
            params: Arc::new(ParameterStore::new(ID, &PARAMS)),
            meters: Arc::new(MeterBank::new(METERS)),
            spec: None,
            channels: Vec::new(),
            crossover: 0.0,
            output_gain: Smoother::default(),
        }
    }

    fn design_crossover(&mut self, sample_rate: f64, frequency: f32) {
        let f = frequency as f64;
        let low = BiquadCoeffs::low_pass(sample_rate, f, BUTTERWORTH_Q);
        let high = BiquadCoeffs::high_pass(sample_rate, f, BUTTERWORTH_Q);
        for channel in &mut self.channels {
            channel.low.set_coefficients(low);
            channel.high.set_coefficients(high);
        }
        self.crossover = frequency;
    }
}

impl Default for BassMaximiser {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for BassMaximiser {
    crate::impl_processor_common!(ID, "Bass Maximiser");

    fn prepare(&mut self, spec: ProcessSpec) {
        self.channels = vec![Channel::new(); spec.num_channels];
        self.design_crossover(spec.sample_rate, self.params.read(FREQUENCY));
        self.output_gain
            .prepare(spec.rate(), db_to_linear(self.params.read(OUTPUT_GAIN)));
        self.meters.clear_all();
        self.spec = Some(spec);
        log::debug!(
            "{} prepared at {} Hz, crossover {} Hz",
            ID,
            spec.sample_rate,
            self.crossover
        );
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

    fn process_block(&mut self, buffer: &mut AudioBuffer) {
        let Some((spec, active)) = begin_block(self.spec, buffer) else {
            return;
        };

        let frequency = self.params.read(FREQUENCY);
        if frequency != self.crossover {
            self.design_crossover(spec.sample_rate, frequency);
        }
        let boost = db_to_linear(self.params.read(BOOST));
        let harmonics = self.params.read(HARMONICS) * 0.01;
        let tightness = self.params.read(TIGHTNESS) * 0.01;
        let invert = self.params.at(PHASE_INVERT).is_on();
        self.output_gain
            .set_target(db_to_linear(self.params.read(OUTPUT_GAIN)));

        let buffers = &mut buffer.channels_mut()[..active];
        let states = &mut self.channels[..active];
        let num_samples = buffers.first().map_or(0, Vec::len);
        let mut bass_energy = 0.0f64;

        for n in 0..num_samples {
            let output_gain = self.output_gain.next();
            for (samples, state) in buffers.iter_mut().zip(states.iter_mut()) {
                let x = samples[n];
                let low = state.low.process(x);
                let high = state.high.process(x);

                let bass = low * boost;
                let sub = state.sub_harmonic(bass);
                let env = state.envelope.process(bass);
                let mut shaped = bass * bass_gain(env, tightness);
                if invert {
                    shaped = -shaped;
                }
                bass_energy += (shaped as f64) * (shaped as f64);

                samples[n] = (shaped + sub * harmonics + high) * output_gain;
            }
        }

        let count = num_samples * active;
        let rms = if count > 0 {
            (bass_energy / count as f64).sqrt() as f32
        } else {
            0.0
        };
        self.meters.publish(BASS_RMS, rms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bass_gain_curve() {
        assert_eq!(bass_gain(0.4, 1.0), 1.0);
        // Zero tightness never compresses
        assert_eq!(bass_gain(2.0, 0.0), 1.0);
        // Full tightness: ratio 10, env 1.0 -> (0.5 + 0.05) / 1.0
        assert_abs_diff_eq!(bass_gain(1.0, 1.0), 0.55, epsilon = 1e-6);
        // Half tightness blends halfway toward unity
        let half = bass_gain(1.0, 0.5);
        let ratio = 5.5;
        let expected = ((0.5 + 0.5 / ratio) / 1.0) * 0.5 + 0.5;
        assert_abs_diff_eq!(half, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_sub_harmonic_advances_on_crossings() {
        let mut channel = Channel::new();
        assert_eq!(channel.sub_harmonic(0.5), 0.0);
        // First crossing: quarter turn, sin = 1
        assert_abs_diff_eq!(channel.sub_harmonic(-0.5), -0.25, epsilon = 1e-6);
        // No crossing: phase holds
        assert_abs_diff_eq!(channel.sub_harmonic(-0.4), -0.2, epsilon = 1e-6);
        // Second crossing: half turn, sin ~ 0
        assert_abs_diff_eq!(channel.sub_harmonic(0.5), 0.0, epsilon = 1e-6);
        channel.sub_harmonic(-0.5);
        channel.sub_harmonic(0.5);
        assert!(channel.sub_phase < TAU);
    }

    #[test]
    fn test_high_band_passes_with_neutral_bass_settings() {
        let mut maximiser = BassMaximiser::new();
        maximiser.set_param("boost", 0.0).unwrap();
        maximiser.set_param("harmonics", 0.0).unwrap();
        maximiser.set_param("tightness", 0.0).unwrap();
        maximiser.prepare(ProcessSpec::new(48000.0, 4800, 1));

        // Low-pass plus high-pass at Q 0.707 keeps a 5 kHz tone at full level
        let input = AudioBuffer::sine(1, 4800, 48000.0, 5000.0, 0.5);
        let mut buffer = input.clone();
        maximiser.process_block(&mut buffer);
        assert_abs_diff_eq!(buffer.rms_db(0), input.rms_db(0), epsilon = 0.1);
    }

    #[test]
    fn test_phase_invert_flips_bass_band() {
        let render = |invert: bool| {
            let mut maximiser = BassMaximiser::new();
            maximiser.set_param("harmonics", 0.0).unwrap();
            maximiser
                .set_param("phase_invert", if invert { 1.0 } else { 0.0 })
                .unwrap();
            maximiser.prepare(ProcessSpec::new(48000.0, 4800, 1));
            let mut buffer = AudioBuffer::sine(1, 4800, 48000.0, 40.0, 0.1);
            maximiser.process_block(&mut buffer);
            buffer
        };
        let normal = render(false);
        let inverted = render(true);
        // A 40 Hz tone sits almost entirely in the low band
        let sum: f32 = normal
            .channel(0)
            .iter()
            .zip(inverted.channel(0))
            .map(|(a, b)| (a + b).abs())
            .sum::<f32>()
            / 4800.0;
        let level: f32 = normal.channel(0).iter().map(|s| s.abs()).sum::<f32>() / 4800.0;
        assert!(sum < level * 0.5);
    }
}
