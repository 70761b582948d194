//! Biquad filter section
//!
//! Second-order direct-form-I section with RBJ cookbook designers, plus a
//! Linkwitz-Riley section built from two identical Butterworth biquads.
//! Coefficients are stored by value; swapping them keeps the filter memory, so
//! callers change coefficients only between blocks.

use super::DENORMAL_THRESHOLD;
use std::f64::consts::PI;

/// Butterworth Q for a second-order section
pub const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Response shape of a biquad section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
    /// Constant 0 dB peak gain band-pass
    BandPass,
    /// Notch
    BandReject,
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Pass-through section
    pub const IDENTITY: BiquadCoeffs = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Calculate biquad coefficients using Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    pub fn design(filter_type: FilterType, sample_rate: f64, frequency: f64, q: f64) -> Self {
        // Keep the corner strictly inside (0, Nyquist)
        let freq = frequency.clamp(1.0, sample_rate * 0.49);
        let q = q.max(0.01);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::BandPass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::BandReject => (
                1.0,
                -2.0 * cos_w0,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
        };

        // Normalize by a0
        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    pub fn low_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::design(FilterType::LowPass, sample_rate, frequency, q)
    }

    pub fn high_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::design(FilterType::HighPass, sample_rate, frequency, q)
    }

    pub fn band_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::design(FilterType::BandPass, sample_rate, frequency, q)
    }

    pub fn band_reject(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self::design(FilterType::BandReject, sample_rate, frequency, q)
    }

    /// Both poles strictly inside the unit circle (stability triangle)
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Magnitude response at `frequency`
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (c1, s1) = (w.cos(), -w.sin());
        let (c2, s2) = ((2.0 * w).cos(), -(2.0 * w).sin());
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = self.b1 * s1 + self.b2 * s2;
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = self.a1 * s1 + self.a2 * s2;
        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One biquad section with its own filter memory (one per channel)
#[derive(Debug, Clone, Copy, Default)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            ..Self::default()
        }
    }

    /// Swap coefficients, keeping the filter memory
    pub fn set_coefficients(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coefficients(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    /// Process a single sample (direct form I)
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let x = input as f64;
        let mut y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        if y.abs() < DENORMAL_THRESHOLD as f64 {
            y = 0.0;
        }

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y as f32
    }

    /// Clear filter memory
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Linkwitz-Riley section: two cascaded Butterworth biquads
///
/// Low-pass and high-pass outputs at the same corner sum to an all-pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkwitzRiley {
    stages: [Biquad; 2],
}

impl LinkwitzRiley {
    pub fn new(filter_type: FilterType, sample_rate: f64, frequency: f64) -> Self {
        let mut filter = Self::default();
        filter.set_frequency(filter_type, sample_rate, frequency);
        filter
    }

    /// Recompute both stages for a new corner frequency
    pub fn set_frequency(&mut self, filter_type: FilterType, sample_rate: f64, frequency: f64) {
        let coeffs = BiquadCoeffs::design(filter_type, sample_rate, frequency, BUTTERWORTH_Q);
        for stage in &mut self.stages {
            stage.set_coefficients(coeffs);
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let first = self.stages[0].process(input);
        self.stages[1].process(first)
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}
