//! DSP building blocks
//!
//! Value-typed primitives that the effect processors compose: biquad
//! sections, delay lines, envelope followers and oscillators. None of them
//! allocate after construction/`allocate`, so they are safe on the audio thread.

pub mod biquad;
pub mod delay_line;
pub mod envelope;
pub mod oscillator;

pub use biquad::{Biquad, BiquadCoeffs, FilterType, LinkwitzRiley, BUTTERWORTH_Q};
pub use delay_line::DelayLine;
pub use envelope::{Detector, EnvelopeFollower, GainSmoother, PeakHold};
pub use oscillator::{Oscillator, Waveform};

/// Magnitudes below this are flushed to zero in recursive state
pub const DENORMAL_THRESHOLD: f32 = 1.0e-15;

/// Small offset keeping `log10` finite on silence
pub const LEVEL_EPSILON: f32 = 1.0e-10;

// ============================================================================
// Helper Functions
// ============================================================================

/// Flush values that would decay into the subnormal range
///
/// NaN and infinities pass through unchanged.
#[inline]
pub fn undenormal(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD {
        0.0
    } else {
        x
    }
}

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels (floored at -120 dB)
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear > 1.0e-6 {
        20.0 * linear.log10()
    } else {
        -120.0
    }
}

/// One-pole coefficient for a time constant: `exp(-1 / (ms * 1e-3 * fs))`
///
/// Zero or negative times give an instantaneous response (coefficient 0).
#[inline]
pub fn time_to_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    let samples = time_ms * 0.001 * sample_rate;
    if samples <= 0.0 {
        0.0
    } else {
        (-1.0 / samples).exp()
    }
}

/// Milliseconds to a whole number of samples
#[inline]
pub fn ms_to_samples(time_ms: f32, sample_rate: f32) -> usize {
    (time_ms.max(0.0) * 0.001 * sample_rate).round() as usize
}
