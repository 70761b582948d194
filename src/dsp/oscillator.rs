//! Phase-accumulator oscillator.

use std::f32::consts::{PI, TAU};

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Square,
    Saw,
}

impl Waveform {
    /// Choice labels, in index order
    pub const LABELS: &'static [&'static str] = &["Sine", "Triangle", "Square", "Saw"];

    /// Subset offered by the LFO-driven effects
    pub const LFO_LABELS: &'static [&'static str] = &["Sine", "Triangle"];

    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Waveform::Triangle,
            2 => Waveform::Square,
            3 => Waveform::Saw,
            _ => Waveform::Sine,
        }
    }

    /// Evaluate at `phase` in `[0, 2π)`; output in `[-1, 1]`
    #[inline]
    pub fn at(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => phase.sin(),
            Waveform::Triangle => {
                let t = phase / TAU;
                if t < 0.25 {
                    4.0 * t
                } else if t < 0.75 {
                    2.0 - 4.0 * t
                } else {
                    4.0 * t - 4.0
                }
            }
            Waveform::Square => {
                if phase < PI {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => phase / PI - 1.0,
        }
    }
}

/// Phase in `[0, 2π)` advanced by a fixed increment per sample
#[derive(Debug, Clone, Copy, Default)]
pub struct Oscillator {
    phase: f32,
    increment: f32,
}

impl Oscillator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment per sample: `2π·f/fs`
    pub fn set_frequency(&mut self, frequency: f32, sample_rate: f32) {
        self.increment = if sample_rate > 0.0 {
            (TAU * frequency / sample_rate).clamp(0.0, TAU)
        } else {
            0.0
        };
    }

    #[inline]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn increment(&self) -> f32 {
        self.increment
    }

    /// Advance one sample, wrapping by subtraction
    #[inline]
    pub fn advance(&mut self) {
        self.phase += self.increment;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
    }

    /// Full modulo wrap, for block boundaries
    pub fn wrap(&mut self) {
        self.phase = self.phase.rem_euclid(TAU);
        if self.phase >= TAU {
            self.phase = 0.0;
        }
    }

    /// Value at the current phase, then advance
    #[inline]
    pub fn next(&mut self, waveform: Waveform) -> f32 {
        let value = waveform.at(self.phase);
        self.advance();
        value
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use test_case::test_case;

    #[test_case(Waveform::Sine ; "sine")]
    #[test_case(Waveform::Triangle ; "triangle")]
    #[test_case(Waveform::Square ; "square")]
    #[test_case(Waveform::Saw ; "saw")]
    fn test_waveform_is_bounded(waveform: Waveform) {
        let mut osc = Oscillator::new();
        osc.set_frequency(997.0, 48000.0);
        for _ in 0..48000 {
            let v = osc.next(waveform);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_triangle_shape() {
        assert_abs_diff_eq!(Waveform::Triangle.at(0.0), 0.0);
        assert_abs_diff_eq!(Waveform::Triangle.at(PI / 2.0), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(Waveform::Triangle.at(PI), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(Waveform::Triangle.at(1.5 * PI), -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_square_and_saw() {
        assert_eq!(Waveform::Square.at(0.1), 1.0);
        assert_eq!(Waveform::Square.at(PI + 0.1), -1.0);
        assert_abs_diff_eq!(Waveform::Saw.at(0.0), -1.0);
        assert_abs_diff_eq!(Waveform::Saw.at(PI), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_phase_stays_in_range() {
        let mut osc = Oscillator::new();
        osc.set_frequency(8000.0, 44100.0);
        for _ in 0..1_000_000 {
            osc.advance();
            assert!(osc.phase() >= 0.0 && osc.phase() < TAU);
        }
        osc.wrap();
        assert!(osc.phase() < TAU);
    }

    #[test]
    fn test_from_index_falls_back_to_sine() {
        assert_eq!(Waveform::from_index(3), Waveform::Saw);
        assert_eq!(Waveform::from_index(42), Waveform::Sine);
    }
}
