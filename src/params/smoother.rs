//! Per-sample parameter smoothing.
//!
//! Exponential ramp between the current and target value, avoiding zipper
//! noise when output gain, mix or makeup change between blocks.

/// Ramp time for a full jump to settle
pub const DEFAULT_RAMP_MS: f32 = 50.0;

/// Time constants that fit into one ramp. After this many the residual error
/// is below 0.1 % of the jump, and the ramp snaps onto the target.
const TIME_CONSTANTS_PER_RAMP: f32 = 7.0;

/// One-pole smoother that lands exactly on its target after `ramp_samples`
#[derive(Debug, Clone)]
pub struct Smoother {
    current: f32,
    target: f32,
    /// Per-sample step: `current += coeff * (target - current)`
    coeff: f32,
    ramp_ms: f32,
    ramp_samples: usize,
    remaining: usize,
}

impl Smoother {
    /// Create a smoother with the given ramp time (seeded at 0 until prepared)
    pub fn new(ramp_ms: f32) -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            coeff: 1.0,
            ramp_ms: ramp_ms.max(0.0),
            ramp_samples: 0,
            remaining: 0,
        }
    }

    /// Size the ramp for `sample_rate` and seed both ends at `value` (no ramp)
    pub fn prepare(&mut self, sample_rate: f32, value: f32) {
        self.ramp_samples = (self.ramp_ms * 0.001 * sample_rate).round() as usize;
        self.coeff = if self.ramp_samples > 0 {
            1.0 - (-TIME_CONSTANTS_PER_RAMP / self.ramp_samples as f32).exp()
        } else {
            1.0
        };
        self.reset(value);
    }

    /// Snap to `value` immediately
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.remaining = 0;
    }

    /// Set a new target; restarts the ramp only when the target moves
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        if target != self.target {
            self.target = target;
            if self.ramp_samples == 0 {
                self.current = target;
                self.remaining = 0;
            } else {
                self.remaining = self.ramp_samples;
            }
        }
    }

    /// Next smoothed value (called once per sample from the audio thread)
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.current = self.target;
            } else {
                self.current += self.coeff * (self.target - self.current);
            }
        }
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_smoothing(&self) -> bool {
        self.remaining > 0
    }

    /// Per-sample coefficient; bounds the largest step to `coeff * |jump|`
    pub fn coefficient(&self) -> f32 {
        self.coeff
    }

    pub fn ramp_samples(&self) -> usize {
        self.ramp_samples
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(DEFAULT_RAMP_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_on_prepare() {
        let mut s = Smoother::default();
        s.prepare(48000.0, 0.7);
        assert_eq!(s.next(), 0.7);
        assert!(!s.is_smoothing());
    }

    #[test]
    fn lands_exactly_on_target_after_ramp() {
        let mut s = Smoother::default();
        s.prepare(48000.0, 0.0);
        s.set_target(1.0);
        assert_eq!(s.ramp_samples(), 2400);
        for _ in 0..2399 {
            s.next();
        }
        assert!(s.is_smoothing());
        assert_eq!(s.next(), 1.0);
        assert!(!s.is_smoothing());
        assert_eq!(s.next(), 1.0);
    }

    #[test]
    fn steps_are_bounded_by_coefficient() {
        let mut s = Smoother::default();
        s.prepare(48000.0, 1.0);
        s.set_target(10.0);
        let bound = s.coefficient() * 9.0 + 1e-5;
        let mut previous = s.current();
        for _ in 0..3000 {
            let value = s.next();
            assert!((value - previous).abs() <= bound);
            previous = value;
        }
    }

    #[test]
    fn unchanged_target_does_not_restart_ramp() {
        let mut s = Smoother::default();
        s.prepare(44100.0, 0.5);
        s.set_target(0.5);
        assert!(!s.is_smoothing());
    }

    #[test]
    fn zero_ramp_is_immediate() {
        let mut s = Smoother::new(0.0);
        s.prepare(48000.0, 0.0);
        s.set_target(2.0);
        assert_eq!(s.next(), 2.0);
    }
}
