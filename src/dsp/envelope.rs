//! Envelope followers and gain ballistics.

use super::undenormal;

/// What the follower measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detector {
    /// Rectified magnitude
    #[default]
    Peak,
    /// Mean square, reported as its square root
    Rms,
}

/// One-pole level follower with separate attack and release
///
/// Coefficients are in the `exp(-1/τ)` form: 0 reacts instantly, values near 1
/// react slowly. Attack applies while the level rises above the envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack: f32,
    release: f32,
    detector: Detector,
}

impl EnvelopeFollower {
    pub fn new(detector: Detector) -> Self {
        Self {
            detector,
            ..Self::default()
        }
    }

    /// Set raw one-pole coefficients
    pub fn set_coefficients(&mut self, attack: f32, release: f32) {
        self.attack = attack.clamp(0.0, 1.0);
        self.release = release.clamp(0.0, 1.0);
    }

    /// Feed one sample, return the updated envelope
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let level = match self.detector {
            Detector::Peak => input.abs(),
            Detector::Rms => input * input,
        };
        let coeff = if level > self.envelope {
            self.attack
        } else {
            self.release
        };
        self.envelope = undenormal(coeff * self.envelope + (1.0 - coeff) * level);
        self.value()
    }

    /// Instant attack, exponential release: `env = max(env * release, |x|)`
    #[inline]
    pub fn process_instant(&mut self, input: f32) -> f32 {
        let level = match self.detector {
            Detector::Peak => input.abs(),
            Detector::Rms => input * input,
        };
        self.envelope = undenormal((self.envelope * self.release).max(level));
        self.value()
    }

    #[inline]
    pub fn value(&self) -> f32 {
        match self.detector {
            Detector::Peak => self.envelope,
            Detector::Rms => self.envelope.sqrt(),
        }
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

/// Sliding-window maximum of a level signal
///
/// Returns the largest input among the last `window + 1` calls. A peak is
/// therefore held for exactly `window` samples after it arrives, which keeps a
/// lookahead detector at full level until the delayed peak has been gained.
/// Storage is fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct PeakHold {
    /// `(arrival, level)` pairs with strictly decreasing levels
    slots: Vec<(u64, f32)>,
    head: usize,
    len: usize,
    clock: u64,
}

impl PeakHold {
    pub fn new(max_window: usize) -> Self {
        Self {
            slots: vec![(0, 0.0); max_window + 1],
            head: 0,
            len: 0,
            clock: 0,
        }
    }

    /// Feed one level, return the maximum over the current window
    #[inline]
    pub fn process(&mut self, level: f32, window: usize) -> f32 {
        let capacity = self.slots.len();
        if capacity == 0 {
            return level;
        }
        let window = window.min(capacity - 1) as u64;
        let now = self.clock;
        self.clock += 1;

        while self.len > 0 && self.slots[self.head].0 + window < now {
            self.head = (self.head + 1) % capacity;
            self.len -= 1;
        }
        while self.len > 0 {
            let back = (self.head + self.len - 1) % capacity;
            if self.slots[back].1 > level {
                break;
            }
            self.len -= 1;
        }
        let tail = (self.head + self.len) % capacity;
        self.slots[tail] = (now, level);
        self.len += 1;
        self.slots[self.head].1
    }

    pub fn reset(&mut self) {
        self.head = 0;
        self.len = 0;
        self.clock = 0;
    }
}

/// Gain smoother for dynamics processors
///
/// Moves toward the target gain with the attack coefficient while the gain
/// falls (reduction increases) and the release coefficient while it recovers.
#[derive(Debug, Clone, Copy)]
pub struct GainSmoother {
    gain: f32,
    attack: f32,
    release: f32,
}

impl GainSmoother {
    pub fn new() -> Self {
        Self {
            gain: 1.0,
            attack: 0.0,
            release: 0.0,
        }
    }

    pub fn set_coefficients(&mut self, attack: f32, release: f32) {
        self.attack = attack.clamp(0.0, 1.0);
        self.release = release.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        let coeff = if target < self.gain {
            self.attack
        } else {
            self.release
        };
        self.gain = coeff * self.gain + (1.0 - coeff) * target;
        self.gain
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Back to unity gain
    pub fn reset(&mut self) {
        self.gain = 1.0;
    }
}

impl Default for GainSmoother {
    fn default() -> Self {
        Self::new()
    }
}
