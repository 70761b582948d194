//! Delay line with fractional read.
//!
//! Fixed-capacity circular buffer. Storage is sized once in `allocate`
//! (called from `prepare`) and never reallocates while processing.

/// Circular buffer of past samples
///
/// `tap(0)` is the most recently written sample, `tap(n)` the one written `n`
/// writes earlier. The longest reachable delay is `capacity - 1`.
#[derive(Debug, Clone, Default)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Create a delay line able to delay by up to `max_delay_samples`
    pub fn new(max_delay_samples: usize) -> Self {
        let mut line = Self::default();
        line.allocate(max_delay_samples);
        line
    }

    /// Resize for a new maximum delay and clear the contents
    pub fn allocate(&mut self, max_delay_samples: usize) {
        self.buffer.clear();
        self.buffer.resize(max_delay_samples + 1, 0.0);
        self.write_pos = 0;
    }

    /// Free the storage (state invalid until the next `allocate`)
    pub fn release(&mut self) {
        self.buffer = Vec::new();
        self.write_pos = 0;
    }

    pub fn max_delay(&self) -> usize {
        self.buffer.len().saturating_sub(1)
    }

    pub fn is_allocated(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Write one sample and advance
    #[inline]
    pub fn write(&mut self, sample: f32) {
        if self.buffer.is_empty() {
            return;
        }
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos >= self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Sample written `delay` writes before the most recent one
    #[inline]
    pub fn tap(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        if len == 0 {
            return 0.0;
        }
        let delay = delay.min(len - 1);
        let last_written = if self.write_pos == 0 {
            len - 1
        } else {
            self.write_pos - 1
        };
        let read_pos = if last_written >= delay {
            last_written - delay
        } else {
            len + last_written - delay
        };
        self.buffer[read_pos]
    }

    /// Fractional tap with linear interpolation
    #[inline]
    pub fn tap_frac(&self, delay: f32) -> f32 {
        let delay = delay.clamp(0.0, self.max_delay() as f32);
        let whole = delay.floor();
        let frac = delay - whole;
        let index = whole as usize;
        let a = self.tap(index);
        if frac == 0.0 {
            return a;
        }
        let b = self.tap(index + 1);
        a + (b - a) * frac
    }

    /// Write `input`, then return the sample from `delay` writes ago
    ///
    /// `delay == 0` returns `input` unchanged.
    #[inline]
    pub fn process(&mut self, input: f32, delay: usize) -> f32 {
        self.write(input);
        self.tap(delay)
    }

    /// Zero the contents, keeping the capacity
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_delay() {
        let mut line = DelayLine::new(4);
        let out: Vec<f32> = (1..=8).map(|i| line.process(i as f32, 3)).collect();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_zero_delay_is_passthrough() {
        let mut line = DelayLine::new(16);
        for i in 0..40 {
            let x = i as f32 * 0.1;
            assert_eq!(line.process(x, 0), x);
        }
    }

    #[test]
    fn test_delay_is_clamped_to_capacity() {
        let mut line = DelayLine::new(2);
        line.write(1.0);
        line.write(2.0);
        line.write(3.0);
        assert_eq!(line.max_delay(), 2);
        assert_eq!(line.tap(10), line.tap(2));
        assert_eq!(line.tap(2), 1.0);
    }

    #[test]
    fn test_fractional_tap_interpolates() {
        let mut line = DelayLine::new(8);
        line.write(0.0);
        line.write(1.0);
        // tap(0) = 1.0, tap(1) = 0.0
        assert!((line.tap_frac(0.25) - 0.75).abs() < 1e-6);
        assert!((line.tap_frac(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(line.tap_frac(0.0), 1.0);
    }

    #[test]
    fn test_clear_and_release() {
        let mut line = DelayLine::new(4);
        line.write(1.0);
        line.clear();
        assert_eq!(line.tap(0), 0.0);

        line.release();
        assert!(!line.is_allocated());
        line.write(1.0);
        assert_eq!(line.tap(0), 0.0);
    }
}
