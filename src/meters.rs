//! Meter bank: values published by the audio thread for displays.

use crate::params::AtomicF32;

/// Fixed set of named atomic meter slots
///
/// The audio thread writes with `publish`/`latch` at block end; readers poll
/// with `read`. Latches stay set until `clear` is called from the control side.
#[derive(Debug)]
pub struct MeterBank {
    names: &'static [&'static str],
    slots: Vec<AtomicF32>,
}

impl MeterBank {
    pub fn new(names: &'static [&'static str]) -> Self {
        Self {
            names,
            slots: names.iter().map(|_| AtomicF32::new(0.0)).collect(),
        }
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    /// Overwrite the slot at `index`
    #[inline]
    pub fn publish(&self, index: usize, value: f32) {
        self.slots[index].store(value);
    }

    /// Set the slot to 1 if `hit`; never resets it
    #[inline]
    pub fn latch(&self, index: usize, hit: bool) {
        if hit {
            self.slots[index].store(1.0);
        }
    }

    /// Reset the slot at `index` to 0
    pub fn clear(&self, index: usize) {
        self.slots[index].store(0.0);
    }

    pub fn clear_all(&self) {
        for slot in &self.slots {
            slot.store(0.0);
        }
    }

    pub fn value(&self, index: usize) -> f32 {
        self.slots[index].load()
    }

    /// Read a meter by name
    pub fn read(&self, name: &str) -> Option<f32> {
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|index| self.value(index))
    }

    /// All meters as `(name, value)` pairs
    pub fn readings(&self) -> Vec<(&'static str, f32)> {
        self.names
            .iter()
            .zip(&self.slots)
            .map(|(name, slot)| (*name, slot.load()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[&str] = &["gain_reduction", "peak_hit"];

    #[test]
    fn test_publish_and_read() {
        let meters = MeterBank::new(NAMES);
        meters.publish(0, 0.25);
        assert_eq!(meters.read("gain_reduction"), Some(0.25));
        assert_eq!(meters.read("missing"), None);
    }

    #[test]
    fn test_latch_holds_until_cleared() {
        let meters = MeterBank::new(NAMES);
        meters.latch(1, true);
        meters.latch(1, false);
        assert_eq!(meters.value(1), 1.0);
        meters.clear(1);
        assert_eq!(meters.value(1), 0.0);
    }
}
