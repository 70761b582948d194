//! Single-word atomic float cell.

use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` stored in an `AtomicU32`.
///
/// Loads and stores are wait-free and never tear. Relaxed ordering is enough:
/// each cell is an independent value and readers only need the latest write.
#[derive(Debug, Default)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_load_store() {
        let cell = AtomicF32::new(0.25);
        assert_eq!(cell.load(), 0.25);
        cell.store(-3.5);
        assert_eq!(cell.load(), -3.5);
    }

    #[test]
    fn test_cross_thread_publication() {
        let cell = Arc::new(AtomicF32::new(0.0));
        let writer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for i in 0..1000 {
                    cell.store(i as f32);
                }
            })
        };
        writer.join().unwrap();
        assert_eq!(cell.load(), 999.0);
    }
}
