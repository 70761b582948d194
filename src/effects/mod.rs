//! Effect processors
//!
//! Each effect owns its parameter table, meters and DSP state and implements
//! [`Processor`](crate::processor::Processor). [`EffectKind`] is the registry
//! that maps stable ids to constructors.

pub mod bass_maximiser;
pub mod compressor;
pub mod filter;
pub mod harmonic_exciter;
pub mod limiter;
pub mod modulation;
pub mod noise_gate;
pub mod registry;
pub mod ring_modulator;

pub use bass_maximiser::BassMaximiser;
pub use compressor::Compressor;
pub use filter::FilterEffect;
pub use harmonic_exciter::{ExciterMode, HarmonicExciter};
pub use limiter::Limiter;
pub use modulation::{LfoTarget, ModulationEffect, ModulationKind, ModulationLayout};
pub use noise_gate::{GateStage, NoiseGate};
pub use registry::{create, EffectKind};
pub use ring_modulator::RingModulator;
