//! HyperPrism - real-time DSP cores for single-effect audio processors
//!
//! Every effect implements the same [`Processor`] contract: the host prepares
//! it with a [`ProcessSpec`], publishes parameter values through a shared
//! [`ParameterStore`], and calls `process_block` in place on planar buffers.
//!
//! # Architecture
//!
//! - `params`: lock-free parameter cells and block-rate smoothing
//! - `dsp`: biquads, envelopes, delay lines and oscillators shared by effects
//! - `effects`: the processors and the id registry
//! - `state`: versioned JSON parameter snapshots
//! - `host`: offline WAV rendering used by the CLI

pub mod buffer;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod effects;
pub mod error;
pub mod host;
pub mod meters;
pub mod params;
pub mod processor;
pub mod state;

pub use buffer::AudioBuffer;
pub use config::RenderConfig;
pub use effects::{create, EffectKind};
pub use error::{HyperprismError, Result};
pub use meters::MeterBank;
pub use params::{ParamDescriptor, ParamRange, ParameterStore};
pub use processor::{ProcessSpec, Processor};
