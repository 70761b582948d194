//! Offline host adapter
//!
//! Runs a processor over WAV files the way a plugin host would run it over a
//! stream: prepare once, fixed-size blocks, release at the end.

pub mod offline;
pub mod wav;

pub use offline::{render, RenderReport};
pub use wav::{read_wav, write_wav, WavAudio};
