//! Effect registry
//!
//! Maps stable effect ids to processor constructors.

use crate::dsp::FilterType;
use crate::error::{HyperprismError, Result};
use crate::processor::Processor;

use super::modulation::ModulationKind;
use super::{
    filter, BassMaximiser, Compressor, FilterEffect, HarmonicExciter, Limiter, ModulationEffect,
    NoiseGate, RingModulator,
};

/// Every processor the crate ships
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    BassMaximiser,
    Compressor,
    Limiter,
    NoiseGate,
    HarmonicExciter,
    RingModulator,
    Filter(FilterType),
    Modulation(ModulationKind),
}

const FILTER_TYPES: [FilterType; 4] = [
    FilterType::LowPass,
    FilterType::HighPass,
    FilterType::BandPass,
    FilterType::BandReject,
];

impl EffectKind {
    /// All effects in display order
    pub fn all() -> Vec<EffectKind> {
        let mut kinds = vec![
            EffectKind::BassMaximiser,
            EffectKind::Compressor,
            EffectKind::Limiter,
            EffectKind::NoiseGate,
            EffectKind::HarmonicExciter,
            EffectKind::RingModulator,
        ];
        kinds.extend(FILTER_TYPES.iter().map(|&t| EffectKind::Filter(t)));
        kinds.extend(ModulationKind::ALL.iter().map(|&k| EffectKind::Modulation(k)));
        kinds
    }

    /// Stable id, identical to the created processor's `effect_id`
    pub fn id(self) -> &'static str {
        match self {
            EffectKind::BassMaximiser => super::bass_maximiser::ID,
            EffectKind::Compressor => super::compressor::ID,
            EffectKind::Limiter => super::limiter::ID,
            EffectKind::NoiseGate => super::noise_gate::ID,
            EffectKind::HarmonicExciter => super::harmonic_exciter::ID,
            EffectKind::RingModulator => super::ring_modulator::ID,
            EffectKind::Filter(filter_type) => filter::effect_id(filter_type),
            EffectKind::Modulation(kind) => kind.id(),
        }
    }

    /// Look up a kind by id
    pub fn from_id(id: &str) -> Result<EffectKind> {
        Self::all()
            .into_iter()
            .find(|kind| kind.id() == id)
            .ok_or_else(|| HyperprismError::UnknownEffect {
                effect: id.to_string(),
            })
    }

    /// Construct a fresh, unprepared processor
    pub fn instantiate(self) -> Box<dyn Processor> {
        match self {
            EffectKind::BassMaximiser => Box::new(BassMaximiser::new()),
            EffectKind::Compressor => Box::new(Compressor::new()),
            EffectKind::Limiter => Box::new(Limiter::new()),
            EffectKind::NoiseGate => Box::new(NoiseGate::new()),
            EffectKind::HarmonicExciter => Box::new(HarmonicExciter::new()),
            EffectKind::RingModulator => Box::new(RingModulator::new()),
            EffectKind::Filter(filter_type) => Box::new(FilterEffect::new(filter_type)),
            EffectKind::Modulation(kind) => Box::new(ModulationEffect::new(kind)),
        }
    }
}

/// Create the processor registered under `id`
pub fn create(id: &str) -> Result<Box<dyn Processor>> {
    EffectKind::from_id(id).map(EffectKind::instantiate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_and_match_processors() {
        let kinds = EffectKind::all();
        let ids: HashSet<_> = kinds.iter().map(|k| k.id()).collect();
        assert_eq!(ids.len(), kinds.len());
        assert_eq!(kinds.len(), 18);

        for kind in kinds {
            let processor = kind.instantiate();
            assert_eq!(processor.effect_id(), kind.id());
            assert_eq!(processor.parameters().owner(), kind.id());
            assert!(!processor.is_prepared());
        }
    }

    #[test]
    fn test_create_by_id() {
        let processor = create("flanger").unwrap();
        assert_eq!(processor.display_name(), "Flanger");
        assert_eq!(
            EffectKind::from_id("band_pass").unwrap(),
            EffectKind::Filter(FilterType::BandPass)
        );
    }

    #[test]
    fn test_unknown_id() {
        let err = create("reverb").err().unwrap();
        assert_eq!(err.error_code(), "UNKNOWN_EFFECT");
    }
}
