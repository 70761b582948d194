//! Persisted processor state.
//!
//! A small versioned JSON container around a map of parameter id to value:
//!
//! ```json
//! {"format": "hyperprism-state", "version": 1, "effect": "compressor",
//!  "params": {"threshold": -20.0, "ratio": 4.0}}
//! ```
//!
//! Continuous parameters are written as floats and choices as integer indices.
//! Decoding validates the whole container before touching any parameter, so a
//! rejected state leaves the processor exactly as it was.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HyperprismError, Result};
use crate::params::ParameterStore;

/// Format tag of the container
pub const STATE_FORMAT: &str = "hyperprism-state";

/// Newest container version this build writes and reads
pub const STATE_VERSION: u32 = 1;

/// On-disk shape of a saved state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateContainer {
    pub format: String,
    pub version: u32,
    pub effect: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl StateContainer {
    /// Capture the current values of `store`
    pub fn capture(store: &ParameterStore) -> Self {
        let params = store
            .iter()
            .map(|param| {
                let value = if param.descriptor().range.is_choice() {
                    Value::from(param.index() as u64)
                } else {
                    Value::from(param.get() as f64)
                };
                (param.id().to_string(), value)
            })
            .collect();

        Self {
            format: STATE_FORMAT.to_string(),
            version: STATE_VERSION,
            effect: store.owner().to_string(),
            params,
        }
    }

    /// Parse and validate the container framing
    pub fn parse(data: &[u8]) -> Result<Self> {
        let container: StateContainer =
            serde_json::from_slice(data).map_err(|e| HyperprismError::MalformedState {
                reason: e.to_string(),
            })?;

        if container.format != STATE_FORMAT {
            return Err(HyperprismError::MalformedState {
                reason: format!("unexpected format tag '{}'", container.format),
            });
        }
        if container.version == 0 || container.version > STATE_VERSION {
            return Err(HyperprismError::UnsupportedStateVersion {
                version: container.version,
                supported: STATE_VERSION,
            });
        }
        Ok(container)
    }

    /// Publish the stored values into `store`
    ///
    /// Unknown ids are skipped and missing ids keep their current values.
    /// Returns the number of parameters written.
    pub fn apply(&self, store: &ParameterStore) -> Result<usize> {
        if self.effect != store.owner() {
            return Err(HyperprismError::StateEffectMismatch {
                expected: store.owner().to_string(),
                found: self.effect.clone(),
            });
        }

        let mut updates = Vec::with_capacity(self.params.len());
        for (id, value) in &self.params {
            let Some(index) = store.index_of(id) else {
                log::debug!("Ignoring unknown parameter '{}' in {} state", id, self.effect);
                continue;
            };
            let number = value
                .as_f64()
                .ok_or_else(|| HyperprismError::MalformedState {
                    reason: format!("value of '{}' is not a number", id),
                })?;
            updates.push((index, number as f32));
        }

        for &(index, value) in &updates {
            store.at(index).set(value);
        }
        Ok(updates.len())
    }
}

/// Serialize the current parameter values of `store`
pub fn encode(store: &ParameterStore) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&StateContainer::capture(store))?)
}

/// Restore parameter values from `data`; on error nothing is changed
pub fn decode_into(store: &ParameterStore, data: &[u8]) -> Result<usize> {
    let container = StateContainer::parse(data)?;
    let applied = container.apply(store)?;
    log::info!(
        "Restored {} of {} parameters for {}",
        applied,
        store.len(),
        store.owner()
    );
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamDescriptor;
    use pretty_assertions::assert_eq;

    const TABLE: [ParamDescriptor; 3] = [
        ParamDescriptor::linear("threshold", "Threshold", "dB", -60.0, 0.0, -20.0),
        ParamDescriptor::linear("ratio", "Ratio", ":1", 1.0, 20.0, 4.0),
        ParamDescriptor::choice("mode", "Mode", &["Warm", "Bright"], 0),
    ];

    fn store() -> ParameterStore {
        ParameterStore::new("compressor", &TABLE)
    }

    #[test]
    fn test_round_trip() {
        let source = store();
        source.set("threshold", -31.5).unwrap();
        source.set("mode", 1.0).unwrap();
        let bytes = encode(&source).unwrap();

        let target = store();
        assert_eq!(decode_into(&target, &bytes).unwrap(), 3);
        assert_eq!(target.snapshot(), source.snapshot());
    }

    #[test]
    fn test_choices_are_written_as_integers() {
        let source = store();
        source.set("mode", 1.0).unwrap();
        let container = StateContainer::capture(&source);
        assert!(container.params["mode"].is_u64());
        assert!(container.params["ratio"].is_f64());
    }

    #[test]
    fn test_unknown_keys_ignored_missing_keys_kept() {
        let target = store();
        target.set("ratio", 8.0).unwrap();
        let json = br#"{"format":"hyperprism-state","version":1,"effect":"compressor",
            "params":{"threshold":-10.0,"sidechain":1.0},"comment":"extra"}"#;
        assert_eq!(decode_into(&target, json).unwrap(), 1);
        assert_eq!(target.read(0), -10.0);
        assert_eq!(target.read(1), 8.0);
    }

    #[test]
    fn test_rejected_containers_leave_state_untouched() {
        let target = store();
        target.set("threshold", -12.0).unwrap();
        let before = target.snapshot();

        let cases: [&[u8]; 5] = [
            b"not json",
            br#"{"format":"other","version":1,"effect":"compressor","params":{}}"#,
            br#"{"format":"hyperprism-state","version":9,"effect":"compressor","params":{}}"#,
            br#"{"format":"hyperprism-state","version":1,"effect":"limiter","params":{"threshold":-1}}"#,
            br#"{"format":"hyperprism-state","version":1,"effect":"compressor","params":{"threshold":-1,"ratio":"x"}}"#,
        ];
        for case in cases {
            let err = decode_into(&target, case).unwrap_err();
            assert!(err.is_recoverable(), "{}", err);
            assert_eq!(target.snapshot(), before);
        }
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let target = store();
        let json = br#"{"format":"hyperprism-state","version":1,"effect":"compressor",
            "params":{"threshold":-500,"mode":7}}"#;
        decode_into(&target, json).unwrap();
        assert_eq!(target.read(0), -60.0);
        assert_eq!(target.at(2).index(), 1);
    }
}
