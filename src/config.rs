//! Render configuration
//!
//! Loaded from a JSON file and then overridden by command-line flags.
//!
//! ```json
//! {
//!   "block_size": 256,
//!   "latency_compensation": true,
//!   "tail_ms": 500,
//!   "bits_per_sample": 24,
//!   "params": { "threshold": -24, "waveform": "Triangle" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HyperprismError, Result};
use crate::params::ParameterStore;

/// Largest block the offline host will run
pub const MAX_BLOCK_SIZE: usize = 65536;

/// Settings for one offline render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples per `process_block` call
    pub block_size: usize,
    /// Trim the processor's lookahead latency from the output
    pub latency_compensation: bool,
    /// Silence appended after the input so tails can ring out
    pub tail_ms: f32,
    /// Output bit depth; `None` keeps the input file's depth
    pub bits_per_sample: Option<u16>,
    /// Parameter values applied before rendering (number or choice label)
    pub params: BTreeMap<String, Value>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            block_size: 512,
            latency_compensation: true,
            tail_ms: 0.0,
            bits_per_sample: None,
            params: BTreeMap::new(),
        }
    }
}

impl RenderConfig {
    /// Parse from JSON text and validate
    pub fn from_json(text: &str) -> Result<Self> {
        let config: RenderConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::info!("Loaded render config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(HyperprismError::InvalidParameter {
                param: "block_size".to_string(),
                reason: format!("must be between 1 and {}", MAX_BLOCK_SIZE),
            });
        }
        if !self.tail_ms.is_finite() || self.tail_ms < 0.0 {
            return Err(HyperprismError::InvalidParameter {
                param: "tail_ms".to_string(),
                reason: "must be a non-negative number of milliseconds".to_string(),
            });
        }
        Ok(())
    }

    /// Record a `id=value` override from the command line
    pub fn push_override(&mut self, assignment: &str) -> Result<()> {
        let (id, value) = assignment
            .split_once('=')
            .ok_or_else(|| HyperprismError::InvalidParameter {
                param: assignment.to_string(),
                reason: "expected id=value".to_string(),
            })?;
        let value = value.trim();
        let value = value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or_else(|| Value::String(value.to_string()), Value::Number);
        self.params.insert(id.trim().to_string(), value);
        Ok(())
    }

    /// Apply the parameter overrides to `store`
    ///
    /// Ids and value types are checked before anything is written.
    pub fn apply_params(&self, store: &ParameterStore) -> Result<()> {
        for (id, value) in &self.params {
            if store.get(id).is_none() {
                return Err(HyperprismError::UnknownParameter {
                    effect: store.owner().to_string(),
                    param: id.clone(),
                });
            }
            if !(value.is_number() || value.is_string()) {
                return Err(HyperprismError::InvalidParameter {
                    param: id.clone(),
                    reason: format!("expected a number or label, got {}", value),
                });
            }
        }

        for (id, value) in &self.params {
            match value {
                Value::String(text) => store.set_from_str(id, text)?,
                other => store.set(id, other.as_f64().unwrap_or_default() as f32)?,
            }
        }
        Ok(())
    }
}
