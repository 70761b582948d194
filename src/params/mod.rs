//! Parameter store
//!
//! An identifier-indexed table of parameter descriptors, each paired with an
//! atomic float cell. The control thread publishes values with `set`; the audio
//! thread reads them with `read(index)` using indices fixed at construction, so
//! the hot loop never searches by id or dispatches dynamically.

mod atomic;
mod smoother;

pub use atomic::AtomicF32;
pub use smoother::{Smoother, DEFAULT_RAMP_MS};

use crate::error::{HyperprismError, Result};

// ============================================================================
// Ranges
// ============================================================================

/// Value range of a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamRange {
    /// Evenly mapped range; `step == 0.0` means continuous
    Linear { min: f32, max: f32, step: f32 },
    /// Range whose normalized mapping is bent by `skew` (< 1 favours the low end)
    Skewed {
        min: f32,
        max: f32,
        step: f32,
        skew: f32,
    },
    /// Discrete choice stored as its index
    Choice { options: &'static [&'static str] },
}

impl ParamRange {
    pub fn min(&self) -> f32 {
        match *self {
            ParamRange::Linear { min, .. } | ParamRange::Skewed { min, .. } => min,
            ParamRange::Choice { .. } => 0.0,
        }
    }

    pub fn max(&self) -> f32 {
        match *self {
            ParamRange::Linear { max, .. } | ParamRange::Skewed { max, .. } => max,
            ParamRange::Choice { options } => options.len().saturating_sub(1) as f32,
        }
    }

    /// Clamp into `[min, max]`
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min(), self.max())
    }

    /// Clamp and snap to the step grid (choices snap to whole indices)
    pub fn constrain(&self, value: f32) -> f32 {
        let step = match *self {
            ParamRange::Linear { step, .. } | ParamRange::Skewed { step, .. } => step,
            ParamRange::Choice { .. } => 1.0,
        };
        let clamped = self.clamp(value);
        if step > 0.0 {
            let min = self.min();
            self.clamp(min + ((clamped - min) / step).round() * step)
        } else {
            clamped
        }
    }

    /// Map a plain value to `[0, 1]` for host automation
    pub fn to_normalized(&self, value: f32) -> f32 {
        let span = self.max() - self.min();
        if span <= 0.0 {
            return 0.0;
        }
        let proportion = (self.clamp(value) - self.min()) / span;
        match *self {
            ParamRange::Skewed { skew, .. } => proportion.powf(skew),
            _ => proportion,
        }
    }

    /// Map `[0, 1]` back to a plain value
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let normalized = normalized.clamp(0.0, 1.0);
        let proportion = match *self {
            ParamRange::Skewed { skew, .. } if skew > 0.0 => normalized.powf(1.0 / skew),
            _ => normalized,
        };
        self.constrain(self.min() + proportion * (self.max() - self.min()))
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, ParamRange::Choice { .. })
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Static description of a parameter: stable id, label, unit, range, default
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Stable identifier used for automation and persisted state
    pub id: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub range: ParamRange,
    pub default: f32,
}

impl ParamDescriptor {
    pub const fn linear(
        id: &'static str,
        label: &'static str,
        unit: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            id,
            label,
            unit,
            range: ParamRange::Linear { min, max, step: 0.0 },
            default,
        }
    }

    pub const fn stepped(
        id: &'static str,
        label: &'static str,
        unit: &'static str,
        min: f32,
        max: f32,
        step: f32,
        default: f32,
    ) -> Self {
        Self {
            id,
            label,
            unit,
            range: ParamRange::Linear { min, max, step },
            default,
        }
    }

    pub const fn skewed(
        id: &'static str,
        label: &'static str,
        unit: &'static str,
        min: f32,
        max: f32,
        skew: f32,
        default: f32,
    ) -> Self {
        Self {
            id,
            label,
            unit,
            range: ParamRange::Skewed {
                min,
                max,
                step: 0.0,
                skew,
            },
            default,
        }
    }

    pub const fn choice(
        id: &'static str,
        label: &'static str,
        options: &'static [&'static str],
        default_index: usize,
    ) -> Self {
        Self {
            id,
            label,
            unit: "",
            range: ParamRange::Choice { options },
            default: default_index as f32,
        }
    }

    pub const fn toggle(id: &'static str, label: &'static str, default: bool) -> Self {
        Self {
            id,
            label,
            unit: "",
            range: ParamRange::Choice {
                options: &["Off", "On"],
            },
            default: if default { 1.0 } else { 0.0 },
        }
    }
}

// ============================================================================
// Parameter
// ============================================================================

/// A descriptor plus its current value
#[derive(Debug)]
pub struct Parameter {
    descriptor: ParamDescriptor,
    value: AtomicF32,
}

impl Parameter {
    pub fn new(descriptor: ParamDescriptor) -> Self {
        let initial = descriptor.range.constrain(descriptor.default);
        Self {
            descriptor,
            value: AtomicF32::new(initial),
        }
    }

    pub fn descriptor(&self) -> &ParamDescriptor {
        &self.descriptor
    }

    pub fn id(&self) -> &'static str {
        self.descriptor.id
    }

    /// Current plain value, clamped to range
    #[inline]
    pub fn get(&self) -> f32 {
        self.descriptor.range.clamp(self.value.load())
    }

    /// Publish a new plain value; non-finite values are ignored
    pub fn set(&self, value: f32) {
        if value.is_finite() {
            self.value.store(self.descriptor.range.constrain(value));
        }
    }

    pub fn get_normalized(&self) -> f32 {
        self.descriptor.range.to_normalized(self.get())
    }

    pub fn set_normalized(&self, normalized: f32) {
        if normalized.is_finite() {
            self.value
                .store(self.descriptor.range.from_normalized(normalized));
        }
    }

    /// Current choice index (0 for continuous parameters at their minimum)
    #[inline]
    pub fn index(&self) -> usize {
        self.get().round().max(0.0) as usize
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.get() >= 0.5
    }

    pub fn reset(&self) {
        self.set(self.descriptor.default);
    }

    /// Human-readable value, e.g. "-20.00 dB" or "Bright"
    pub fn display(&self) -> String {
        match self.descriptor.range {
            ParamRange::Choice { options } => options
                .get(self.index())
                .map(|s| s.to_string())
                .unwrap_or_default(),
            _ if self.descriptor.unit.is_empty() => format!("{:.2}", self.get()),
            _ => format!("{:.2} {}", self.get(), self.descriptor.unit),
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// All parameters of one processor instance
///
/// Shared as `Arc<ParameterStore>` between the processor and its host/GUI.
/// The table layout is fixed at construction; only the values change.
#[derive(Debug)]
pub struct ParameterStore {
    owner: &'static str,
    params: Vec<Parameter>,
}

impl ParameterStore {
    pub fn new(owner: &'static str, descriptors: &[ParamDescriptor]) -> Self {
        Self {
            owner,
            params: descriptors.iter().copied().map(Parameter::new).collect(),
        }
    }

    /// Id of the effect that owns these parameters
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.params.iter().position(|p| p.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.id() == id)
    }

    /// Parameter at a table index fixed by the owning processor
    #[inline]
    pub fn at(&self, index: usize) -> &Parameter {
        &self.params[index]
    }

    /// Wait-free read of the clamped value at `index`
    #[inline]
    pub fn read(&self, index: usize) -> f32 {
        self.params[index].get()
    }

    /// Publish a value by id
    pub fn set(&self, id: &str, value: f32) -> Result<()> {
        let param = self.lookup(id)?;
        if !value.is_finite() {
            return Err(HyperprismError::InvalidParameter {
                param: id.to_string(),
                reason: format!("{} is not a finite number", value),
            });
        }
        param.set(value);
        Ok(())
    }

    /// Publish a value given as text: a number, or a choice label
    pub fn set_from_str(&self, id: &str, text: &str) -> Result<()> {
        let param = self.lookup(id)?;
        let text = text.trim();
        if let Ok(value) = text.parse::<f32>() {
            return self.set(id, value);
        }
        if let ParamRange::Choice { options } = param.descriptor().range {
            let lowered = text.to_ascii_lowercase();
            let alias = match lowered.as_str() {
                "true" | "yes" => "on",
                "false" | "no" => "off",
                other => other,
            };
            if let Some(index) = options.iter().position(|o| o.eq_ignore_ascii_case(alias)) {
                param.set(index as f32);
                return Ok(());
            }
            return Err(HyperprismError::InvalidParameter {
                param: id.to_string(),
                reason: format!("'{}' is not one of {:?}", text, options),
            });
        }
        Err(HyperprismError::InvalidParameter {
            param: id.to_string(),
            reason: format!("'{}' is not a number", text),
        })
    }

    pub fn reset_to_defaults(&self) {
        for param in &self.params {
            param.reset();
        }
    }

    /// Current values in table order
    pub fn snapshot(&self) -> Vec<(&'static str, f32)> {
        self.params.iter().map(|p| (p.id(), p.get())).collect()
    }

    fn lookup(&self, id: &str) -> Result<&Parameter> {
        self.get(id).ok_or_else(|| HyperprismError::UnknownParameter {
            effect: self.owner.to_string(),
            param: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TABLE: [ParamDescriptor; 4] = [
        ParamDescriptor::linear("gain", "Gain", "dB", -20.0, 20.0, 0.0),
        ParamDescriptor::skewed("freq", "Frequency", "Hz", 20.0, 20000.0, 0.3, 1000.0),
        ParamDescriptor::choice("wave", "Wave", &["Sine", "Triangle", "Square"], 1),
        ParamDescriptor::toggle("invert", "Invert", false),
    ];

    #[test]
    fn test_defaults_registered() {
        let store = ParameterStore::new("test", &TABLE);
        assert_eq!(store.len(), 4);
        assert_eq!(store.read(0), 0.0);
        assert_eq!(store.read(1), 1000.0);
        assert_eq!(store.at(2).index(), 1);
        assert!(!store.at(3).is_on());
    }

    #[test]
    fn test_set_clamps_to_range() {
        let store = ParameterStore::new("test", &TABLE);
        store.set("gain", 100.0).unwrap();
        assert_eq!(store.read(0), 20.0);
        store.set("gain", -100.0).unwrap();
        assert_eq!(store.read(0), -20.0);
        store.set("wave", 7.0).unwrap();
        assert_eq!(store.at(2).index(), 2);
    }

    #[test]
    fn test_set_rejects_non_finite_and_unknown() {
        let store = ParameterStore::new("test", &TABLE);
        assert!(store.set("gain", f32::NAN).is_err());
        assert_eq!(store.read(0), 0.0);

        let err = store.set("missing", 1.0).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_PARAMETER");
    }

    #[test]
    fn test_set_from_str_accepts_labels() {
        let store = ParameterStore::new("test", &TABLE);
        store.set_from_str("wave", "square").unwrap();
        assert_eq!(store.at(2).index(), 2);
        store.set_from_str("invert", "on").unwrap();
        assert!(store.at(3).is_on());
        store.set_from_str("invert", "false").unwrap();
        assert!(!store.at(3).is_on());
        store.set_from_str("gain", " -6.5 ").unwrap();
        assert_eq!(store.read(0), -6.5);
        assert!(store.set_from_str("wave", "noise").is_err());
        assert!(store.set_from_str("gain", "loud").is_err());
    }

    #[test]
    fn test_normalized_round_trip_on_skewed_range() {
        let store = ParameterStore::new("test", &TABLE);
        let freq = store.at(1);
        let normalized = freq.get_normalized();
        assert!(normalized > 0.0 && normalized < 1.0);
        freq.set_normalized(normalized);
        assert_relative_eq!(freq.get(), 1000.0, max_relative = 1e-3);

        freq.set_normalized(0.0);
        assert_eq!(freq.get(), 20.0);
        freq.set_normalized(1.0);
        assert_relative_eq!(freq.get(), 20000.0, max_relative = 1e-6);
    }

    #[test]
    fn test_stepped_range_snaps() {
        let range = ParamRange::Linear {
            min: 1.0,
            max: 5.0,
            step: 1.0,
        };
        assert_eq!(range.constrain(2.4), 2.0);
        assert_eq!(range.constrain(2.6), 3.0);
        assert_eq!(range.constrain(9.0), 5.0);
    }

    #[test]
    fn test_display() {
        let store = ParameterStore::new("test", &TABLE);
        assert_eq!(store.at(0).display(), "0.00 dB");
        assert_eq!(store.at(2).display(), "Triangle");
        assert_eq!(store.at(3).display(), "Off");
    }

    #[test]
    fn test_reset_to_defaults() {
        let store = ParameterStore::new("test", &TABLE);
        store.set("gain", 12.0).unwrap();
        store.set("invert", 1.0).unwrap();
        store.reset_to_defaults();
        assert_eq!(store.read(0), 0.0);
        assert!(!store.at(3).is_on());
    }
}
