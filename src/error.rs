//! Error handling for HyperPrism
//!
//! Only control-thread operations (state restore, parameter writes by id,
//! file I/O in the offline host) can fail. The audio path never returns errors.

use thiserror::Error;

/// Result type alias for HyperPrism operations
pub type Result<T> = std::result::Result<T, HyperprismError>;

/// Main error type for HyperPrism operations
#[derive(Error, Debug)]
pub enum HyperprismError {
    // Parameter Errors
    #[error("Invalid value for parameter '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },

    #[error("Unknown parameter '{param}' for effect '{effect}'")]
    UnknownParameter { effect: String, param: String },

    #[error("Unknown effect: {effect}")]
    UnknownEffect { effect: String },

    // Host Contract Errors
    #[error("Unsupported bus layout: {inputs} in / {outputs} out")]
    UnsupportedLayout { inputs: usize, outputs: usize },

    // State Errors
    #[error("Malformed state container: {reason}")]
    MalformedState { reason: String },

    #[error("State was saved by '{found}', cannot restore into '{expected}'")]
    StateEffectMismatch { expected: String, found: String },

    #[error("Unsupported state version {version} (newest supported: {supported})")]
    UnsupportedStateVersion { version: u32, supported: u32 },

    // Audio File Errors
    #[error("Invalid audio file: {reason}")]
    InvalidAudio { reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HyperprismError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            HyperprismError::InvalidParameter { .. } => "INVALID_PARAMETER",
            HyperprismError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            HyperprismError::UnknownEffect { .. } => "UNKNOWN_EFFECT",
            HyperprismError::UnsupportedLayout { .. } => "UNSUPPORTED_LAYOUT",
            HyperprismError::MalformedState { .. } => "MALFORMED_STATE",
            HyperprismError::StateEffectMismatch { .. } => "STATE_EFFECT_MISMATCH",
            HyperprismError::UnsupportedStateVersion { .. } => "UNSUPPORTED_STATE_VERSION",
            HyperprismError::InvalidAudio { .. } => "INVALID_AUDIO",
            HyperprismError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            HyperprismError::Io(_) => "IO_ERROR",
            HyperprismError::Wav(_) => "WAV_ERROR",
            HyperprismError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the processor state is still intact after this error
    ///
    /// State and parameter errors never partially apply, so the processor can
    /// keep running with its previous settings.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HyperprismError::InvalidParameter { .. }
                | HyperprismError::UnknownParameter { .. }
                | HyperprismError::MalformedState { .. }
                | HyperprismError::StateEffectMismatch { .. }
                | HyperprismError::UnsupportedStateVersion { .. }
        )
    }

    /// Returns a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "Pass a numeric value; it is clamped to the parameter range",
            Self::UnknownParameter { .. } => "Run 'hyperprism params <effect>' to list parameter ids",
            Self::UnknownEffect { .. } => "Run 'hyperprism list' to see available effects",
            Self::UnsupportedLayout { .. } => "Use mono or stereo audio with matching input and output",
            Self::MalformedState { .. } => "The state file is damaged; the previous settings were kept",
            Self::StateEffectMismatch { .. } => "Load the state into the effect that saved it",
            Self::UnsupportedStateVersion { .. } => "Save the state again with this version",
            Self::InvalidAudio { .. } | Self::UnsupportedFormat { .. } => {
                "Convert the file to 16/24-bit integer or 32-bit float WAV"
            }
            _ => "Check the error details and try again",
        }
    }
}
