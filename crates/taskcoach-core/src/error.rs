//! Error types for the taskcoach core.
//!
//! Extraction errors never leave the component that produced them; each
//! producer maps them to its own fallback value. Store errors are the only
//! failures that reach the caller of the orchestrator.

use thiserror::Error;

/// Failures turning raw generated text into a validated record.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The generated text was empty or whitespace-only.
    #[error("generated output is empty")]
    EmptyOutput,

    /// No parseable JSON object could be recovered from the text.
    #[error("could not recover a JSON object: {0}")]
    UnrecoverableOutput(String),

    /// A JSON object was found but a required key is absent.
    #[error("missing required key: {0}")]
    MissingKey(String),

    /// The required keys are present but a field has the wrong type.
    #[error("output does not match the expected shape: {0}")]
    InvalidShape(String),
}

/// Failures reading from or writing to the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing storage could not be read or written.
    #[error("store unavailable for '{key}': {source}")]
    Unavailable {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The stored document exists but is not valid.
    #[error("stored document '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    /// A document that exists could not be loaded, so writing over it is
    /// refused.
    #[error("refusing to overwrite '{key}', it could not be loaded: {reason}")]
    NotLoaded { key: String, reason: String },

    /// The in-memory state could not be serialized.
    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why a generation stage produced no usable record.
///
/// Producers log this and fall back; it never reaches the orchestrator's
/// caller.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The provider call itself failed.
    #[error("provider call failed: {0:#}")]
    Provider(anyhow::Error),

    /// The provider did not answer within the configured timeout.
    #[error("provider call timed out after {0}s")]
    Timeout(u64),

    /// The response text could not be turned into the expected record.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The record parsed but failed a stage-specific check.
    #[error("rejected generated output: {0}")]
    Rejected(String),
}
