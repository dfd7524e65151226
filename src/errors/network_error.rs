//! Network-related error types.

use thiserror::Error;

/// Errors that can occur while parsing an architecture description,
/// assembling a network, or driving it.
///
/// All variants propagate unhandled to the CLI boundary; the library never
/// prints or exits on its own.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unknown layer type '{layer_type}' in layer '{name}'")]
    UnknownLayerType { name: String, layer_type: String },

    #[error("invalid option '{key}' for layer '{name}': {reason}")]
    InvalidLayerOptions {
        name: String,
        key: String,
        reason: String,
    },

    #[error("layer '{name}' references unknown input '{input}'")]
    UnresolvedInput { name: String, input: String },

    #[error("layer '{name}' declares a second output layer; '{previous}' is already the output")]
    DuplicateOutputLayer { name: String, previous: String },

    #[error("network has no output layer")]
    MissingOutputLayer,

    #[error("shape mismatch at layer '{name}': expected size {expected}, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("no batch value supplied for network input '{name}'")]
    MissingInput { name: String },

    #[error("training corpus is too short: at least {minimum_tokens} tokens are required")]
    EmptyCorpus { minimum_tokens: usize },

    #[error("non-finite loss ({value}) at epoch {epoch}, batch {batch}; reduce the learning rate or batch size")]
    NumericalInstability {
        value: f32,
        epoch: usize,
        batch: usize,
    },

    #[error("incompatible persisted state: {reason}")]
    IncompatibleState { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record error: {0}")]
    Record(#[from] burn::record::RecorderError),
}
