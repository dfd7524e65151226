//! Error types for the toolkit.

mod network_error;

pub use network_error::NetworkError;
