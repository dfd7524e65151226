//! Neural network layer implementations.
//!
//! These are the building blocks the graph builder instantiates: embedding
//! projection, gated linear unit convolution, LSTM recurrence, dropout,
//! and the softmax output layer. Residual addition has no parameters and
//! is performed directly by the execution steps in [`crate::network`].

pub mod dropout;
pub mod glu;
pub mod lstm;
pub mod projection;
pub mod softmax;

pub use dropout::dropout;
pub use glu::{Glu, GluConfig};
pub use lstm::{LstmLayer, LstmLayerConfig};
pub use projection::{Projection, ProjectionConfig};
pub use softmax::{SoftmaxConfig, SoftmaxOutput};
