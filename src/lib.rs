//! # burnlm
//!
//! A Rust toolkit for training, scoring, and sampling neural language
//! models defined by declarative architecture descriptions.
//!
//! An architecture is a small text file: one line per input or layer, each
//! line a list of `key=value` fields. The toolkit parses the description,
//! wires the declared layers into an acyclic computation graph, and drives
//! the resulting network for training, scoring, decoding, and sampling.
//!
//! ## Features
//!
//! - **Burn Backend**: Uses the Burn framework; models are
//!   backend-generic, with NdArray as the bundled CPU backend.
//! - **Declarative Architectures**: Networks are described in text, so the
//!   same binary trains any graph the layer registry can build.
//! - **Self-Describing Checkpoints**: Saved states carry their
//!   architecture and vocabulary, and refuse to load into a different
//!   graph.
//!
//! ## Example
//!
//! ```
//! use burnlm::prelude::*;
//!
//! let device = <burnlm::Backend as burn::tensor::backend::Backend>::Device::default();
//!
//! let description = parse_description(
//!     "\
//! input type=class_ids name=word_input
//! layer type=projection name=projection input=word_input size=16
//! layer type=glu name=conv input=projection size=16 filter_size=3
//! layer type=softmax name=output input=conv
//! ",
//! )
//! .expect("description should parse");
//!
//! let registry = LayerRegistry::with_standard_layers();
//! let network: Network<burnlm::Backend> = NetworkBuilder::new(&registry)
//!     .build(&description, 100)
//!     .expect("graph should assemble")
//!     .init(&device);
//!
//! assert_eq!(network.output_size(), 100);
//! ```

pub mod architecture;
pub mod checkpoint;
pub mod errors;
pub mod inference;
pub mod layers;
pub mod network;
pub mod training;
pub mod vocabulary;

// Re-exports for convenience
pub use architecture::{parse_description, ArchitectureDescription};
pub use errors::NetworkError;
pub use network::{ForwardMode, LayerRegistry, Network, NetworkBuilder};
pub use training::{train, StopHandle, TrainingConfig};
pub use vocabulary::Vocabulary;

/// Backend type alias for CPU inference.
pub type Backend = burn::backend::NdArray;

/// Backend type alias for training, with autodiff support.
pub type TrainingBackend = burn::backend::Autodiff<burn::backend::NdArray>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::architecture::{parse_description, ArchitectureDescription};
    pub use crate::errors::NetworkError;
    pub use crate::network::{ForwardMode, LayerRegistry, Network, NetworkBuilder, NetworkPlan};
    pub use crate::training::{train, StopHandle, TrainingConfig};
    pub use crate::vocabulary::Vocabulary;
    pub use crate::{Backend, TrainingBackend};
}
