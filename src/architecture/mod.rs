//! Architecture description parsing.
//!
//! An architecture description is a line-oriented text format declaring the
//! full layer graph of a model. Each non-comment line starts with the
//! keyword `input` or `layer` followed by whitespace-separated `key=value`
//! tokens:
//!
//! ```text
//! # A minimal language model.
//! input type=class_ids name=word_input
//! layer type=projection name=projection input=word_input size=128
//! layer type=softmax name=output input=projection
//! ```

mod description;

pub use description::{
    parse_description, ArchitectureDescription, InputDeclaration, LayerDeclaration,
};
