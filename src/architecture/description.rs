//! Parser for the architecture description format.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::NetworkError;

/// Declaration of a top-level model input, e.g. `input type=class_ids
/// name=word_input`. Its size (the vocabulary) is supplied at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDeclaration {
    pub input_type: String,
    pub name: String,
}

/// Declaration of a single layer, parsed from one `layer` line.
///
/// `inputs` preserves the order the `input=` keys were written in; order
/// matters for layers that merge multiple inputs. Keys other than `type`,
/// `name`, and `input` are kept as opaque options for the layer type to
/// interpret at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDeclaration {
    pub layer_type: String,
    pub name: String,
    pub inputs: Vec<String>,
    pub options: BTreeMap<String, String>,
}

impl LayerDeclaration {
    /// Returns the raw value of an option, if present.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Parses an option as `usize`, if present.
    pub fn usize_option(&self, key: &str) -> Result<Option<usize>, NetworkError> {
        match self.option(key) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| {
                NetworkError::InvalidLayerOptions {
                    name: self.name.clone(),
                    key: key.to_string(),
                    reason: format!("'{value}' is not a non-negative integer"),
                }
            }),
        }
    }

    /// Parses a required `usize` option.
    pub fn require_usize(&self, key: &str) -> Result<usize, NetworkError> {
        self.usize_option(key)?
            .ok_or_else(|| NetworkError::InvalidLayerOptions {
                name: self.name.clone(),
                key: key.to_string(),
                reason: "required option is missing".to_string(),
            })
    }

    /// Parses an option as `f64`, if present.
    pub fn f64_option(&self, key: &str) -> Result<Option<f64>, NetworkError> {
        match self.option(key) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| {
                NetworkError::InvalidLayerOptions {
                    name: self.name.clone(),
                    key: key.to_string(),
                    reason: format!("'{value}' is not a number"),
                }
            }),
        }
    }
}

/// The parsed architecture description: model inputs and layers, in file
/// order. Immutable after parsing; serialized into checkpoints so that a
/// persisted state can be matched against the description it was built
/// from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureDescription {
    pub inputs: Vec<InputDeclaration>,
    pub layers: Vec<LayerDeclaration>,
}

/// Parses an architecture description from text.
///
/// Comments start with `#` and run to the end of the line. Blank lines are
/// skipped. Every name (input or layer) must be unique across the whole
/// description.
pub fn parse_description(text: &str) -> Result<ArchitectureDescription, NetworkError> {
    let mut inputs = Vec::new();
    let mut layers = Vec::new();
    let mut names = HashSet::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        let mut fields: BTreeMap<String, String> = BTreeMap::new();
        let mut input_refs: Vec<String> = Vec::new();
        for token in tokens {
            let Some((key, value)) = token.split_once('=') else {
                return Err(parse_error(
                    line_number,
                    format!("token '{token}' is not of the form key=value"),
                ));
            };
            if key.is_empty() || value.is_empty() {
                return Err(parse_error(
                    line_number,
                    format!("token '{token}' is not of the form key=value"),
                ));
            }
            if key == "input" {
                input_refs.push(value.to_string());
            } else if fields.insert(key.to_string(), value.to_string()).is_some() {
                return Err(parse_error(
                    line_number,
                    format!("option '{key}' given more than once"),
                ));
            }
        }

        let layer_type = fields.remove("type").ok_or_else(|| {
            parse_error(line_number, "required key 'type' is missing".to_string())
        })?;
        let name = fields.remove("name").ok_or_else(|| {
            parse_error(line_number, "required key 'name' is missing".to_string())
        })?;
        if !names.insert(name.clone()) {
            return Err(parse_error(
                line_number,
                format!("name '{name}' is already in use"),
            ));
        }

        match keyword {
            "input" => {
                if !input_refs.is_empty() || !fields.is_empty() {
                    return Err(parse_error(
                        line_number,
                        format!("input '{name}' takes only 'type' and 'name'"),
                    ));
                }
                inputs.push(InputDeclaration {
                    input_type: layer_type,
                    name,
                });
            }
            "layer" => {
                if input_refs.is_empty() {
                    return Err(parse_error(
                        line_number,
                        format!("layer '{name}' declares no inputs"),
                    ));
                }
                layers.push(LayerDeclaration {
                    layer_type,
                    name,
                    inputs: input_refs,
                    options: fields,
                });
            }
            other => {
                return Err(parse_error(
                    line_number,
                    format!("expected 'input' or 'layer', found '{other}'"),
                ));
            }
        }
    }

    Ok(ArchitectureDescription { inputs, layers })
}

fn parse_error(line: usize, message: String) -> NetworkError {
    NetworkError::Parse { line, message }
}
