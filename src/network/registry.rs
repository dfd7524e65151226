//! Layer type registry.
//!
//! Maps each layer type tag to a builder function that validates the
//! declared options against the type's schema and computes the output
//! shape. The registry is an explicit object constructed once at startup
//! and passed to the graph builder; there is no global mutable state.

use std::collections::HashMap;

use crate::architecture::LayerDeclaration;
use crate::errors::NetworkError;

/// Output tensor shape of a network node: feature size and whether the
/// node carries a full sequence (all layers here are sequence-preserving).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub size: usize,
    pub sequence: bool,
}

/// Validated, immutable configuration of one layer. A closed enumeration:
/// each variant carries exactly the options its type needs.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSpec {
    Projection {
        vocabulary_size: usize,
        size: usize,
    },
    Glu {
        input_size: usize,
        size: usize,
        filter_size: usize,
    },
    Lstm {
        input_size: usize,
        size: usize,
    },
    Dropout {
        rate: f64,
    },
    Add,
    Softmax {
        input_size: usize,
        size: usize,
    },
}

impl LayerSpec {
    /// True for the terminal output layer type. At most one such layer may
    /// appear in a graph, and it is the only type allowed to have no
    /// downstream consumer.
    pub fn is_output(&self) -> bool {
        matches!(self, LayerSpec::Softmax { .. })
    }
}

/// Result of building one declaration: the validated spec plus the shape
/// its node will produce.
#[derive(Debug, Clone)]
pub struct LayerPlan {
    pub spec: LayerSpec,
    pub output: Shape,
}

/// Build-time context shared by all builders.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext {
    /// Size of the vocabulary the external inputs are drawn from. Also the
    /// default output size of the softmax layer.
    pub vocabulary_size: usize,
}

/// Builds a [`LayerPlan`] from a declaration and the shapes of its
/// already-resolved inputs.
pub type LayerBuilder =
    fn(&LayerDeclaration, &[Shape], &BuildContext) -> Result<LayerPlan, NetworkError>;

/// Registry of layer type tags.
pub struct LayerRegistry {
    builders: HashMap<String, LayerBuilder>,
}

impl LayerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Creates a registry with the standard layer types registered:
    /// `projection`, `glu`, `lstm`, `dropout`, `add`, and `softmax`.
    pub fn with_standard_layers() -> Self {
        let mut registry = Self::new();
        registry.register("projection", build_projection);
        registry.register("glu", build_glu);
        registry.register("lstm", build_lstm);
        registry.register("dropout", build_dropout);
        registry.register("add", build_add);
        registry.register("softmax", build_softmax);
        registry
    }

    /// Registers a builder for a layer type tag, replacing any previous
    /// builder for the same tag.
    pub fn register(&mut self, tag: &str, builder: LayerBuilder) {
        self.builders.insert(tag.to_string(), builder);
    }

    /// Builds the plan for one declaration.
    pub fn build(
        &self,
        declaration: &LayerDeclaration,
        input_shapes: &[Shape],
        context: &BuildContext,
    ) -> Result<LayerPlan, NetworkError> {
        let builder = self.builders.get(&declaration.layer_type).ok_or_else(|| {
            NetworkError::UnknownLayerType {
                name: declaration.name.clone(),
                layer_type: declaration.layer_type.clone(),
            }
        })?;
        builder(declaration, input_shapes, context)
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::with_standard_layers()
    }
}

fn expect_input_count(
    declaration: &LayerDeclaration,
    input_shapes: &[Shape],
    expected: usize,
) -> Result<(), NetworkError> {
    if input_shapes.len() != expected {
        return Err(NetworkError::InvalidLayerOptions {
            name: declaration.name.clone(),
            key: "input".to_string(),
            reason: format!(
                "expected {expected} input(s), got {}",
                input_shapes.len()
            ),
        });
    }
    Ok(())
}

fn reject_unknown_options(
    declaration: &LayerDeclaration,
    allowed: &[&str],
) -> Result<(), NetworkError> {
    for key in declaration.options.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(NetworkError::InvalidLayerOptions {
                name: declaration.name.clone(),
                key: key.clone(),
                reason: format!(
                    "option is not recognized by layer type '{}'",
                    declaration.layer_type
                ),
            });
        }
    }
    Ok(())
}

fn build_projection(
    declaration: &LayerDeclaration,
    input_shapes: &[Shape],
    _context: &BuildContext,
) -> Result<LayerPlan, NetworkError> {
    expect_input_count(declaration, input_shapes, 1)?;
    reject_unknown_options(declaration, &["size"])?;
    let size = declaration.require_usize("size")?;

    Ok(LayerPlan {
        spec: LayerSpec::Projection {
            vocabulary_size: input_shapes[0].size,
            size,
        },
        output: Shape {
            size,
            sequence: input_shapes[0].sequence,
        },
    })
}

fn build_glu(
    declaration: &LayerDeclaration,
    input_shapes: &[Shape],
    _context: &BuildContext,
) -> Result<LayerPlan, NetworkError> {
    expect_input_count(declaration, input_shapes, 1)?;
    reject_unknown_options(declaration, &["size", "filter_size"])?;
    let size = declaration.require_usize("size")?;
    let filter_size = declaration.usize_option("filter_size")?.unwrap_or(1);
    if filter_size == 0 {
        return Err(NetworkError::InvalidLayerOptions {
            name: declaration.name.clone(),
            key: "filter_size".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(LayerPlan {
        spec: LayerSpec::Glu {
            input_size: input_shapes[0].size,
            size,
            filter_size,
        },
        output: Shape {
            size,
            sequence: input_shapes[0].sequence,
        },
    })
}

fn build_lstm(
    declaration: &LayerDeclaration,
    input_shapes: &[Shape],
    _context: &BuildContext,
) -> Result<LayerPlan, NetworkError> {
    expect_input_count(declaration, input_shapes, 1)?;
    reject_unknown_options(declaration, &["size"])?;
    let size = declaration.require_usize("size")?;

    Ok(LayerPlan {
        spec: LayerSpec::Lstm {
            input_size: input_shapes[0].size,
            size,
        },
        output: Shape {
            size,
            sequence: input_shapes[0].sequence,
        },
    })
}

fn build_dropout(
    declaration: &LayerDeclaration,
    input_shapes: &[Shape],
    _context: &BuildContext,
) -> Result<LayerPlan, NetworkError> {
    expect_input_count(declaration, input_shapes, 1)?;
    reject_unknown_options(declaration, &["dropout_rate"])?;
    let rate = declaration.f64_option("dropout_rate")?.unwrap_or(0.5);
    if !(0.0..1.0).contains(&rate) {
        return Err(NetworkError::InvalidLayerOptions {
            name: declaration.name.clone(),
            key: "dropout_rate".to_string(),
            reason: format!("{rate} is outside [0, 1)"),
        });
    }

    Ok(LayerPlan {
        spec: LayerSpec::Dropout { rate },
        output: input_shapes[0],
    })
}

fn build_add(
    declaration: &LayerDeclaration,
    input_shapes: &[Shape],
    _context: &BuildContext,
) -> Result<LayerPlan, NetworkError> {
    expect_input_count(declaration, input_shapes, 2)?;
    reject_unknown_options(declaration, &[])?;
    if input_shapes[0] != input_shapes[1] {
        return Err(NetworkError::ShapeMismatch {
            name: declaration.name.clone(),
            expected: input_shapes[0].size,
            actual: input_shapes[1].size,
        });
    }

    Ok(LayerPlan {
        spec: LayerSpec::Add,
        output: input_shapes[0],
    })
}

fn build_softmax(
    declaration: &LayerDeclaration,
    input_shapes: &[Shape],
    context: &BuildContext,
) -> Result<LayerPlan, NetworkError> {
    expect_input_count(declaration, input_shapes, 1)?;
    reject_unknown_options(declaration, &["size"])?;
    // The output distribution is indexed by word id everywhere downstream,
    // so an explicit size must agree with the vocabulary.
    let size = match declaration.usize_option("size")? {
        Some(size) if size != context.vocabulary_size => {
            return Err(NetworkError::InvalidLayerOptions {
                name: declaration.name.clone(),
                key: "size".to_string(),
                reason: format!(
                    "{size} does not match the vocabulary size {}",
                    context.vocabulary_size
                ),
            });
        }
        Some(size) => size,
        None => context.vocabulary_size,
    };

    Ok(LayerPlan {
        spec: LayerSpec::Softmax {
            input_size: input_shapes[0].size,
            size,
        },
        output: Shape {
            size,
            sequence: input_shapes[0].sequence,
        },
    })
}
