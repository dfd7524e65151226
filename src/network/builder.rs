//! Graph builder: declarations in, wired network plan out.

use std::collections::HashMap;

use burn::tensor::backend::Backend;
use tracing::debug;

use crate::architecture::ArchitectureDescription;
use crate::errors::NetworkError;
use crate::network::model::Network;
use crate::network::registry::{BuildContext, LayerPlan, LayerRegistry, LayerSpec, Shape};

/// Reference from a layer to one of its inputs: either a top-level model
/// input or an earlier layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Input(usize),
    Layer(usize),
}

/// A top-level model input with its resolved size.
#[derive(Debug, Clone)]
pub struct PlannedInput {
    pub name: String,
    pub size: usize,
}

/// One fully resolved layer: validated spec, wired inputs, output shape.
#[derive(Debug, Clone)]
pub struct PlannedLayer {
    pub name: String,
    pub spec: LayerSpec,
    pub inputs: Vec<NodeRef>,
    pub output: Shape,
}

/// The assembled computation graph, before any parameters exist.
///
/// Acyclic by construction: a layer can only reference inputs and layers
/// declared before it. Holds the source description so checkpoints can
/// record what they were built from.
#[derive(Debug, Clone)]
pub struct NetworkPlan {
    description: ArchitectureDescription,
    inputs: Vec<PlannedInput>,
    layers: Vec<PlannedLayer>,
    output: usize,
}

impl NetworkPlan {
    pub fn description(&self) -> &ArchitectureDescription {
        &self.description
    }

    pub fn inputs(&self) -> &[PlannedInput] {
        &self.inputs
    }

    pub fn layers(&self) -> &[PlannedLayer] {
        &self.layers
    }

    /// Index of the designated output layer.
    pub fn output_index(&self) -> usize {
        self.output
    }

    /// Looks up a planned layer by name.
    pub fn layer(&self, name: &str) -> Option<&PlannedLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    /// Allocates all parameter tensors on the given device and returns the
    /// runnable network. This is the memory-heaviest step of assembly.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Network<B> {
        Network::from_plan(self, device)
    }
}

/// Builds a [`NetworkPlan`] from a parsed description.
///
/// Declarations must already be in dependency order: every `input=`
/// reference must name a model input or a layer declared on an earlier
/// line. This is a documented constraint of the description format, not a
/// sort performed here; a forward reference fails with
/// [`NetworkError::UnresolvedInput`].
pub struct NetworkBuilder<'a> {
    registry: &'a LayerRegistry,
}

impl<'a> NetworkBuilder<'a> {
    pub fn new(registry: &'a LayerRegistry) -> Self {
        Self { registry }
    }

    /// Wires the declared layers into a plan. `vocabulary_size` sizes the
    /// top-level inputs and the default softmax output.
    pub fn build(
        &self,
        description: &ArchitectureDescription,
        vocabulary_size: usize,
    ) -> Result<NetworkPlan, NetworkError> {
        let context = BuildContext { vocabulary_size };

        let mut resolved: HashMap<&str, NodeRef> = HashMap::new();
        let mut inputs = Vec::with_capacity(description.inputs.len());
        for declaration in &description.inputs {
            resolved.insert(&declaration.name, NodeRef::Input(inputs.len()));
            inputs.push(PlannedInput {
                name: declaration.name.clone(),
                size: vocabulary_size,
            });
        }

        let mut layers: Vec<PlannedLayer> = Vec::with_capacity(description.layers.len());
        let mut consumed = vec![false; description.layers.len()];
        let mut output_layer: Option<usize> = None;

        for declaration in &description.layers {
            let mut input_refs = Vec::with_capacity(declaration.inputs.len());
            let mut input_shapes = Vec::with_capacity(declaration.inputs.len());
            for input_name in &declaration.inputs {
                let node = *resolved.get(input_name.as_str()).ok_or_else(|| {
                    NetworkError::UnresolvedInput {
                        name: declaration.name.clone(),
                        input: input_name.clone(),
                    }
                })?;
                input_refs.push(node);
                input_shapes.push(match node {
                    NodeRef::Input(index) => Shape {
                        size: inputs[index].size,
                        sequence: true,
                    },
                    NodeRef::Layer(index) => {
                        consumed[index] = true;
                        layers[index].output
                    }
                });
            }

            let LayerPlan { spec, output } =
                self.registry
                    .build(declaration, &input_shapes, &context)?;
            check_input_kinds(declaration, &spec, &input_refs)?;

            if spec.is_output() {
                if let Some(previous) = output_layer {
                    return Err(NetworkError::DuplicateOutputLayer {
                        name: declaration.name.clone(),
                        previous: layers[previous].name.clone(),
                    });
                }
                output_layer = Some(layers.len());
            }

            debug!(
                layer = %declaration.name,
                layer_type = %declaration.layer_type,
                size = output.size,
                "planned layer"
            );
            resolved.insert(&declaration.name, NodeRef::Layer(layers.len()));
            layers.push(PlannedLayer {
                name: declaration.name.clone(),
                spec,
                inputs: input_refs,
                output,
            });
        }

        // The explicitly-typed output layer wins; otherwise the unique
        // layer without a consumer is the terminal node.
        let output = match output_layer {
            Some(index) => index,
            None => {
                let mut terminals = (0..layers.len()).filter(|&i| !consumed[i]);
                match (terminals.next(), terminals.next()) {
                    (Some(index), None) => index,
                    _ => return Err(NetworkError::MissingOutputLayer),
                }
            }
        };

        Ok(NetworkPlan {
            description: description.clone(),
            inputs,
            layers,
            output,
        })
    }
}

/// Projection layers read token ids, so their input must be a top-level
/// model input; every other layer consumes layer outputs.
fn check_input_kinds(
    declaration: &crate::architecture::LayerDeclaration,
    spec: &LayerSpec,
    input_refs: &[NodeRef],
) -> Result<(), NetworkError> {
    let wants_external = matches!(spec, LayerSpec::Projection { .. });
    for (node, input_name) in input_refs.iter().zip(&declaration.inputs) {
        let is_external = matches!(node, NodeRef::Input(_));
        if is_external != wants_external {
            let reason = if wants_external {
                format!("'{input_name}' is a layer; projection reads a model input")
            } else {
                format!("'{input_name}' is a model input; only projection layers read those")
            };
            return Err(NetworkError::InvalidLayerOptions {
                name: declaration.name.clone(),
                key: "input".to_string(),
                reason,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::parse_description;

    const VOCABULARY: usize = 50;

    fn build(text: &str) -> Result<NetworkPlan, NetworkError> {
        let description = parse_description(text)?;
        let registry = LayerRegistry::with_standard_layers();
        NetworkBuilder::new(&registry).build(&description, VOCABULARY)
    }

    #[test]
    fn test_simple_chain() {
        let plan = build(
            "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=8
layer type=softmax name=output input=projection
",
        )
        .expect("build should succeed");

        assert_eq!(plan.inputs().len(), 1);
        assert_eq!(plan.layers().len(), 2);
        assert_eq!(plan.output_index(), 1);
        assert_eq!(plan.layers()[1].output.size, VOCABULARY);
    }

    #[test]
    fn test_forward_reference_fails() {
        let result = build(
            "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=8
layer type=add name=merge input=projection input=later
layer type=glu name=later input=projection size=8
layer type=softmax name=output input=merge
",
        );
        assert!(matches!(
            result,
            Err(NetworkError::UnresolvedInput { name, input })
                if name == "merge" && input == "later"
        ));
    }

    #[test]
    fn test_duplicate_output_layer_fails() {
        let result = build(
            "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=8
layer type=softmax name=first input=projection
layer type=softmax name=second input=projection
",
        );
        assert!(matches!(
            result,
            Err(NetworkError::DuplicateOutputLayer { name, previous })
                if name == "second" && previous == "first"
        ));
    }

    #[test]
    fn test_terminal_layer_without_softmax() {
        let plan = build(
            "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=8
layer type=glu name=conv input=projection size=8
",
        )
        .expect("build should succeed");
        assert_eq!(plan.output_index(), 1);
        assert_eq!(plan.layers()[plan.output_index()].name, "conv");
    }

    #[test]
    fn test_ambiguous_terminal_fails() {
        let result = build(
            "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=8
layer type=glu name=conv_a input=projection size=8
layer type=glu name=conv_b input=projection size=8
",
        );
        assert!(matches!(result, Err(NetworkError::MissingOutputLayer)));
    }

    #[test]
    fn test_projection_must_read_model_input() {
        let result = build(
            "\
input type=class_ids name=word_input
layer type=projection name=first input=word_input size=8
layer type=projection name=second input=first size=8
layer type=softmax name=output input=second
",
        );
        assert!(matches!(
            result,
            Err(NetworkError::InvalidLayerOptions { name, .. }) if name == "second"
        ));
    }

    #[test]
    fn test_glu_must_not_read_model_input() {
        let result = build(
            "\
input type=class_ids name=word_input
layer type=glu name=conv input=word_input size=8
layer type=softmax name=output input=conv
",
        );
        assert!(matches!(
            result,
            Err(NetworkError::InvalidLayerOptions { name, .. }) if name == "conv"
        ));
    }

    #[test]
    fn test_oversized_softmax_is_rejected_at_build() {
        // A distribution wider than the vocabulary would let sampling draw
        // ids with no word behind them; the build must refuse it.
        let result = build(
            "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=8
layer type=softmax name=output input=projection size=75
",
        );
        assert!(matches!(
            result,
            Err(NetworkError::InvalidLayerOptions { name, key, .. })
                if name == "output" && key == "size"
        ));
    }

    #[test]
    fn test_residual_block_shapes() {
        let plan = build(
            "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=16
layer type=glu name=conv input=projection size=16 filter_size=3
layer type=dropout name=drop input=conv dropout_rate=0.2
layer type=add name=residual input=drop input=projection
layer type=softmax name=output input=residual
",
        )
        .expect("build should succeed");

        let residual = plan.layer("residual").unwrap();
        assert_eq!(residual.inputs.len(), 2);
        assert_eq!(residual.output.size, 16);
        assert_eq!(plan.layers()[plan.output_index()].name, "output");
    }

    #[test]
    fn test_no_node_reachable_from_itself() {
        let plan = build(
            "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=8
layer type=glu name=conv input=projection size=8
layer type=add name=residual input=conv input=projection
layer type=softmax name=output input=residual
",
        )
        .unwrap();

        // Every layer reference points strictly backwards, so following
        // inputs from any node can only decrease the index.
        for (index, layer) in plan.layers().iter().enumerate() {
            for node in &layer.inputs {
                if let NodeRef::Layer(input_index) = node {
                    assert!(*input_index < index);
                }
            }
        }
    }
}
