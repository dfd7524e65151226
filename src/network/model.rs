//! The runnable network: parameter storage and forward evaluation.

use std::collections::HashMap;

use burn::{
    module::{Ignored, Module},
    tensor::{backend::Backend, Int, Tensor},
};

use crate::errors::NetworkError;
use crate::layers::{
    dropout, Glu, GluConfig, LstmLayer, LstmLayerConfig, Projection, ProjectionConfig,
    SoftmaxConfig, SoftmaxOutput,
};
use crate::network::builder::{NetworkPlan, NodeRef};
use crate::network::registry::LayerSpec;

/// Whether a forward pass samples dropout masks or runs as the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    Training,
    Inference,
}

/// One execution step. Steps are stored in dependency order, so each step
/// only reads slots written by earlier steps or by the input batch.
#[derive(Debug, Clone)]
enum Step {
    Projection {
        layer: usize,
        input: usize,
        output: usize,
    },
    Glu {
        layer: usize,
        input: usize,
        output: usize,
    },
    Lstm {
        layer: usize,
        input: usize,
        output: usize,
    },
    Dropout {
        rate: f64,
        input: usize,
        output: usize,
    },
    Add {
        first: usize,
        second: usize,
        output: usize,
    },
    Softmax {
        layer: usize,
        input: usize,
        output: usize,
    },
}

/// Non-tensor structure of the network, kept out of the module record.
#[derive(Debug, Clone)]
struct Topology {
    input_names: Vec<String>,
    layer_names: Vec<String>,
    output: usize,
    output_size: usize,
}

/// A fully instantiated network.
///
/// Owns every parameter tensor for its lifetime; parameters change only
/// through optimizer steps during training. The graph itself is static
/// once built.
#[derive(Module, Debug)]
pub struct Network<B: Backend> {
    projections: Vec<Projection<B>>,
    glus: Vec<Glu<B>>,
    lstms: Vec<LstmLayer<B>>,
    outputs: Vec<SoftmaxOutput<B>>,
    steps: Ignored<Vec<Step>>,
    topology: Ignored<Topology>,
}

impl<B: Backend> Network<B> {
    /// Instantiates the plan on a device, allocating all parameters.
    pub(crate) fn from_plan(plan: &NetworkPlan, device: &B::Device) -> Self {
        let mut projections = Vec::new();
        let mut glus = Vec::new();
        let mut lstms = Vec::new();
        let mut outputs = Vec::new();
        let mut steps = Vec::with_capacity(plan.layers().len());

        for (node, layer) in plan.layers().iter().enumerate() {
            match &layer.spec {
                LayerSpec::Projection {
                    vocabulary_size,
                    size,
                } => {
                    let NodeRef::Input(input) = layer.inputs[0] else {
                        unreachable!("builder wires projections to model inputs");
                    };
                    steps.push(Step::Projection {
                        layer: projections.len(),
                        input,
                        output: node,
                    });
                    projections.push(ProjectionConfig::new(*vocabulary_size, *size).init(device));
                }
                LayerSpec::Glu {
                    input_size,
                    size,
                    filter_size,
                } => {
                    steps.push(Step::Glu {
                        layer: glus.len(),
                        input: layer_slot(layer.inputs[0]),
                        output: node,
                    });
                    glus.push(GluConfig::new(*input_size, *size, *filter_size).init(device));
                }
                LayerSpec::Lstm { input_size, size } => {
                    steps.push(Step::Lstm {
                        layer: lstms.len(),
                        input: layer_slot(layer.inputs[0]),
                        output: node,
                    });
                    lstms.push(LstmLayerConfig::new(*input_size, *size).init(device));
                }
                LayerSpec::Dropout { rate } => {
                    steps.push(Step::Dropout {
                        rate: *rate,
                        input: layer_slot(layer.inputs[0]),
                        output: node,
                    });
                }
                LayerSpec::Add => {
                    steps.push(Step::Add {
                        first: layer_slot(layer.inputs[0]),
                        second: layer_slot(layer.inputs[1]),
                        output: node,
                    });
                }
                LayerSpec::Softmax { input_size, size } => {
                    steps.push(Step::Softmax {
                        layer: outputs.len(),
                        input: layer_slot(layer.inputs[0]),
                        output: node,
                    });
                    outputs.push(SoftmaxConfig::new(*input_size, *size).init(device));
                }
            }
        }

        let topology = Topology {
            input_names: plan.inputs().iter().map(|i| i.name.clone()).collect(),
            layer_names: plan.layers().iter().map(|l| l.name.clone()).collect(),
            output: plan.output_index(),
            output_size: plan.layers()[plan.output_index()].output.size,
        };

        Self {
            projections,
            glus,
            lstms,
            outputs,
            steps: Ignored(steps),
            topology: Ignored(topology),
        }
    }

    /// Runs the network over a batch of `[batch, time]` id tensors, one per
    /// declared model input. Returns the `[batch, time, output_size]`
    /// output of the designated output layer.
    ///
    /// Nodes are evaluated in dependency order. In
    /// [`ForwardMode::Training`], dropout masks are sampled fresh on every
    /// call; results are reproducible under a fixed `B::seed`.
    pub fn forward(
        &self,
        inputs: &HashMap<String, Tensor<B, 2, Int>>,
        mode: ForwardMode,
    ) -> Result<Tensor<B, 3>, NetworkError> {
        let training = mode == ForwardMode::Training;
        let mut slots: Vec<Option<Tensor<B, 3>>> = vec![None; self.topology.layer_names.len()];

        for step in self.steps.iter() {
            match step {
                Step::Projection {
                    layer,
                    input,
                    output,
                } => {
                    let name = &self.topology.input_names[*input];
                    let ids = inputs
                        .get(name)
                        .ok_or_else(|| NetworkError::MissingInput { name: name.clone() })?;
                    slots[*output] = Some(self.projections[*layer].forward(ids.clone()));
                }
                Step::Glu {
                    layer,
                    input,
                    output,
                } => {
                    let value = slots[*input].clone().unwrap();
                    slots[*output] = Some(self.glus[*layer].forward(value));
                }
                Step::Lstm {
                    layer,
                    input,
                    output,
                } => {
                    let value = slots[*input].clone().unwrap();
                    slots[*output] = Some(self.lstms[*layer].forward(value));
                }
                Step::Dropout {
                    rate,
                    input,
                    output,
                } => {
                    let value = slots[*input].clone().unwrap();
                    slots[*output] = Some(dropout(value, *rate, training));
                }
                Step::Add {
                    first,
                    second,
                    output,
                } => {
                    let lhs = slots[*first].clone().unwrap();
                    let rhs = slots[*second].clone().unwrap();
                    slots[*output] = Some(lhs + rhs);
                }
                Step::Softmax {
                    layer,
                    input,
                    output,
                } => {
                    let value = slots[*input].clone().unwrap();
                    slots[*output] = Some(self.outputs[*layer].forward(value));
                }
            }
        }

        Ok(slots[self.topology.output].take().unwrap())
    }

    /// Convenience for the common single-input case: feeds `ids` to the
    /// first declared model input.
    pub fn forward_ids(
        &self,
        ids: Tensor<B, 2, Int>,
        mode: ForwardMode,
    ) -> Result<Tensor<B, 3>, NetworkError> {
        let name = self.topology.input_names[0].clone();
        let mut inputs = HashMap::new();
        inputs.insert(name, ids);
        self.forward(&inputs, mode)
    }

    /// Names of the declared model inputs, in declaration order.
    pub fn input_names(&self) -> &[String] {
        &self.topology.input_names
    }

    /// Number of layer nodes in the network.
    pub fn num_layers(&self) -> usize {
        self.topology.layer_names.len()
    }

    /// Size of the output layer (the vocabulary, for softmax outputs).
    pub fn output_size(&self) -> usize {
        self.topology.output_size
    }
}

fn layer_slot(node: NodeRef) -> usize {
    match node {
        NodeRef::Layer(index) => index,
        NodeRef::Input(_) => unreachable!("builder rejects model inputs on non-projection layers"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::parse_description;
    use crate::network::{LayerRegistry, NetworkBuilder, NetworkPlan};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    const VOCABULARY: usize = 20;

    fn residual_plan() -> NetworkPlan {
        let description = parse_description(
            "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=8
layer type=glu name=conv input=projection size=8 filter_size=3
layer type=dropout name=drop input=conv dropout_rate=0.3
layer type=add name=residual input=drop input=projection
layer type=softmax name=output input=residual
",
        )
        .unwrap();
        let registry = LayerRegistry::with_standard_layers();
        NetworkBuilder::new(&registry)
            .build(&description, VOCABULARY)
            .unwrap()
    }

    fn ids(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_ints([[1, 2, 3, 4, 5], [6, 7, 8, 9, 10]], device)
    }

    #[test]
    fn test_forward_output_shape() {
        let device = Default::default();
        let network: Network<TestBackend> = residual_plan().init(&device);

        let output = network
            .forward_ids(ids(&device), ForwardMode::Inference)
            .unwrap();

        assert_eq!(output.dims(), [2, 5, VOCABULARY]);
        assert_eq!(network.num_layers(), 5);
        assert_eq!(network.output_size(), VOCABULARY);
    }

    #[test]
    fn test_output_rows_are_distributions() {
        let device = Default::default();
        let network: Network<TestBackend> = residual_plan().init(&device);

        let output = network
            .forward_ids(ids(&device), ForwardMode::Inference)
            .unwrap();
        let values: Vec<f32> = output.to_data().to_vec().unwrap();

        for row in values.chunks(VOCABULARY) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_recurrent_chain_forward() {
        let device = Default::default();
        let description = parse_description(
            "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=8
layer type=lstm name=recurrent input=projection size=6
layer type=softmax name=output input=recurrent
",
        )
        .unwrap();
        let registry = LayerRegistry::with_standard_layers();
        let network: Network<TestBackend> = NetworkBuilder::new(&registry)
            .build(&description, VOCABULARY)
            .unwrap()
            .init(&device);

        let output = network
            .forward_ids(ids(&device), ForwardMode::Inference)
            .unwrap();
        assert_eq!(output.dims(), [2, 5, VOCABULARY]);

        let values: Vec<f32> = output.to_data().to_vec().unwrap();
        for row in values.chunks(VOCABULARY) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_inference_forward_is_deterministic() {
        let device = Default::default();
        let network: Network<TestBackend> = residual_plan().init(&device);

        let first: Vec<f32> = network
            .forward_ids(ids(&device), ForwardMode::Inference)
            .unwrap()
            .to_data()
            .to_vec()
            .unwrap();
        let second: Vec<f32> = network
            .forward_ids(ids(&device), ForwardMode::Inference)
            .unwrap()
            .to_data()
            .to_vec()
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_training_dropout_varies_with_seed() {
        let device = Default::default();
        let network: Network<TestBackend> = residual_plan().init(&device);

        <TestBackend as Backend>::seed(1);
        let first: Vec<f32> = network
            .forward_ids(ids(&device), ForwardMode::Training)
            .unwrap()
            .to_data()
            .to_vec()
            .unwrap();
        <TestBackend as Backend>::seed(2);
        let second: Vec<f32> = network
            .forward_ids(ids(&device), ForwardMode::Training)
            .unwrap()
            .to_data()
            .to_vec()
            .unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_missing_input_is_reported() {
        let device = Default::default();
        let network: Network<TestBackend> = residual_plan().init(&device);

        let result = network.forward(&HashMap::new(), ForwardMode::Inference);
        assert!(matches!(
            result,
            Err(NetworkError::MissingInput { name }) if name == "word_input"
        ));
    }
}
