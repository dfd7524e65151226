//! Gated linear unit convolution layer.

use burn::{
    module::Module,
    nn::conv::{Conv1d, Conv1dConfig},
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};

/// Configuration for a GLU convolution layer.
#[derive(Debug, Clone)]
pub struct GluConfig {
    /// Number of input features per time step.
    pub input_size: usize,
    /// Number of output features per time step.
    pub size: usize,
    /// Width of the convolution window over the sequence dimension.
    pub filter_size: usize,
}

impl GluConfig {
    pub fn new(input_size: usize, size: usize, filter_size: usize) -> Self {
        Self {
            input_size,
            size,
            filter_size,
        }
    }

    /// Initializes the GLU layer on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Glu<B> {
        Glu {
            linear: Conv1dConfig::new(self.input_size, self.size, self.filter_size).init(device),
            gate: Conv1dConfig::new(self.input_size, self.size, self.filter_size).init(device),
            filter_size: self.filter_size,
            size: self.size,
        }
    }
}

/// Gated linear unit over a causal convolution window.
///
/// Computes two convolutions of the input and uses one, passed through a
/// sigmoid, to gate the other elementwise: `conv_a(x) * sigmoid(conv_b(x))`.
/// The input is zero-padded on the left by `filter_size - 1` time steps so
/// that the output sequence length equals the input sequence length and no
/// position sees future time steps.
#[derive(Module, Debug)]
pub struct Glu<B: Backend> {
    linear: Conv1d<B>,
    gate: Conv1d<B>,
    filter_size: usize,
    size: usize,
}

impl<B: Backend> Glu<B> {
    /// Forward pass over a `[batch, time, features]` tensor.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, _time, features] = input.dims();
        let device = input.device();

        // Conv1d expects [batch, channels, time].
        let mut x = input.swap_dims(1, 2);
        if self.filter_size > 1 {
            let padding = Tensor::zeros([batch, features, self.filter_size - 1], &device);
            x = Tensor::cat(vec![padding, x], 2);
        }

        let value = self.linear.forward(x.clone());
        let gate = sigmoid(self.gate.forward(x));

        (value * gate).swap_dims(1, 2)
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
