//! Softmax output layer.

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{activation::softmax, backend::Backend, Tensor},
};

/// Configuration for the softmax output layer.
#[derive(Debug, Clone)]
pub struct SoftmaxConfig {
    /// Size of the incoming hidden representation.
    pub input_size: usize,
    /// Number of output classes (the vocabulary size).
    pub size: usize,
}

impl SoftmaxConfig {
    pub fn new(input_size: usize, size: usize) -> Self {
        Self { input_size, size }
    }

    /// Initializes the output layer on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> SoftmaxOutput<B> {
        SoftmaxOutput {
            linear: LinearConfig::new(self.input_size, self.size).init(device),
            size: self.size,
        }
    }
}

/// Terminal layer of every network: projects the final hidden
/// representation to the vocabulary and normalizes it into a probability
/// distribution per time step.
#[derive(Module, Debug)]
pub struct SoftmaxOutput<B: Backend> {
    linear: Linear<B>,
    size: usize,
}

impl<B: Backend> SoftmaxOutput<B> {
    /// Forward pass over a `[batch, time, features]` tensor, producing
    /// `[batch, time, size]` probabilities that sum to one over the last
    /// dimension.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        softmax(self.linear.forward(input), 2)
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_softmax_output_is_distribution() {
        let device = <TestBackend as Backend>::Device::default();
        let layer: SoftmaxOutput<TestBackend> = SoftmaxConfig::new(4, 7).init(&device);

        let input = Tensor::<TestBackend, 3>::from_floats(
            [[[1.0, -1.0, 0.5, 2.0], [0.0, 0.0, 0.0, 0.0]]],
            &device,
        );
        let output = layer.forward(input);
        assert_eq!(output.dims(), [1, 2, 7]);

        let values: Vec<f32> = output.to_data().to_vec().unwrap();
        for row in values.chunks(7) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "distribution sums to {sum}");
            assert!(row.iter().all(|p| *p >= 0.0));
        }
    }
}
