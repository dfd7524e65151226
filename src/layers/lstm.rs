//! Long short-term memory recurrent layer.

use burn::{
    module::Module,
    nn::{Lstm, LstmConfig},
    tensor::{backend::Backend, Tensor},
};

/// Configuration for an LSTM layer.
#[derive(Debug, Clone)]
pub struct LstmLayerConfig {
    /// Number of input features per time step.
    pub input_size: usize,
    /// Number of output features (the hidden state size).
    pub size: usize,
}

impl LstmLayerConfig {
    pub fn new(input_size: usize, size: usize) -> Self {
        Self { input_size, size }
    }

    /// Initializes the LSTM layer on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmLayer<B> {
        LstmLayer {
            lstm: LstmConfig::new(self.input_size, self.size, true).init(device),
            size: self.size,
        }
    }
}

/// Recurrent layer scanning the sequence left to right.
///
/// Hidden and cell state start at zero for every batch; state never leaks
/// across forward calls, so evaluation stays deterministic.
#[derive(Module, Debug)]
pub struct LstmLayer<B: Backend> {
    lstm: Lstm<B>,
    size: usize,
}

impl<B: Backend> LstmLayer<B> {
    /// Forward pass over a `[batch, time, features]` tensor, producing the
    /// `[batch, time, size]` hidden state sequence.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        let (output, _state) = self.lstm.forward(input, None);
        output
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
