//! Projection (embedding lookup) layer.

use burn::{
    module::Module,
    nn::{Embedding, EmbeddingConfig},
    tensor::{backend::Backend, Int, Tensor},
};

/// Configuration for a projection layer.
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    /// Number of distinct input ids (the vocabulary size).
    pub vocabulary_size: usize,
    /// Dimensionality of the projected vectors.
    pub size: usize,
}

impl ProjectionConfig {
    pub fn new(vocabulary_size: usize, size: usize) -> Self {
        Self {
            vocabulary_size,
            size,
        }
    }

    /// Initializes the projection layer on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Projection<B> {
        Projection {
            embedding: EmbeddingConfig::new(self.vocabulary_size, self.size).init(device),
            size: self.size,
        }
    }
}

/// Maps a batch of token id sequences to sequences of dense vectors.
///
/// This is the entry point of every network: it is the only layer that
/// consumes a top-level model input directly.
#[derive(Module, Debug)]
pub struct Projection<B: Backend> {
    embedding: Embedding<B>,
    size: usize,
}

impl<B: Backend> Projection<B> {
    /// Looks up the projection vectors for a `[batch, time]` id tensor,
    /// producing a `[batch, time, size]` tensor.
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.embedding.forward(ids)
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
    fn test_projection_forward_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let projection: Projection<TestBackend> = ProjectionConfig::new(10, 4).init(&device);

        let ids = Tensor::<TestBackend, 2, Int>::from_ints([[0, 1, 2], [3, 4, 5]], &device);
        let output = projection.forward(ids);

        assert_eq!(output.dims(), [2, 3, 4]);
    }
}
