//! Training configuration.

/// Configuration for one training run.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of passes over the training corpus.
    pub epochs: usize,
    /// Learning rate for the optimizer.
    pub learning_rate: f64,
    /// Number of sequences per optimizer step.
    pub batch_size: usize,
    /// Length of each training sequence, in tokens.
    pub sequence_length: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            learning_rate: 0.001,
            batch_size: 16,
            sequence_length: 32,
        }
    }
}

impl TrainingConfig {
    /// Creates a new TrainingConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of epochs.
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Sets the learning rate.
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the training sequence length.
    pub fn sequence_length(mut self, length: usize) -> Self {
        self.sequence_length = length;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 10);
        assert!((config.learning_rate - 0.001).abs() < 1e-10);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.sequence_length, 32);
    }

    #[test]
    fn test_builder_methods() {
        let config = TrainingConfig::new()
            .epochs(3)
            .learning_rate(0.01)
            .batch_size(4)
            .sequence_length(8);
        assert_eq!(config.epochs, 3);
        assert!((config.learning_rate - 0.01).abs() < 1e-10);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.sequence_length, 8);
    }
}
