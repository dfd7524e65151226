//! Training loop implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use burn::{
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion, Int, Tensor},
};
use tracing::info;

use super::{cross_entropy, TrainingConfig};
use crate::checkpoint::Checkpointer;
use crate::errors::NetworkError;
use crate::network::{ForwardMode, Network};

/// Cooperative stop flag checked between batches. When raised, the trainer
/// finishes the current batch, writes a final checkpoint, and returns.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Training result containing the trained network and metrics.
#[derive(Debug)]
pub struct TrainingResult<B: AutodiffBackend> {
    /// The trained network.
    pub network: Network<B>,
    /// Mean loss per completed epoch.
    pub loss_history: Vec<f32>,
    /// Whether the run ended early on a stop request.
    pub stopped: bool,
}

/// Trains a network on a flat token stream using the Adam optimizer.
///
/// The stream is cut into non-overlapping windows of
/// `sequence_length + 1` tokens; within each window the first
/// `sequence_length` tokens are the input and the tokens shifted by one are
/// the targets. A checkpoint is written after every epoch and after a stop
/// request.
pub fn train<B: AutodiffBackend>(
    network: Network<B>,
    tokens: &[i32],
    config: &TrainingConfig,
    device: &B::Device,
    stop: &StopHandle,
    checkpointer: Option<&Checkpointer>,
) -> Result<TrainingResult<B>, NetworkError> {
    let windows = sequence_windows(tokens, config.sequence_length);
    if windows.is_empty() {
        return Err(NetworkError::EmptyCorpus {
            minimum_tokens: config.sequence_length + 1,
        });
    }

    let mut optimizer = AdamConfig::new().init();
    let mut current = network;
    let mut loss_history = Vec::with_capacity(config.epochs);
    let mut stopped = false;

    'epochs: for epoch in 0..config.epochs {
        let mut epoch_loss = 0.0;
        let mut num_batches = 0;

        for (batch_index, batch) in windows.chunks(config.batch_size).enumerate() {
            let (inputs, targets) = batch_tensors::<B>(batch, config.sequence_length, device);

            let predictions = current.forward_ids(inputs, ForwardMode::Training)?;
            let loss = cross_entropy(predictions, targets);
            let loss_value: f32 = loss.clone().into_scalar().elem();
            if !loss_value.is_finite() {
                return Err(NetworkError::NumericalInstability {
                    value: loss_value,
                    epoch,
                    batch: batch_index,
                });
            }
            epoch_loss += loss_value;
            num_batches += 1;

            let grads = loss.backward();
            let grads_params = GradientsParams::from_grads(grads, &current);
            current = optimizer.step(config.learning_rate, current, grads_params);

            if stop.stop_requested() {
                stopped = true;
                loss_history.push(epoch_loss / num_batches as f32);
                info!(epoch = epoch + 1, batch = batch_index + 1, "stop requested");
                break 'epochs;
            }
        }

        let mean_loss = epoch_loss / num_batches as f32;
        loss_history.push(mean_loss);
        info!(
            epoch = epoch + 1,
            epochs = config.epochs,
            loss = mean_loss,
            "epoch finished"
        );

        if let Some(checkpointer) = checkpointer {
            checkpointer.save(&current)?;
        }
    }

    if stopped {
        if let Some(checkpointer) = checkpointer {
            checkpointer.save(&current)?;
        }
    }

    Ok(TrainingResult {
        network: current,
        loss_history,
        stopped,
    })
}

/// Cuts the token stream into non-overlapping windows of
/// `sequence_length + 1` tokens. A trailing remainder shorter than a full
/// window is dropped.
fn sequence_windows(tokens: &[i32], sequence_length: usize) -> Vec<&[i32]> {
    tokens
        .chunks_exact(sequence_length + 1)
        .collect()
}

fn batch_tensors<B: AutodiffBackend>(
    batch: &[&[i32]],
    sequence_length: usize,
    device: &B::Device,
) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
    let mut inputs = Vec::with_capacity(batch.len() * sequence_length);
    let mut targets = Vec::with_capacity(batch.len() * sequence_length);
    for window in batch {
        inputs.extend_from_slice(&window[..sequence_length]);
        targets.extend_from_slice(&window[1..]);
    }
    let shape = [batch.len(), sequence_length];
    (
        Tensor::<B, 1, Int>::from_ints(inputs.as_slice(), device).reshape(shape),
        Tensor::<B, 1, Int>::from_ints(targets.as_slice(), device).reshape(shape),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::parse_description;
    use crate::network::{LayerRegistry, NetworkBuilder};
    use crate::vocabulary::Vocabulary;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::backend::Backend;

    type TestBackend = Autodiff<NdArray>;

    const ARCHITECTURE: &str = "\
input type=class_ids name=word_input
layer type=projection name=projection input=word_input size=8
layer type=glu name=conv input=projection size=8 filter_size=2
layer type=softmax name=output input=conv
";

    fn build_network(
        vocabulary: &Vocabulary,
        device: &<TestBackend as Backend>::Device,
    ) -> Network<TestBackend> {
        let description = parse_description(ARCHITECTURE).unwrap();
        let registry = LayerRegistry::with_standard_layers();
        NetworkBuilder::new(&registry)
            .build(&description, vocabulary.len())
            .unwrap()
            .init(device)
    }

    #[test]
    fn test_training_reduces_loss() {
        let device = Default::default();
        <TestBackend as Backend>::seed(7);

        let text = "the cat sat on the mat\nthe dog sat on the rug\n";
        let vocabulary = Vocabulary::from_text(text);
        let tokens: Vec<i32> = vocabulary
            .encode_corpus(text)
            .repeat(8);

        let network = build_network(&vocabulary, &device);
        let config = TrainingConfig::new()
            .epochs(8)
            .learning_rate(0.05)
            .batch_size(4)
            .sequence_length(5);

        let result = train(network, &tokens, &config, &device, &StopHandle::new(), None)
            .expect("training should succeed");

        let initial = *result.loss_history.first().unwrap();
        let last = *result.loss_history.last().unwrap();
        assert!(
            last < initial,
            "loss should decrease: initial={initial}, final={last}"
        );
        assert!(!result.stopped);
    }

    #[test]
    fn test_stop_request_ends_run_early() {
        let device = Default::default();
        let text = "a b c d e f g h\n";
        let vocabulary = Vocabulary::from_text(text);
        let tokens: Vec<i32> = vocabulary.encode_corpus(text).repeat(4);

        let network = build_network(&vocabulary, &device);
        let config = TrainingConfig::new()
            .epochs(100)
            .batch_size(2)
            .sequence_length(4);

        let stop = StopHandle::new();
        stop.request_stop();
        let result = train(network, &tokens, &config, &device, &stop, None)
            .expect("training should succeed");

        assert!(result.stopped);
        assert_eq!(result.loss_history.len(), 1);
    }

    #[test]
    fn test_short_corpus_is_rejected() {
        let device = Default::default();
        let vocabulary = Vocabulary::from_text("a b");
        let network = build_network(&vocabulary, &device);
        let config = TrainingConfig::new().sequence_length(32);

        let result = train(
            network,
            &[0, 1, 2],
            &config,
            &device,
            &StopHandle::new(),
            None,
        );
        assert!(matches!(
            result,
            Err(NetworkError::EmptyCorpus { minimum_tokens: 33 })
        ));
    }

    #[test]
    fn test_sequence_windows_drop_remainder() {
        let tokens: Vec<i32> = (0..10).collect();
        let windows = sequence_windows(&tokens, 3);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0], &[0, 1, 2, 3]);
        assert_eq!(windows[1], &[4, 5, 6, 7]);
    }
}
