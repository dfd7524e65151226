//! Loss computation.

use burn::tensor::{backend::Backend, Int, Tensor};

/// Mean negative log-likelihood of the target ids under the predicted
/// distributions.
///
/// `probabilities` is the `[batch, time, vocabulary]` output of the network
/// (already normalized); `targets` holds the `[batch, time]` ids of the
/// words that actually follow. Probabilities are clamped away from zero
/// before the log.
pub fn cross_entropy<B: Backend>(
    probabilities: Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
) -> Tensor<B, 1> {
    let [batch, time, _] = probabilities.dims();
    let log_probabilities = probabilities.clamp_min(1e-8).log();
    log_probabilities
        .gather(2, targets.reshape([batch, time, 1]))
        .mean()
        .neg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_perfect_prediction_has_near_zero_loss() {
        let device = Default::default();
        let probabilities = Tensor::<TestBackend, 3>::from_floats(
            [[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]],
            &device,
        );
        let targets = Tensor::<TestBackend, 2, Int>::from_ints([[0, 1]], &device);

        let loss: f32 = cross_entropy(probabilities, targets).into_scalar();
        assert!(loss.abs() < 1e-4, "loss = {loss}");
    }

    #[test]
    fn test_uniform_prediction_loss_is_log_vocabulary() {
        let device = Default::default();
        let probabilities = Tensor::<TestBackend, 3>::from_floats(
            [[[0.25, 0.25, 0.25, 0.25], [0.25, 0.25, 0.25, 0.25]]],
            &device,
        );
        let targets = Tensor::<TestBackend, 2, Int>::from_ints([[3, 0]], &device);

        let loss: f32 = cross_entropy(probabilities, targets).into_scalar();
        assert!((loss - 4.0_f32.ln()).abs() < 1e-4, "loss = {loss}");
    }

    #[test]
    fn test_zero_probability_stays_finite() {
        let device = Default::default();
        let probabilities =
            Tensor::<TestBackend, 3>::from_floats([[[0.0, 1.0]]], &device);
        let targets = Tensor::<TestBackend, 2, Int>::from_ints([[0]], &device);

        let loss: f32 = cross_entropy(probabilities, targets).into_scalar();
        assert!(loss.is_finite());
    }
}
