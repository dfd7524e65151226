//! Dropout applied as a scaled multiplicative mask.

use burn::tensor::{backend::Backend, Distribution, Tensor};

/// Applies dropout to a tensor.
///
/// When `training` is true, each element is kept with probability
/// `1 - rate` and the survivors are scaled by `1 / (1 - rate)` so the
/// expected activation is unchanged. The mask is sampled fresh on every
/// call; with a fixed backend seed the masks are reproducible. When
/// `training` is false this is the identity.
pub fn dropout<B: Backend, const D: usize>(
    input: Tensor<B, D>,
    rate: f64,
    training: bool,
) -> Tensor<B, D> {
    if !training || rate == 0.0 {
        return input;
    }

    let keep_probability = 1.0 - rate;
    let mask = input.random_like(Distribution::Bernoulli(keep_probability));
    input * mask * (1.0 / keep_probability)
}
