//! Inference: scoring text, sampling new text, and greedy decoding.

use burn::tensor::{backend::Backend, Int, Tensor};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::errors::NetworkError;
use crate::network::{ForwardMode, Network};
use crate::vocabulary::Vocabulary;

/// Log-probability a network assigns to a piece of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreReport {
    /// Total natural-log probability over all scored tokens.
    pub log_probability: f64,
    /// Number of tokens scored, sentence-end markers included.
    pub num_tokens: usize,
}

impl ScoreReport {
    /// Per-token perplexity.
    pub fn perplexity(&self) -> f64 {
        (-self.log_probability / self.num_tokens as f64).exp()
    }
}

/// Scores text one sentence per line. Each sentence is wrapped in
/// boundary markers, so the probability of ending the sentence is part of
/// the score.
pub fn score<B: Backend>(
    network: &Network<B>,
    vocabulary: &Vocabulary,
    text: &str,
    device: &B::Device,
) -> Result<ScoreReport, NetworkError> {
    let mut log_probability = 0.0;
    let mut num_tokens = 0;

    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        let ids = vocabulary.encode_sentence(line);
        let steps = ids.len() - 1;

        let inputs =
            Tensor::<B, 1, Int>::from_ints(&ids[..steps], device).reshape([1, steps]);
        let probabilities = network.forward_ids(inputs, ForwardMode::Inference)?;
        let values: Vec<f32> = probabilities.to_data().to_vec().unwrap();

        let vocabulary_size = network.output_size();
        for (step, &target) in ids[1..].iter().enumerate() {
            let p = values[step * vocabulary_size + target as usize].max(1e-8);
            log_probability += f64::from(p.ln());
        }
        num_tokens += steps;
        debug!(sentence = line, tokens = steps, "scored sentence");
    }

    Ok(ScoreReport {
        log_probability,
        num_tokens,
    })
}

/// Samples a sentence from the model, drawing each word from the predicted
/// distribution. Generation stops at the sentence-end marker or after
/// `length` words. The same seed always yields the same sentence.
pub fn sample<B: Backend>(
    network: &Network<B>,
    vocabulary: &Vocabulary,
    length: usize,
    seed: u64,
    device: &B::Device,
) -> Result<String, NetworkError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    generate(network, vocabulary, vec![vocabulary.start_id()], length, device, |row| {
        weighted_draw(row, rng.random::<f32>())
    })
}

/// Greedily decodes a continuation of `prefix`, always taking the most
/// probable next word. Stops at the sentence-end marker or after `length`
/// generated words.
pub fn decode<B: Backend>(
    network: &Network<B>,
    vocabulary: &Vocabulary,
    prefix: &str,
    length: usize,
    device: &B::Device,
) -> Result<String, NetworkError> {
    let mut ids = vec![vocabulary.start_id()];
    ids.extend(prefix.split_whitespace().map(|word| vocabulary.id(word)));
    generate(network, vocabulary, ids, length, device, argmax)
}

fn generate<B: Backend>(
    network: &Network<B>,
    vocabulary: &Vocabulary,
    mut ids: Vec<i32>,
    length: usize,
    device: &B::Device,
    mut pick: impl FnMut(&[f32]) -> usize,
) -> Result<String, NetworkError> {
    let end_id = vocabulary.end_id();

    for _ in 0..length {
        let inputs =
            Tensor::<B, 1, Int>::from_ints(ids.as_slice(), device).reshape([1, ids.len()]);
        let probabilities = network.forward_ids(inputs, ForwardMode::Inference)?;

        let [_, time, size] = probabilities.dims();
        let last_row: Vec<f32> = probabilities
            .slice([0..1, (time - 1)..time, 0..size])
            .to_data()
            .to_vec()
            .unwrap();

        let next = pick(&last_row) as i32;
        ids.push(next);
        if next == end_id {
            break;
        }
    }

    Ok(vocabulary.decode(&ids))
}

/// Inverse transform sampling over one probability row. `point` is a
/// uniform draw in [0, 1); rounding slack falls on the last word.
fn weighted_draw(row: &[f32], point: f32) -> usize {
    let mut cumulative = 0.0;
    for (index, &probability) in row.iter().enumerate() {
        cumulative += probability;
        if point < cumulative {
            return index;
        }
    }
    row.len() - 1
}

fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    for (index, &value) in row.iter().enumerate() {
        if value > row[best] {
            best = index;
        }
    }
    best
}
