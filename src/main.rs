use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::tensor::backend::Backend as _;
use clap::{Parser, Subcommand};

use burnlm::checkpoint::{self, Checkpointer};
use burnlm::inference;
use burnlm::prelude::*;
use burnlm::{Backend, TrainingBackend};

#[derive(Parser)]
#[command(name = "burnlm", version, about = "Neural language models from declarative architecture descriptions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trains a model and writes its state to a checkpoint.
    Train {
        /// Architecture description file.
        #[arg(long)]
        architecture: PathBuf,
        /// Training corpus, one sentence per line.
        #[arg(long)]
        data: PathBuf,
        /// Checkpoint base path (`<base>.mpk` / `<base>.json`).
        #[arg(long)]
        state: PathBuf,
        #[arg(long, default_value_t = 10)]
        epochs: usize,
        #[arg(long, default_value_t = 0.001)]
        learning_rate: f64,
        #[arg(long, default_value_t = 16)]
        batch_size: usize,
        #[arg(long, default_value_t = 32)]
        sequence_length: usize,
        /// Seed for parameter initialization and dropout.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Scores text with a trained model and reports perplexity.
    Score {
        #[arg(long)]
        architecture: PathBuf,
        #[arg(long)]
        state: PathBuf,
        /// Text to score, one sentence per line.
        #[arg(long)]
        data: PathBuf,
    },
    /// Greedily decodes the most probable continuation of a prefix.
    Decode {
        #[arg(long)]
        architecture: PathBuf,
        #[arg(long)]
        state: PathBuf,
        /// Words the continuation starts from.
        #[arg(long)]
        prefix: String,
        /// Maximum number of generated words.
        #[arg(long, default_value_t = 20)]
        length: usize,
    },
    /// Samples sentences from a trained model.
    Sample {
        #[arg(long)]
        architecture: PathBuf,
        #[arg(long)]
        state: PathBuf,
        /// Maximum number of generated words per sentence.
        #[arg(long, default_value_t = 20)]
        length: usize,
        /// Number of sentences to generate.
        #[arg(long, default_value_t = 1)]
        sentences: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Prints the toolkit version.
    Version,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("burnlm=info".parse().expect("static directive parses")),
        )
        .init();

    if let Err(error) = run(Cli::parse()) {
        eprintln!("error: {error:#}");
        std::process::exit(2);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Train {
            architecture,
            data,
            state,
            epochs,
            learning_rate,
            batch_size,
            sequence_length,
            seed,
        } => {
            let description = read_description(&architecture)?;
            let text = read_text(&data)?;
            let vocabulary = Vocabulary::from_text(&text);
            let tokens = vocabulary.encode_corpus(&text);

            if let Some(seed) = seed {
                TrainingBackend::seed(seed);
            }

            let device = Default::default();
            let registry = LayerRegistry::with_standard_layers();
            let network: Network<TrainingBackend> = NetworkBuilder::new(&registry)
                .build(&description, vocabulary.len())?
                .init(&device);

            let config = TrainingConfig::new()
                .epochs(epochs)
                .learning_rate(learning_rate)
                .batch_size(batch_size)
                .sequence_length(sequence_length);
            let checkpointer = Checkpointer::new(&state, description, vocabulary);

            // No signal wiring here: the stop flag stays lowered and
            // Ctrl-C terminates with the platform default.
            let result = train(
                network,
                &tokens,
                &config,
                &device,
                &StopHandle::new(),
                Some(&checkpointer),
            )?;

            if let Some(loss) = result.loss_history.last() {
                println!("final loss: {loss:.6}");
            }
            println!("state written to {}", state.display());
        }
        Command::Score {
            architecture,
            state,
            data,
        } => {
            let description = read_description(&architecture)?;
            let registry = LayerRegistry::with_standard_layers();
            let device = Default::default();
            let (network, _, vocabulary) =
                checkpoint::load::<Backend>(&description, &registry, &state, &device)?;

            let text = read_text(&data)?;
            let report = inference::score(&network, &vocabulary, &text, &device)?;

            println!("tokens: {}", report.num_tokens);
            println!("log probability: {:.4}", report.log_probability);
            println!("perplexity: {:.4}", report.perplexity());
        }
        Command::Decode {
            architecture,
            state,
            prefix,
            length,
        } => {
            let description = read_description(&architecture)?;
            let registry = LayerRegistry::with_standard_layers();
            let device = Default::default();
            let (network, _, vocabulary) =
                checkpoint::load::<Backend>(&description, &registry, &state, &device)?;

            let sentence = inference::decode(&network, &vocabulary, &prefix, length, &device)?;
            println!("{sentence}");
        }
        Command::Sample {
            architecture,
            state,
            length,
            sentences,
            seed,
        } => {
            let description = read_description(&architecture)?;
            let registry = LayerRegistry::with_standard_layers();
            let device = Default::default();
            let (network, _, vocabulary) =
                checkpoint::load::<Backend>(&description, &registry, &state, &device)?;

            for index in 0..sentences {
                let sentence = inference::sample(
                    &network,
                    &vocabulary,
                    length,
                    seed.wrapping_add(index as u64),
                    &device,
                )?;
                println!("{sentence}");
            }
        }
        Command::Version => {
            println!("burnlm {}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}

fn read_description(path: &Path) -> Result<ArchitectureDescription> {
    let text = read_text(path)?;
    Ok(parse_description(&text)?)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("could not read '{}'", path.display()))
}
