//! Checkpoints: persisted network parameters plus the metadata needed to
//! verify that a saved state matches the architecture it is loaded into.
//!
//! A checkpoint is two files next to each other: `<base>.mpk` with the
//! parameter record and `<base>.json` with the toolkit version, the parsed
//! architecture description, and the vocabulary. Both are written to
//! temporary files and renamed into place, so a checkpoint is never left
//! half-written.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::architecture::ArchitectureDescription;
use crate::errors::NetworkError;
use crate::network::{LayerRegistry, Network, NetworkBuilder, NetworkPlan};
use crate::vocabulary::Vocabulary;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Metadata {
    version: String,
    description: ArchitectureDescription,
    vocabulary: Vocabulary,
}

/// Writes checkpoints for one training run.
pub struct Checkpointer {
    base: PathBuf,
    metadata: Metadata,
}

impl Checkpointer {
    /// Creates a checkpointer writing to `<base>.mpk` / `<base>.json`.
    /// `base` must not carry an extension of its own; the recorder derives
    /// the `.mpk` path from it.
    pub fn new(
        base: impl Into<PathBuf>,
        description: ArchitectureDescription,
        vocabulary: Vocabulary,
    ) -> Self {
        Self {
            base: base.into(),
            metadata: Metadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                description,
                vocabulary,
            },
        }
    }

    /// Atomically persists the network parameters and metadata.
    pub fn save<B: Backend>(&self, network: &Network<B>) -> Result<(), NetworkError> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        // The recorder swaps the path's extension for `.mpk`, so the
        // temporary stem must stay dot-free or the record lands on the
        // final path before the rename.
        let temp_base = with_suffix(&self.base, "_tmp");
        network.clone().save_file(&temp_base, &recorder)?;
        fs::rename(
            with_suffix(&temp_base, ".mpk"),
            with_suffix(&self.base, ".mpk"),
        )?;

        let metadata_temp = with_suffix(&self.base, ".json.tmp");
        fs::write(&metadata_temp, serde_json::to_string_pretty(&self.metadata)?)?;
        fs::rename(metadata_temp, with_suffix(&self.base, ".json"))?;

        info!(path = %self.base.display(), "checkpoint written");
        Ok(())
    }
}

/// Loads a checkpoint written for the given architecture description.
///
/// Fails with [`NetworkError::IncompatibleState`] when the persisted
/// metadata describes a different graph or the parameter record cannot be
/// read back into the rebuilt network.
pub fn load<B: Backend>(
    expected: &ArchitectureDescription,
    registry: &LayerRegistry,
    base: &Path,
    device: &B::Device,
) -> Result<(Network<B>, NetworkPlan, Vocabulary), NetworkError> {
    let metadata_path = with_suffix(base, ".json");
    let metadata: Metadata = serde_json::from_str(&fs::read_to_string(&metadata_path)?)?;

    if metadata.description != *expected {
        return Err(NetworkError::IncompatibleState {
            reason: format!(
                "the state at '{}' was built from a different architecture description",
                base.display()
            ),
        });
    }

    let plan =
        NetworkBuilder::new(registry).build(&metadata.description, metadata.vocabulary.len())?;
    let network = plan.init::<B>(device);

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let network = network
        .load_file(base.to_path_buf(), &recorder, device)
        .map_err(|error| NetworkError::IncompatibleState {
            reason: format!("could not load parameters from '{}': {error}", base.display()),
        })?;

    Ok((network, plan, metadata.vocabulary))
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(base.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}
