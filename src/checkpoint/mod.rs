//! Persistence of full simulation state for crash/resume.
//!
//! A [`Checkpoint`] captures everything needed to continue a run exactly where
//! it stopped: the network (nodes with their energy history, chargers with
//! their plans), the optimizer (waypoints, Q-table, pending requests), the
//! clock and the recorded death time.

pub mod error;

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

pub use error::CheckpointError;

use crate::network::Network;
use crate::optimizer::QLearning;
use crate::simulation::SimulationConfig;
use crate::RunId;

/// Experiment family and index a run belongs to, e.g. `node` / `2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentLabel {
    pub kind: String,
    pub index: usize,
}

impl ExperimentLabel {
    pub fn new(kind: impl Into<String>, index: usize) -> Self {
        Self {
            kind: kind.into(),
            index,
        }
    }
}

impl Default for ExperimentLabel {
    fn default() -> Self {
        Self::new("default", 0)
    }
}

impl fmt::Display for ExperimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.index)
    }
}

/// Full mutable state of a run.
#[derive(Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: RunId,
    pub label: ExperimentLabel,
    /// Repetition index within the experiment.
    pub nb_run: usize,
    /// Last completed simulated second.
    pub time: u64,
    pub dead_time: Option<u64>,
    /// Loop parameters, including the RNG seed.
    pub config: SimulationConfig,
    pub network: Network,
    pub optimizer: QLearning,
}

/// Where a saved checkpoint can be found again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CheckpointHandle {
    File(PathBuf),
    Memory(String),
}

impl fmt::Display for CheckpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointHandle::File(path) => write!(f, "{}", path.display()),
            CheckpointHandle::Memory(key) => write!(f, "memory:{}", key),
        }
    }
}

/// Backend persisting checkpoints.
///
/// Saving the same experiment label again overwrites the previous checkpoint.
pub trait CheckpointStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> error::Result<CheckpointHandle>;

    fn load(&self, handle: &CheckpointHandle) -> error::Result<Checkpoint>;
}

/// One pretty-printed JSON file per experiment label inside `dir`.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the checkpoint of `label`.
    pub fn path_for(&self, label: &ExperimentLabel) -> PathBuf {
        self.dir.join(format!("checkpoint_{}.json", label))
    }

    /// Reads a checkpoint file directly.
    pub fn read(path: &Path) -> error::Result<Checkpoint> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CheckpointError::NotFound(path.display().to_string()),
            _ => CheckpointError::Io(e),
        })?;
        let checkpoint: Checkpoint = serde_json::from_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            run = %checkpoint.run_id,
            time = checkpoint.time,
            "checkpoint loaded"
        );
        Ok(checkpoint)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> error::Result<CheckpointHandle> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&checkpoint.label);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, checkpoint)?;
        writer.flush()?;
        info!(
            path = %path.display(),
            run = %checkpoint.run_id,
            time = checkpoint.time,
            "checkpoint saved"
        );
        Ok(CheckpointHandle::File(path))
    }

    fn load(&self, handle: &CheckpointHandle) -> error::Result<Checkpoint> {
        match handle {
            CheckpointHandle::File(path) => Self::read(path),
            CheckpointHandle::Memory(key) => Err(CheckpointError::NotFound(key.clone())),
        }
    }
}

/// Keeps serialized checkpoints in memory, keyed by experiment label.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    entries: HashMap<String, String>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> error::Result<CheckpointHandle> {
        let key = checkpoint.label.to_string();
        self.entries
            .insert(key.clone(), serde_json::to_string(checkpoint)?);
        Ok(CheckpointHandle::Memory(key))
    }

    fn load(&self, handle: &CheckpointHandle) -> error::Result<Checkpoint> {
        let key = match handle {
            CheckpointHandle::Memory(key) => key,
            CheckpointHandle::File(path) => {
                return Err(CheckpointError::NotFound(path.display().to_string()))
            }
        };
        let json = self
            .entries
            .get(key)
            .ok_or_else(|| CheckpointError::NotFound(key.clone()))?;
        Ok(serde_json::from_str(json)?)
    }
}
