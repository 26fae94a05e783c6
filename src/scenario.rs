//! Experiment scenarios: everything needed to build a [`Simulation`].
//!
//! Scenarios are plain JSON documents. Every field has a default, so a file
//! only needs the node positions and targets:
//!
//! ```json
//! { "nodes": [{"x": 120.0, "y": 40.0}, {"x": 180.0, "y": 65.0}], "targets": [1] }
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checkpoint::ExperimentLabel;
use crate::geometry::Position;
use crate::network::{MobileCharger, Network, NetworkError, NetworkParams, Node};
use crate::optimizer::{QLearning, QLearningConfig};
use crate::simulation::{Simulation, SimulationConfig};
use crate::NodeId;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read or write scenario: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Cannot pick {targets} targets among {nodes} nodes")]
    TooManyTargets { targets: usize, nodes: usize },
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

/// Mobile charger fleet settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargerSpec {
    pub count: usize,
    pub energy: f64,
    pub capacity: f64,
    pub e_move: f64,
    pub e_self_charge: f64,
    pub velocity: f64,
}

impl Default for ChargerSpec {
    fn default() -> Self {
        Self {
            count: 3,
            energy: 108_000.0,
            capacity: 108_000.0,
            e_move: 1.0,
            e_self_charge: 540.0,
            velocity: 5.0,
        }
    }
}

/// A complete experiment description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    // --- Sensors ---
    pub nodes: Vec<Position>,
    pub com_ran: f64,
    pub energy: f64,
    pub energy_max: f64,
    /// Request threshold as a fraction of `energy_max`.
    pub thresh_ratio: f64,
    /// Per-second transmission probability of every target.
    pub prob: f64,
    pub targets: Vec<NodeId>,

    // --- Chargers ---
    pub chargers: ChargerSpec,

    // --- Subsystems ---
    pub network: NetworkParams,
    pub optimizer: QLearningConfig,
    pub simulation: SimulationConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            com_ran: 80.0,
            energy: 10.8,
            energy_max: 10.8,
            thresh_ratio: 0.4,
            prob: 0.6,
            targets: Vec::new(),
            chargers: ChargerSpec::default(),
            network: NetworkParams::default(),
            optimizer: QLearningConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Random deployment over a 1000 × 1000 field around the default base.
    ///
    /// # Errors
    ///
    /// [`ScenarioError::TooManyTargets`] when `targets > nodes`.
    pub fn random(nodes: usize, targets: usize, chargers: usize, seed: u64) -> Result<Self> {
        if targets > nodes {
            return Err(ScenarioError::TooManyTargets { targets, nodes });
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let positions = (0..nodes)
            .map(|_| {
                let x = rng.gen_range(0.0..1000.0);
                let y = rng.gen_range(0.0..1000.0);
                Position::new(x, y).truncated()
            })
            .collect();
        let mut target_ids = index::sample(&mut rng, nodes, targets).into_vec();
        target_ids.sort_unstable();

        Ok(Self {
            nodes: positions,
            targets: target_ids,
            chargers: ChargerSpec {
                count: chargers,
                ..ChargerSpec::default()
            },
            ..Self::default()
        })
    }

    pub fn build_network(&self) -> Result<Network> {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(id, &location)| {
                Node::new(
                    id,
                    location,
                    self.com_ran,
                    self.energy_max,
                    self.thresh_ratio * self.energy_max,
                    self.prob,
                )
                .with_energy(self.energy)
                .with_checkpoint_len(self.simulation.checkpoint_len)
            })
            .collect();
        let fleet = &self.chargers;
        let chargers = (0..fleet.count)
            .map(|id| {
                MobileCharger::new(
                    id,
                    self.network.depot,
                    fleet.energy,
                    fleet.capacity,
                    fleet.e_move,
                    fleet.e_self_charge,
                    fleet.velocity,
                )
            })
            .collect();
        Ok(Network::new(
            nodes,
            chargers,
            self.targets.clone(),
            self.network.clone(),
        )?)
    }

    /// Builds repetition `nb_run` of this scenario, seeded with `seed`.
    pub fn build_simulation(
        &self,
        label: ExperimentLabel,
        nb_run: usize,
        seed: u64,
    ) -> Result<Simulation> {
        let config = SimulationConfig {
            seed,
            ..self.simulation.clone()
        };
        Ok(Simulation::new(
            self.build_network()?,
            QLearning::new(self.optimizer.clone()),
            config,
            label,
            nb_run,
        ))
    }
}
