//! Time-stepped simulation loop.
//!
//! # Module Structure
//!
//! - [`config`] - Horizon, logging and checkpoint intervals, seed
//! - [`log`] - JSON-lines information log
//!
//! # Loop
//!
//! Each iteration first writes a [`Snapshot`] every `snapshot_interval`
//! seconds and saves a [`Checkpoint`] every `checkpoint_interval` seconds,
//! both describing the state after the last completed second. It then
//! advances the clock by one second and, in order:
//!
//! 1. at `activation_time`, partitions the action space and activates the
//!    chargers;
//! 2. runs one second of network activity;
//! 3. records the death time the first time a target loses its path to the
//!    base, and logs a [`LifeEvent`] whenever the dead-node or
//!    monitored-target count changes.
//!
//! The loop stops at network death or once `max_time` is reached.

pub mod config;
pub mod error;
pub mod log;

use std::io::Write;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

pub use config::SimulationConfig;
pub use error::SimulationError;
pub use log::{ChargerSnapshot, InformationLog, LifeEvent, LogRecord, Snapshot};

use crate::checkpoint::{Checkpoint, CheckpointStore, ExperimentLabel};
use crate::network::Network;
use crate::optimizer::QLearning;
use crate::units::{seconds, Seconds};
use crate::RunId;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationOutcome {
    pub run_id: RunId,
    pub nb_run: usize,
    /// Second at which the first target lost its path to the base.
    pub death_time: Option<u64>,
    /// Last simulated second.
    pub end_time: u64,
    /// Death time, or the full horizon when the network survived.
    pub lifetime: Seconds,
    pub dead_nodes: usize,
}

/// One simulation run: the network, its optimizer and the clock.
#[derive(Debug)]
pub struct Simulation {
    pub run_id: RunId,
    pub label: ExperimentLabel,
    pub nb_run: usize,
    pub config: SimulationConfig,
    pub network: Network,
    pub optimizer: QLearning,
    time: u64,
    dead_time: Option<u64>,
    rng: StdRng,
}

impl Simulation {
    /// Starts a fresh run at second 0.
    pub fn new(
        network: Network,
        optimizer: QLearning,
        config: SimulationConfig,
        label: ExperimentLabel,
        nb_run: usize,
    ) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            run_id: crate::generate_run_id(),
            label,
            nb_run,
            config,
            network,
            optimizer,
            time: 0,
            dead_time: None,
            rng,
        }
    }

    /// Continues a run from a checkpoint.
    ///
    /// The RNG is reseeded from the seed and the checkpoint time, so a resumed
    /// run is reproducible but does not replay the original random stream.
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        let rng = StdRng::seed_from_u64(checkpoint.config.seed.wrapping_add(checkpoint.time));
        info!(
            run = %checkpoint.run_id,
            label = %checkpoint.label,
            nb_run = checkpoint.nb_run,
            time = checkpoint.time,
            "resuming run"
        );
        Self {
            run_id: checkpoint.run_id,
            label: checkpoint.label,
            nb_run: checkpoint.nb_run,
            config: checkpoint.config,
            network: checkpoint.network,
            optimizer: checkpoint.optimizer,
            time: checkpoint.time,
            dead_time: checkpoint.dead_time,
            rng,
        }
    }

    /// Last completed simulated second.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn dead_time(&self) -> Option<u64> {
        self.dead_time
    }

    /// Full run state, as persisted by the checkpoint store.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            run_id: self.run_id,
            label: self.label.clone(),
            nb_run: self.nb_run,
            time: self.time,
            dead_time: self.dead_time,
            config: self.config.clone(),
            network: self.network.clone(),
            optimizer: self.optimizer.clone(),
        }
    }

    /// Runs until network death or the time horizon.
    ///
    /// # Errors
    ///
    /// Optimizer failures, checkpoint persistence failures and log write
    /// failures are fatal to the run.
    pub fn run<W: Write>(
        &mut self,
        log: &mut InformationLog<W>,
        store: &mut dyn CheckpointStore,
    ) -> error::Result<SimulationOutcome> {
        let nb_targets = self.network.targets.len();
        let mut monitored = self.network.count_package();
        let mut dead_nodes = self.network.count_dead_node();
        if monitored < nb_targets {
            self.record_death(self.time);
        }

        let started = self.time;
        while self.time < self.config.max_time && monitored == nb_targets {
            let now = self.time;
            if (now == 0 || now > started) && now % self.config.snapshot_interval.max(1) == 0 {
                let snapshot = Snapshot::capture(&self.network, now, monitored);
                info!(
                    t = now,
                    dead_nodes = snapshot.dead_nodes,
                    monitored = snapshot.monitored_targets,
                    min_energy = snapshot.min_energy,
                    average_energy = snapshot.average_energy,
                    "snapshot"
                );
                log.write(&LogRecord::Snapshot(snapshot))?;
            }
            let interval = self.config.checkpoint_interval;
            if interval > 0 && now > started && now % interval == 0 {
                store.save(&self.checkpoint())?;
            }

            self.time += 1;
            let t = self.time;

            if t == self.config.activation_time {
                self.optimizer.net_partition(&mut self.network, t)?;
                self.network.active = true;
                info!(t, waypoints = self.optimizer.waypoints().len(), "chargers activated");
            }

            self.network
                .run_per_second(t, &mut self.optimizer, self.config.refresh_window, &mut self.rng)?;

            let now_monitored = self.network.count_package();
            let now_dead = self.network.count_dead_node();
            if now_monitored < nb_targets {
                self.record_death(t);
            }
            if now_monitored != monitored || now_dead != dead_nodes {
                log.write(&LogRecord::LifeEvent(LifeEvent {
                    time: t,
                    dead_nodes: now_dead,
                    monitored_targets: now_monitored,
                }))?;
            }
            monitored = now_monitored;
            dead_nodes = now_dead;
        }
        log.flush()?;

        let outcome = self.outcome();
        info!(
            run = %outcome.run_id,
            nb_run = outcome.nb_run,
            lifetime = outcome.lifetime.value(),
            dead_nodes = outcome.dead_nodes,
            "run finished"
        );
        Ok(outcome)
    }

    fn record_death(&mut self, t: u64) {
        if self.network.package_lost {
            return;
        }
        self.network.package_lost = true;
        self.dead_time = Some(t);
        info!(
            t,
            dead_nodes = self.network.count_dead_node(),
            "network lost a target"
        );
    }

    pub fn outcome(&self) -> SimulationOutcome {
        SimulationOutcome {
            run_id: self.run_id,
            nb_run: self.nb_run,
            death_time: self.dead_time,
            end_time: self.time,
            lifetime: seconds(self.dead_time.unwrap_or(self.time) as f64),
            dead_nodes: self.network.count_dead_node(),
        }
    }
}
