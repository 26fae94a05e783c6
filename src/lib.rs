//! wrsn_qcharge - Q-learning mobile charging for wireless rechargeable sensor networks
//!
//! A time-stepped simulator of a sensor network whose nodes relay data to a
//! base station, together with a Q-learning optimizer that decides where each
//! mobile charger travels next and how long it charges there.

pub mod checkpoint;
pub mod geometry;
pub mod network;
pub mod optimizer;
pub mod report;
pub mod scenario;
pub mod simulation;
pub mod units;

pub use geometry::Position;
pub use network::{MobileCharger, Network, Node};
pub use optimizer::{Decision, QLearning, QLearningConfig};
pub use simulation::{Simulation, SimulationConfig, SimulationOutcome};

// Re-export unit conversion traits for ergonomic use
pub use units::{convert, SameDim, Seconds};

/// Index of a sensor node inside [`Network::nodes`].
pub type NodeId = usize;

/// Identifier attached to a simulation run and carried through checkpoints.
pub type RunId = uuid::Uuid;

/// Generates a new unique run identifier (UUID v4).
pub fn generate_run_id() -> RunId {
    uuid::Uuid::new_v4()
}
