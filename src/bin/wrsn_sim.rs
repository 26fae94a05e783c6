//! Experiment driver for the Q-learning charging simulator.

use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qtty::{Hour, Quantity};
use tracing_subscriber::EnvFilter;

use wrsn_qcharge::checkpoint::{ExperimentLabel, FileCheckpointStore};
use wrsn_qcharge::report::ResultsFile;
use wrsn_qcharge::scenario::Scenario;
use wrsn_qcharge::simulation::{InformationLog, Simulation, SimulationOutcome};
use wrsn_qcharge::units::{convert, seconds};

#[derive(Parser)]
#[command(name = "wrsn-sim")]
#[command(
    about = "Simulate mobile charging of a wireless rechargeable sensor network",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario from scratch
    Start {
        /// Scenario JSON file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of independent repetitions (run i is seeded with i)
        #[arg(short, long, default_value = "3")]
        runs: usize,

        /// Experiment family used to name logs and checkpoints
        #[arg(long, default_value = "default")]
        label: String,

        /// Experiment index within the family
        #[arg(long, default_value = "0")]
        index: usize,

        #[arg(long, default_value = "checkpoint")]
        checkpoint_dir: PathBuf,

        #[arg(long, default_value = "log")]
        log_dir: PathBuf,
    },

    /// Continue a run from its last checkpoint
    Resume {
        /// Checkpoint JSON file
        #[arg(short, long)]
        checkpoint: PathBuf,

        #[arg(long, default_value = "log")]
        log_dir: PathBuf,
    },

    /// Write a random scenario
    Generate {
        #[arg(long, default_value = "1000")]
        nodes: usize,

        #[arg(long, default_value = "600")]
        targets: usize,

        #[arg(long, default_value = "3")]
        chargers: usize,

        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Start {
            scenario,
            runs,
            label,
            index,
            checkpoint_dir,
            log_dir,
        } => start(&scenario, runs, ExperimentLabel::new(label, index), checkpoint_dir, &log_dir),
        Commands::Resume { checkpoint, log_dir } => resume(&checkpoint, &log_dir),
        Commands::Generate {
            nodes,
            targets,
            chargers,
            seed,
            out,
        } => {
            let scenario = Scenario::random(nodes, targets, chargers, seed)?;
            scenario
                .save(&out)
                .with_context(|| format!("writing scenario to {}", out.display()))?;
            println!(
                "Scenario with {} nodes and {} targets written to {}",
                nodes,
                targets,
                out.display()
            );
            Ok(())
        }
    }
}

fn start(
    scenario_path: &Path,
    runs: usize,
    label: ExperimentLabel,
    checkpoint_dir: PathBuf,
    log_dir: &Path,
) -> Result<()> {
    let scenario = Scenario::load(scenario_path)
        .with_context(|| format!("loading scenario {}", scenario_path.display()))?;
    let mut store = FileCheckpointStore::new(checkpoint_dir);
    fs::create_dir_all(log_dir)?;

    println!(
        "Experiment {}: {} sensors, {} targets, {} chargers, {} waypoints",
        label,
        scenario.nodes.len(),
        scenario.targets.len(),
        scenario.chargers.count,
        scenario.optimizer.nb_action
    );

    let results_path = log_dir.join(format!("results_{}.jsonl", label));
    let mut results = ResultsFile::new(open_log(&results_path, true)?);

    let mut lifetimes = Vec::with_capacity(runs);
    for nb_run in 0..runs {
        let mut sim = scenario.build_simulation(label.clone(), nb_run, nb_run as u64)?;
        let outcome = run_logged(&mut sim, log_dir, &mut store, true)?;
        report(&outcome);
        results.record_run(&outcome)?;
        lifetimes.push(outcome.lifetime.value());
    }

    let summary = results.record_summary(&lifetimes)?;
    let hours: Quantity<Hour> = convert(seconds(summary.mean));
    match summary.ci95 {
        Some(ci) => println!(
            "Mean lifetime: {:.1} ± {:.1} s (95% CI, {:.2} h) over {} runs",
            summary.mean,
            ci,
            hours.value(),
            summary.runs
        ),
        None => println!(
            "Mean lifetime: {:.1} s ({:.2} h) over {} runs",
            summary.mean,
            hours.value(),
            summary.runs
        ),
    }
    println!("Results written to {}", results_path.display());
    Ok(())
}

fn resume(checkpoint_path: &Path, log_dir: &Path) -> Result<()> {
    let checkpoint = FileCheckpointStore::read(checkpoint_path)
        .with_context(|| format!("loading checkpoint {}", checkpoint_path.display()))?;
    let dir = checkpoint_path.parent().unwrap_or_else(|| Path::new("."));
    let mut store = FileCheckpointStore::new(dir);
    fs::create_dir_all(log_dir)?;

    let mut sim = Simulation::from_checkpoint(checkpoint);
    println!("Resuming {} run {} at {} s", sim.label, sim.nb_run, sim.time());
    let outcome = run_logged(&mut sim, log_dir, &mut store, false)?;
    report(&outcome);
    Ok(())
}

/// Runs `sim`, writing its records to the per-run information log.
fn run_logged(
    sim: &mut Simulation,
    log_dir: &Path,
    store: &mut FileCheckpointStore,
    fresh: bool,
) -> Result<SimulationOutcome> {
    let name = format!("q_learning_kmeans_{}_{}.jsonl", sim.label, sim.nb_run);
    let file = open_log(&log_dir.join(name), fresh)?;
    let mut log = InformationLog::new(BufWriter::new(file));
    Ok(sim.run(&mut log, store)?)
}

/// Opens a log file, emptying it for a fresh run or appending for a resumed one.
fn open_log(path: &Path, fresh: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if fresh {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    options
        .open(path)
        .with_context(|| format!("opening log {}", path.display()))
}

fn report(outcome: &SimulationOutcome) {
    match outcome.death_time {
        Some(t) => println!(
            "Run {}: network lost a target at {} s ({} dead nodes)",
            outcome.nb_run, t, outcome.dead_nodes
        ),
        None => println!(
            "Run {}: network survived until {} s ({} dead nodes)",
            outcome.nb_run, outcome.end_time, outcome.dead_nodes
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_log_is_truncated_resumed_log_appended() {
        use std::io::Write;

        let path = std::env::temp_dir().join(format!("wrsn-log-{}.jsonl", std::process::id()));
        writeln!(open_log(&path, true).unwrap(), "stale").unwrap();
        writeln!(open_log(&path, true).unwrap(), "first").unwrap();
        writeln!(open_log(&path, false).unwrap(), "resumed").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nresumed\n");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn cli_parses_start() {
        let args = ["wrsn-sim", "start", "--scenario", "s.json", "--runs", "2"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Commands::Start { runs: 2, .. }));
    }
}
