//! Experiment results: one row per run, then a summary across runs.
//!
//! Results are written as JSON lines next to the information logs:
//!
//! ```json
//! {"kind":"run","nb_run":0,"lifetime":81234.0,"dead_nodes":3}
//! {"kind":"summary","runs":3,"mean":80111.3,"std_error":912.4,"ci95":3925.8}
//! ```

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

use crate::simulation::SimulationOutcome;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write results: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize results: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid confidence interval parameters: {0}")]
    Distribution(#[from] statrs::StatsError),
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// Lifetime of one repetition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub nb_run: usize,
    /// Seconds until the first target lost its path, or the horizon.
    pub lifetime: f64,
    pub dead_nodes: usize,
}

impl From<&SimulationOutcome> for RunResult {
    fn from(outcome: &SimulationOutcome) -> Self {
        Self {
            nb_run: outcome.nb_run,
            lifetime: outcome.lifetime.value(),
            dead_nodes: outcome.dead_nodes,
        }
    }
}

/// Mean lifetime across runs with its 95% confidence half-width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub runs: usize,
    pub mean: f64,
    /// Standard error of the mean.
    pub std_error: f64,
    /// `std_error · t(0.975, runs − 1)`; absent with fewer than two runs.
    pub ci95: Option<f64>,
}

impl Summary {
    /// Summarizes the lifetimes of a set of runs.
    ///
    /// # Errors
    ///
    /// [`ReportError::Distribution`] if the Student-t distribution cannot be
    /// built for the sample size.
    pub fn of(lifetimes: &[f64]) -> Result<Self> {
        let runs = lifetimes.len();
        if runs == 0 {
            return Ok(Self {
                runs,
                mean: 0.0,
                std_error: 0.0,
                ci95: None,
            });
        }
        let n = runs as f64;
        let mean = lifetimes.iter().sum::<f64>() / n;
        if runs < 2 {
            return Ok(Self {
                runs,
                mean,
                std_error: 0.0,
                ci95: None,
            });
        }

        let variance = lifetimes.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_error = (variance / n).sqrt();
        let quantile = StudentsT::new(0.0, 1.0, n - 1.0)?.inverse_cdf(0.975);
        Ok(Self {
            runs,
            mean,
            std_error,
            ci95: Some(std_error * quantile),
        })
    }
}

/// A line of the results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultRecord {
    Run(RunResult),
    Summary(Summary),
}

/// JSON-lines writer for [`ResultRecord`]s.
#[derive(Debug)]
pub struct ResultsFile<W: Write> {
    writer: W,
}

impl<W: Write> ResultsFile<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Appends one run and flushes, so finished runs survive a crash.
    pub fn record_run(&mut self, outcome: &SimulationOutcome) -> Result<()> {
        self.write(&ResultRecord::Run(RunResult::from(outcome)))
    }

    /// Appends the summary of `lifetimes` and returns it.
    pub fn record_summary(&mut self, lifetimes: &[f64]) -> Result<Summary> {
        let summary = Summary::of(lifetimes)?;
        self.write(&ResultRecord::Summary(summary))?;
        Ok(summary)
    }

    fn write(&mut self, record: &ResultRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::seconds;

    fn outcome(nb_run: usize, lifetime: f64) -> SimulationOutcome {
        SimulationOutcome {
            run_id: crate::generate_run_id(),
            nb_run,
            death_time: Some(lifetime as u64),
            end_time: lifetime as u64,
            lifetime: seconds(lifetime),
            dead_nodes: 2,
        }
    }

    #[test]
    fn summary_has_student_t_interval() {
        let s = Summary::of(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(s.runs, 3);
        assert!((s.mean - 20.0).abs() < 1e-12);
        let sem = (100.0f64 / 3.0).sqrt();
        assert!((s.std_error - sem).abs() < 1e-12);
        // t(0.975, 2) = 4.302653
        assert!((s.ci95.unwrap() - sem * 4.302_653).abs() < 1e-3);
    }

    #[test]
    fn single_run_has_no_interval() {
        let s = Summary::of(&[5.0]).unwrap();
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.std_error, 0.0);
        assert_eq!(s.ci95, None);
        assert_eq!(Summary::of(&[]).unwrap().runs, 0);
    }

    #[test]
    fn results_file_lists_runs_then_summary() {
        let mut file = ResultsFile::new(Vec::new());
        file.record_run(&outcome(0, 100.0)).unwrap();
        file.record_run(&outcome(1, 300.0)).unwrap();
        let summary = file.record_summary(&[100.0, 300.0]).unwrap();
        assert_eq!(summary.mean, 200.0);

        let text = String::from_utf8(file.into_inner()).unwrap();
        let records: Vec<ResultRecord> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[1],
            ResultRecord::Run(RunResult {
                nb_run: 1,
                lifetime: 300.0,
                dead_nodes: 2,
            })
        );
        assert_eq!(records[2], ResultRecord::Summary(summary));
        assert!(text.starts_with(r#"{"kind":"run","nb_run":0"#));
    }
}
