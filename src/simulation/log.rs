//! JSON-lines information log.
//!
//! One record per line, tagged by `kind`:
//!
//! ```text
//! {"kind":"snapshot","time":101,"dead_nodes":0,"monitored_targets":5,...}
//! {"kind":"life_event","time":4312,"dead_nodes":1,"monitored_targets":5}
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::network::{ChargerStatus, Network};

/// Charger state at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargerSnapshot {
    pub id: usize,
    pub status: ChargerStatus,
    pub location: Position,
    pub energy: f64,
}

/// Periodic summary of the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: u64,
    pub dead_nodes: usize,
    pub monitored_targets: usize,
    pub min_energy: f64,
    pub min_location: Position,
    pub average_energy: f64,
    pub chargers: Vec<ChargerSnapshot>,
}

impl Snapshot {
    pub fn capture(network: &Network, time: u64, monitored_targets: usize) -> Self {
        let min = &network.nodes[network.find_min_node()];
        Self {
            time,
            dead_nodes: network.count_dead_node(),
            monitored_targets,
            min_energy: min.energy,
            min_location: min.location,
            average_energy: network.average_energy(),
            chargers: network
                .chargers
                .iter()
                .map(|mc| ChargerSnapshot {
                    id: mc.id,
                    status: mc.status(),
                    location: mc.current,
                    energy: mc.energy,
                })
                .collect(),
        }
    }
}

/// Change in the dead-node or monitored-target count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeEvent {
    pub time: u64,
    pub dead_nodes: usize,
    pub monitored_targets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogRecord {
    Snapshot(Snapshot),
    LifeEvent(LifeEvent),
}

/// Append-only record writer.
#[derive(Debug)]
pub struct InformationLog<W: Write> {
    writer: W,
    records: usize,
}

impl InformationLog<BufWriter<File>> {
    /// Creates (or truncates) a log file.
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl InformationLog<io::Sink> {
    /// A log that discards everything.
    pub fn sink() -> Self {
        Self::new(io::sink())
    }
}

impl<W: Write> InformationLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, records: 0 }
    }

    /// Number of records written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_tagged_json_lines() {
        let mut log = InformationLog::new(Vec::new());
        log.write(&LogRecord::LifeEvent(LifeEvent {
            time: 7,
            dead_nodes: 1,
            monitored_targets: 3,
        }))
        .unwrap();
        log.write(&LogRecord::LifeEvent(LifeEvent {
            time: 9,
            dead_nodes: 2,
            monitored_targets: 2,
        }))
        .unwrap();
        assert_eq!(log.records(), 2);

        let text = String::from_utf8(log.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"kind":"life_event","time":7,"dead_nodes":1,"monitored_targets":3}"#
        );
        let parsed: LogRecord = serde_json::from_str(lines[1]).unwrap();
        assert!(matches!(parsed, LogRecord::LifeEvent(LifeEvent { time: 9, .. })));
    }
}
