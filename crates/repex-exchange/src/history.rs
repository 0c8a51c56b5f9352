//! Append-only record of every exchange decision and parameter trajectory.
//!
//! Two tables per axis, pre-sized to `(ensemble, cycles)` at creation: the
//! id table holds the partner each replica exchanged with at a cycle (or the
//! no-exchange marker), the parameter table holds the value each replica
//! carried after the cycle's decision. A cycle column is written exactly
//! once; the filled tables are the durable output of the run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use repex_core::errors::ErrorInfo;
use repex_core::{Axis, Replica, RepexError};
use serde::{Deserialize, Serialize};

/// Marker stored in the id table when a replica did not exchange.
pub const NO_EXCHANGE: i64 = -1;

/// Per-axis pair of history tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisHistory {
    ids: Vec<i64>,
    parameters: Vec<f64>,
    recorded: Vec<bool>,
}

impl AxisHistory {
    fn new(size: usize, cycles: usize) -> Self {
        Self {
            ids: vec![NO_EXCHANGE; size * cycles],
            parameters: vec![0.0; size * cycles],
            recorded: vec![false; cycles],
        }
    }
}

/// Exchange history for a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeHistory {
    size: usize,
    cycles: usize,
    axes: BTreeMap<Axis, AxisHistory>,
}

impl ExchangeHistory {
    /// Creates empty tables for `size` replicas over `cycles` cycles on the
    /// given axes.
    pub fn new(size: usize, cycles: usize, axes: &[Axis]) -> Self {
        let axes = axes
            .iter()
            .map(|&axis| (axis, AxisHistory::new(size, cycles)))
            .collect();
        Self { size, cycles, axes }
    }

    /// Ensemble size the tables were created for.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Cycle count the tables were created for.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Records one cycle's outcome on an axis: for every replica the partner
    /// it exchanged with (`None` meaning no exchange) and the axis value it
    /// holds after the decision. Rewriting an already recorded cycle is an
    /// error; the tables are append-only.
    pub fn record(
        &mut self,
        axis: Axis,
        cycle: usize,
        replicas: &[Replica],
        partners: &[Option<usize>],
    ) -> Result<(), RepexError> {
        if cycle >= self.cycles {
            return Err(RepexError::History(
                ErrorInfo::new("cycle-out-of-range", "cycle index exceeds history capacity")
                    .with_context("cycle", cycle.to_string())
                    .with_context("capacity", self.cycles.to_string()),
            ));
        }
        if replicas.len() != self.size || partners.len() != self.size {
            return Err(RepexError::History(
                ErrorInfo::new("size-mismatch", "ensemble size does not match history tables")
                    .with_context("expected", self.size.to_string())
                    .with_context("found", replicas.len().to_string()),
            ));
        }
        let table = self.axes.get_mut(&axis).ok_or_else(|| {
            RepexError::History(
                ErrorInfo::new("axis-unknown", "axis was not declared at history creation")
                    .with_context("axis", axis.as_str()),
            )
        })?;
        if table.recorded[cycle] {
            return Err(RepexError::History(
                ErrorInfo::new("cycle-rewrite", "cycle column already recorded")
                    .with_context("axis", axis.as_str())
                    .with_context("cycle", cycle.to_string()),
            ));
        }

        for replica in replicas {
            let row = replica.id().as_raw();
            let cell = row * self.cycles + cycle;
            table.ids[cell] = match partners[row] {
                Some(partner) => partner as i64,
                None => NO_EXCHANGE,
            };
            table.parameters[cell] = replica.parameter(axis).unwrap_or(f64::NAN);
        }
        table.recorded[cycle] = true;
        Ok(())
    }

    /// Partner id recorded for a replica at a cycle, or the no-exchange
    /// marker.
    pub fn partner_of(&self, axis: Axis, replica: usize, cycle: usize) -> Option<i64> {
        self.axes
            .get(&axis)
            .map(|table| table.ids[replica * self.cycles + cycle])
    }

    /// Axis value recorded for a replica at a cycle.
    pub fn parameter_of(&self, axis: Axis, replica: usize, cycle: usize) -> Option<f64> {
        self.axes
            .get(&axis)
            .map(|table| table.parameters[replica * self.cycles + cycle])
    }

    /// Number of cycle columns recorded so far on an axis.
    pub fn recorded_cycles(&self, axis: Axis) -> usize {
        self.axes
            .get(&axis)
            .map(|table| table.recorded.iter().filter(|&&r| r).count())
            .unwrap_or(0)
    }

    /// Axes the history tracks.
    pub fn axes(&self) -> Vec<Axis> {
        self.axes.keys().copied().collect()
    }

    /// Full parameter trajectory of one replica on an axis.
    pub fn trajectory(&self, axis: Axis, replica: usize) -> Option<&[f64]> {
        self.axes
            .get(&axis)
            .map(|table| &table.parameters[replica * self.cycles..(replica + 1) * self.cycles])
    }

    /// Writes the history to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), RepexError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                RepexError::Serde(
                    ErrorInfo::new("history-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            RepexError::Serde(ErrorInfo::new("history-serialize", err.to_string()))
        })?;
        fs::write(path, json).map_err(|err| {
            RepexError::Serde(
                ErrorInfo::new("history-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Loads a history from a JSON file.
    pub fn load(path: &Path) -> Result<Self, RepexError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            RepexError::Serde(
                ErrorInfo::new("history-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            RepexError::Serde(
                ErrorInfo::new("history-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repex_core::ReplicaId;

    fn ensemble() -> Vec<Replica> {
        (0..3)
            .map(|i| Replica::new(ReplicaId::from_raw(i), 300.0 + 10.0 * i as f64))
            .collect()
    }

    #[test]
    fn record_fills_one_cycle_column() {
        let replicas = ensemble();
        let mut history = ExchangeHistory::new(3, 4, &[Axis::Temperature]);
        history
            .record(Axis::Temperature, 0, &replicas, &[Some(1), Some(0), None])
            .unwrap();
        assert_eq!(history.partner_of(Axis::Temperature, 0, 0), Some(1));
        assert_eq!(history.partner_of(Axis::Temperature, 2, 0), Some(NO_EXCHANGE));
        assert_eq!(history.parameter_of(Axis::Temperature, 1, 0), Some(310.0));
        assert_eq!(history.recorded_cycles(Axis::Temperature), 1);
    }

    #[test]
    fn rewriting_a_cycle_is_rejected() {
        let replicas = ensemble();
        let mut history = ExchangeHistory::new(3, 2, &[Axis::Temperature]);
        let partners = vec![None, None, None];
        history.record(Axis::Temperature, 0, &replicas, &partners).unwrap();
        let err = history
            .record(Axis::Temperature, 0, &replicas, &partners)
            .unwrap_err();
        assert_eq!(err.info().code, "cycle-rewrite");
    }

    #[test]
    fn undeclared_axis_is_rejected() {
        let replicas = ensemble();
        let mut history = ExchangeHistory::new(3, 2, &[Axis::Temperature]);
        let err = history
            .record(Axis::Secondary, 0, &replicas, &[None, None, None])
            .unwrap_err();
        assert_eq!(err.info().code, "axis-unknown");
    }
}
