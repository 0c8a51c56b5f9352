//! Dense swap matrix and the composer that assembles it from per-replica
//! column records.

use repex_core::errors::ErrorInfo;
use repex_core::{Replica, RepexError};
use serde::{Deserialize, Serialize};

use crate::column::MatrixColumn;

/// Square table of reduced energies: `get(state, replica)` is the energy of
/// `replica`'s current configuration evaluated under `state`'s parameters.
/// The diagonal holds each replica's native evaluation and participates in
/// the exchange-probability normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SwapMatrix {
    /// Creates a zero-filled matrix for an ensemble of `size` replicas.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    /// Ensemble size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Reduced energy of `replica`'s configuration under `state`'s parameters.
    pub fn get(&self, state: usize, replica: usize) -> f64 {
        self.values[state * self.size + replica]
    }

    /// Sets one cell of the matrix.
    pub fn set(&mut self, state: usize, replica: usize, value: f64) {
        self.values[state * self.size + replica] = value;
    }
}

/// Merges decentralized per-replica column records into a dense swap matrix
/// and records provenance on the replicas.
///
/// Records may arrive in any completion order; they are sorted by replica id
/// before the matrix is filled, so composing a permutation of the same
/// columns yields an identical matrix. A missing or duplicated replica id is
/// a hard error: the matrix cannot be composed with gaps.
pub fn compose(replicas: &mut [Replica], columns: Vec<MatrixColumn>) -> Result<SwapMatrix, RepexError> {
    let size = replicas.len();
    let mut sorted: Vec<Option<MatrixColumn>> = (0..size).map(|_| None).collect();
    for column in columns {
        if column.replica_id >= size {
            return Err(RepexError::Matrix(
                ErrorInfo::new("column-unknown-id", "column record names an unknown replica")
                    .with_context("replica", column.replica_id.to_string())
                    .with_context("ensemble", size.to_string()),
            ));
        }
        if sorted[column.replica_id].is_some() {
            return Err(RepexError::Matrix(
                ErrorInfo::new("column-duplicate", "two column records share a replica id")
                    .with_context("replica", column.replica_id.to_string()),
            ));
        }
        let id = column.replica_id;
        sorted[id] = Some(column);
    }

    let mut matrix = SwapMatrix::new(size);
    for (replica, slot) in replicas.iter_mut().zip(sorted.into_iter()) {
        let id = replica.id().as_raw();
        let column = slot.ok_or_else(|| {
            RepexError::Matrix(
                ErrorInfo::new("column-missing", "no column record for replica")
                    .with_context("replica", id.to_string())
                    .with_hint("the matrix cannot be composed with gaps"),
            )
        })?;
        if column.energies.len() != size {
            return Err(RepexError::Matrix(
                ErrorInfo::new("column-size", "column record length does not match ensemble")
                    .with_context("replica", id.to_string())
                    .with_context("length", column.energies.len().to_string()),
            ));
        }
        for (state, &value) in column.energies.iter().enumerate() {
            matrix.set(state, id, value);
        }
        if !column.provenance.is_empty() {
            replica.note_provenance(&column.provenance);
        }
    }
    Ok(matrix)
}
