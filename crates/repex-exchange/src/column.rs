//! Wire format for one replica's swap-matrix column.
//!
//! Each decentralized energy job prints one record on stdout: the replica id,
//! the N reduced-energy values of that replica's configuration evaluated
//! under every ensemble member's parameters, and the provenance path of the
//! directory holding the replica's MD output for this cycle. Records are
//! matched to replicas by the explicit id field, never by arrival order.

use repex_core::errors::ErrorInfo;
use repex_core::RepexError;
use serde::{Deserialize, Serialize};

/// One replica's contribution to the swap matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixColumn {
    /// Producing replica's id.
    pub replica_id: usize,
    /// Reduced energies, indexed by ensemble state.
    pub energies: Vec<f64>,
    /// Opaque path to the job sandbox holding this cycle's MD output.
    pub provenance: String,
}

impl MatrixColumn {
    /// Degraded substitute for a replica whose job failed: a zero-energy
    /// column with empty provenance.
    pub fn zeroed(replica_id: usize, size: usize) -> Self {
        Self {
            replica_id,
            energies: vec![0.0; size],
            provenance: String::new(),
        }
    }

    /// Parses a column record of the form
    /// `<replica_id> <e_0> ... <e_{n-1}> <provenance>`.
    pub fn parse(text: &str, size: usize) -> Result<Self, RepexError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() != size + 2 {
            return Err(RepexError::Matrix(
                ErrorInfo::new("column-malformed", "unexpected token count in column record")
                    .with_context("expected", (size + 2).to_string())
                    .with_context("found", tokens.len().to_string()),
            ));
        }
        let replica_id: usize = tokens[0].parse().map_err(|_| {
            RepexError::Matrix(
                ErrorInfo::new("column-bad-id", "column record id is not an integer")
                    .with_context("token", tokens[0].to_string()),
            )
        })?;
        let mut energies = Vec::with_capacity(size);
        for token in &tokens[1..=size] {
            let value: f64 = token.parse().map_err(|_| {
                RepexError::Matrix(
                    ErrorInfo::new("column-bad-energy", "column record energy is not numeric")
                        .with_context("replica", replica_id.to_string())
                        .with_context("token", token.to_string()),
                )
            })?;
            energies.push(value);
        }
        Ok(Self {
            replica_id,
            energies,
            provenance: tokens[size + 1].to_string(),
        })
    }

    /// Renders the record in the wire format consumed by [`Self::parse`].
    pub fn render(&self) -> String {
        let mut out = self.replica_id.to_string();
        for value in &self.energies {
            out.push(' ');
            out.push_str(&format!("{value:.10}"));
        }
        out.push(' ');
        if self.provenance.is_empty() {
            out.push('-');
        } else {
            out.push_str(&self.provenance);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_parse_round_trip() {
        let column = MatrixColumn {
            replica_id: 2,
            energies: vec![-1.25, 0.0, 3.5],
            provenance: "unit-0002".to_string(),
        };
        let back = MatrixColumn::parse(&column.render(), 3).unwrap();
        assert_eq!(back.replica_id, 2);
        assert_eq!(back.provenance, "unit-0002");
        for (a, b) in back.energies.iter().zip(column.energies.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn short_record_is_rejected() {
        let err = MatrixColumn::parse("0 1.0 2.0", 3).unwrap_err();
        assert_eq!(err.info().code, "column-malformed");
    }

    #[test]
    fn non_numeric_energy_is_rejected() {
        let err = MatrixColumn::parse("0 1.0 oops 3.0 unit-0", 3).unwrap_err();
        assert_eq!(err.info().code, "column-bad-energy");
    }
}
