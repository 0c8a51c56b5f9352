//! Rank-based collective assembly of the swap matrix.
//!
//! A variant of the exchange-energy step where a cooperating worker group
//! computes the matrix instead of N independent jobs: each rank evaluates
//! the columns of its assigned replicas, all columns are gathered to a
//! designated rank, and the merged table is used for a single central round
//! of partner selection whose result is written out as a pairs file. The
//! gather is a barrier: no rank proceeds until every rank has contributed.

use repex_core::errors::ErrorInfo;
use repex_core::{Replica, RepexError, RngHandle};

use crate::column::MatrixColumn;
use crate::gibbs;
use crate::matrix::{self, SwapMatrix};

/// Columns contributed by one worker rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankContribution {
    /// Contributing rank.
    pub rank: usize,
    /// Columns for the replicas assigned to that rank.
    pub columns: Vec<MatrixColumn>,
}

/// Assigns replica ids to worker ranks round-robin: rank `p` owns
/// `p, p + ranks, p + 2*ranks, ...`. The replica count must divide evenly
/// across ranks.
pub fn assign_ranks(replicas: usize, ranks: usize) -> Result<Vec<Vec<usize>>, RepexError> {
    if ranks == 0 {
        return Err(RepexError::Config(ErrorInfo::new(
            "ranks-zero",
            "worker group must contain at least one rank",
        )));
    }
    if replicas % ranks != 0 {
        return Err(RepexError::Config(
            ErrorInfo::new(
                "ranks-indivisible",
                "replica count must be divisible by the number of ranks",
            )
            .with_context("replicas", replicas.to_string())
            .with_context("ranks", ranks.to_string()),
        ));
    }
    let per_rank = replicas / ranks;
    let mut assignments = vec![Vec::with_capacity(per_rank); ranks];
    for (rank, slots) in assignments.iter_mut().enumerate() {
        for k in 0..per_rank {
            slots.push(rank + ranks * k);
        }
    }
    Ok(assignments)
}

/// Gathers per-rank contributions into the flat column set the composer
/// consumes. Every rank must contribute and every replica must be covered;
/// a gap here means a worker never reached the gather point, which stalls
/// the collective and is fatal.
pub fn gather_columns(
    size: usize,
    assignments: &[Vec<usize>],
    contributions: Vec<RankContribution>,
) -> Result<Vec<MatrixColumn>, RepexError> {
    let mut present = vec![false; assignments.len()];
    let mut columns = Vec::with_capacity(size);
    for contribution in contributions {
        if contribution.rank >= assignments.len() {
            return Err(RepexError::Config(
                ErrorInfo::new("rank-unknown", "contribution from an unassigned rank")
                    .with_context("rank", contribution.rank.to_string()),
            ));
        }
        if present[contribution.rank] {
            return Err(RepexError::Config(
                ErrorInfo::new("rank-duplicate", "two contributions from one rank")
                    .with_context("rank", contribution.rank.to_string()),
            ));
        }
        present[contribution.rank] = true;
        columns.extend(contribution.columns);
    }
    if let Some(missing) = present.iter().position(|&p| !p) {
        return Err(RepexError::Config(
            ErrorInfo::new("rank-missing", "a rank never reached the gather point")
                .with_context("rank", missing.to_string()),
        ));
    }
    if columns.len() != size {
        return Err(RepexError::Matrix(
            ErrorInfo::new("gather-incomplete", "gathered columns do not cover the ensemble")
                .with_context("expected", size.to_string())
                .with_context("found", columns.len().to_string()),
        ));
    }
    Ok(columns)
}

/// Central partner-selection round over a gathered matrix: one Gibbs draw
/// per replica over the whole ensemble, producing the pairs rank 0 writes to
/// the pairs-for-exchange file. Self-selections are omitted.
pub fn decide_exchanges(matrix: &SwapMatrix, seed_for: impl Fn(usize) -> u64) -> Vec<(usize, usize)> {
    let size = matrix.size();
    let group: Vec<usize> = (0..size).collect();
    let mut pairs = Vec::new();
    for replica in 0..size {
        let mut rng = RngHandle::from_seed(seed_for(replica));
        let partner = gibbs::select_partner(replica, &group, matrix, &mut rng);
        if partner != replica {
            pairs.push((replica, partner));
        }
    }
    pairs
}

/// Convenience wrapper: gather, compose, decide. Functionally equivalent to
/// running the centralized composer over the same columns.
pub fn collective_exchange(
    replicas: &mut [Replica],
    assignments: &[Vec<usize>],
    contributions: Vec<RankContribution>,
    seed_for: impl Fn(usize) -> u64,
) -> Result<Vec<(usize, usize)>, RepexError> {
    let columns = gather_columns(replicas.len(), assignments, contributions)?;
    let matrix = matrix::compose(replicas, columns)?;
    Ok(decide_exchanges(&matrix, seed_for))
}
