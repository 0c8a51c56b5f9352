//! Pairs-for-exchange boundary format used by the collective variant.
//!
//! One line per decided exchange, `"<replica_id_a> <replica_id_b>"`,
//! terminated by a line holding the producing process's working directory.
//! The consumer tolerates an unmatched id by substituting a uniformly
//! random valid replica, a deliberate and loudly logged approximation that
//! trades correctness of one decision for keeping the cycle alive.

use std::fs;
use std::path::Path;

use rand::Rng;
use repex_core::errors::ErrorInfo;
use repex_core::{Axis, Replica, RepexError, RngHandle};
use tracing::warn;

use crate::gibbs;

/// Parsed contents of a pairs-for-exchange file.
#[derive(Debug, Clone, PartialEq)]
pub struct PairsFile {
    /// Decided exchanges as raw id pairs, in file order.
    pub pairs: Vec<(usize, usize)>,
    /// Working directory of the producing process (the final line).
    pub working_directory: String,
}

/// Renders a pairs file body from decided exchanges and the producer's
/// working directory.
pub fn render(pairs: &[(usize, usize)], working_directory: &str) -> String {
    let mut out = String::new();
    for (a, b) in pairs {
        out.push_str(&format!("{a} {b}\n"));
    }
    out.push_str(working_directory);
    out.push('\n');
    out
}

/// Writes a pairs file to disk.
pub fn write(path: &Path, pairs: &[(usize, usize)], working_directory: &str) -> Result<(), RepexError> {
    fs::write(path, render(pairs, working_directory)).map_err(|err| {
        RepexError::Serde(
            ErrorInfo::new("pairs-write", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}

/// Parses a pairs file body. Lines that do not contain exactly two integer
/// tokens are treated as the trailing working-directory line; everything
/// after the first such line is ignored.
pub fn parse(text: &str) -> Result<PairsFile, RepexError> {
    let mut pairs = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() == 2 {
            if let (Ok(a), Ok(b)) = (tokens[0].parse(), tokens[1].parse()) {
                pairs.push((a, b));
                continue;
            }
        }
        return Ok(PairsFile {
            pairs,
            working_directory: line.to_string(),
        });
    }
    Err(RepexError::Serde(ErrorInfo::new(
        "pairs-truncated",
        "pairs file ended before the working-directory line",
    )))
}

/// Reads and parses a pairs file from disk.
pub fn load(path: &Path) -> Result<PairsFile, RepexError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        RepexError::Serde(
            ErrorInfo::new("pairs-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    parse(&contents)
}

/// Applies decided exchanges to the ensemble on the given axis.
///
/// An id with no matching replica falls back to a uniformly random valid
/// replica instead of failing the cycle. The substitution silently alters
/// detailed balance, so it is logged loudly every time it happens.
pub fn apply(replicas: &mut [Replica], pairs: &[(usize, usize)], axis: Axis, rng: &mut RngHandle) {
    let size = replicas.len();
    if size == 0 {
        return;
    }
    for &(a, b) in pairs {
        let a = resolve(a, size, rng);
        let b = resolve(b, size, rng);
        gibbs::apply_swap(replicas, a, b, axis);
    }
}

fn resolve(id: usize, size: usize, rng: &mut RngHandle) -> usize {
    if id < size {
        return id;
    }
    let substitute = rng.inner_mut().gen_range(0..size);
    warn!(
        id,
        substitute,
        "pairs file names an unknown replica; substituting a random one (known approximation)"
    );
    substitute
}

#[cfg(test)]
mod tests {
    use super::*;
    use repex_core::ReplicaId;

    #[test]
    fn render_parse_round_trip() {
        let body = render(&[(0, 3), (1, 2)], "/scratch/unit-0099");
        let parsed = parse(&body).unwrap();
        assert_eq!(parsed.pairs, vec![(0, 3), (1, 2)]);
        assert_eq!(parsed.working_directory, "/scratch/unit-0099");
    }

    #[test]
    fn file_without_terminator_is_rejected() {
        let err = parse("0 1\n2 3\n").err();
        // "2 3" parses as a pair, so the file ends without a directory line
        assert_eq!(err.unwrap().info().code, "pairs-truncated");
    }

    #[test]
    fn unmatched_id_swaps_a_random_replica() {
        let mut replicas: Vec<Replica> = (0..4)
            .map(|i| Replica::new(ReplicaId::from_raw(i), 300.0 + i as f64))
            .collect();
        let before: Vec<f64> = replicas
            .iter()
            .map(|r| r.parameter(Axis::Temperature).unwrap())
            .collect();
        let mut rng = RngHandle::from_seed(11);
        apply(&mut replicas, &[(0, 99)], Axis::Temperature, &mut rng);
        // identity never moves; the multiset of temperatures is preserved
        let mut after: Vec<f64> = replicas
            .iter()
            .map(|r| r.parameter(Axis::Temperature).unwrap())
            .collect();
        after.sort_by(f64::total_cmp);
        let mut sorted_before = before;
        sorted_before.sort_by(f64::total_cmp);
        assert_eq!(after, sorted_before);
    }
}
