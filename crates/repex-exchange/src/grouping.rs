//! Partitioning of the ensemble into exchange groups.
//!
//! An exchange on one axis may only pair replicas that are comparable on
//! every other axis. The 1D case uses a single all-replica group; the 2D
//! case partitions by the current value on the other axis, so exchanges
//! never cross groups and detailed balance holds along each axis
//! independently.

use indexmap::IndexMap;
use repex_core::{Axis, Replica};

/// Strategy deciding which replicas may exchange with each other on a given
/// axis. Returned groups are disjoint index sets covering the ensemble.
pub trait GroupingStrategy {
    /// Partitions `replicas` into exchange groups for a step on `axis`.
    /// Indices refer to positions in the id-ordered ensemble slice.
    fn group_for_axis(&self, axis: Axis, replicas: &[Replica]) -> Vec<Vec<usize>>;
}

/// Trivial strategy for one-dimensional exchange: everyone is a candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleGroup;

impl GroupingStrategy for SingleGroup {
    fn group_for_axis(&self, _axis: Axis, replicas: &[Replica]) -> Vec<Vec<usize>> {
        if replicas.is_empty() {
            return Vec::new();
        }
        vec![(0..replicas.len()).collect()]
    }
}

/// Two-dimensional strategy: partitions by the bitwise-equal current value
/// on the *other* axis, preserving first-seen order of the values.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValuePartition;

impl GroupingStrategy for ValuePartition {
    fn group_for_axis(&self, axis: Axis, replicas: &[Replica]) -> Vec<Vec<usize>> {
        let other = axis.other();
        let mut groups: IndexMap<u64, Vec<usize>> = IndexMap::new();
        // replicas without the other axis land in one shared bucket
        for (index, replica) in replicas.iter().enumerate() {
            let key = replica
                .parameter(other)
                .map(f64::to_bits)
                .unwrap_or(u64::MAX);
            groups.entry(key).or_default().push(index);
        }
        groups.into_values().collect()
    }
}
