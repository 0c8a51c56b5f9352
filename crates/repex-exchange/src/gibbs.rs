//! Gibbs (independence) sampling of exchange partners.
//!
//! For every candidate partner the engine computes an unnormalized
//! log-weight from the swap matrix, clamps it into the representable range,
//! and draws one candidate from the resulting categorical distribution. The
//! replica itself is always a candidate, so "no exchange" is an ordinary
//! outcome rather than a failure.

use repex_core::{Axis, Replica, RngHandle};
use tracing::warn;

use crate::matrix::SwapMatrix;

/// Unnormalized log-weight for swapping replicas `i` and `j`:
/// `-(E[i][j] + E[j][i] - E[i][i] - E[j][j])`.
pub fn pairwise_log_weight(matrix: &SwapMatrix, i: usize, j: usize) -> f64 {
    -(matrix.get(i, j) + matrix.get(j, i) - matrix.get(i, i) - matrix.get(j, j))
}

/// Maps a log-weight to a linear weight with overflow/underflow clamping:
/// values that would overflow saturate at `f64::MAX`, values that would
/// underflow collapse to zero.
pub fn clamp_to_linear(log_weight: f64) -> f64 {
    if log_weight > f64::MAX.ln() {
        f64::MAX
    } else if log_weight < f64::MIN_POSITIVE.ln() {
        0.0
    } else {
        log_weight.exp()
    }
}

/// Draws one index with probability proportional to its weight, by
/// cumulative subtraction over the categorical distribution. Returns `None`
/// when the weights cannot produce a draw (all zero, or non-finite sum).
pub fn weighted_choice(weights: &[f64], rng: &mut RngHandle) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    let mut draw = rng.uniform() * total;
    for (index, weight) in weights.iter().enumerate() {
        draw -= weight;
        if draw < 0.0 {
            return Some(index);
        }
    }
    None
}

/// Selects an exchange partner for `replica_id` among `group` (which must
/// contain `replica_id`). Returns the partner's id; returning `replica_id`
/// itself means no exchange. A failed draw degrades to no exchange and never
/// blocks the cycle.
pub fn select_partner(
    replica_id: usize,
    group: &[usize],
    matrix: &SwapMatrix,
    rng: &mut RngHandle,
) -> usize {
    let weights: Vec<f64> = group
        .iter()
        .map(|&candidate| clamp_to_linear(pairwise_log_weight(matrix, replica_id, candidate)))
        .collect();

    match weighted_choice(&weights, rng) {
        Some(index) if index < group.len() => group[index],
        Some(index) => {
            warn!(replica = replica_id, index, "sampled index out of range; skipping exchange");
            replica_id
        }
        None => {
            warn!(replica = replica_id, "partner draw failed; skipping exchange");
            replica_id
        }
    }
}

/// Exchanges the named axis's parameter slot (value plus auxiliary file
/// reference) between replicas `i` and `j` and flags both as swapped.
/// Identity and the other axis's parameters never move. `i == j` is a no-op.
///
/// The slice must be ordered by replica id, which the orchestrator maintains
/// as an invariant for the whole run.
pub fn apply_swap(replicas: &mut [Replica], i: usize, j: usize, axis: Axis) {
    if i == j {
        return;
    }
    let (low, high) = if i < j { (i, j) } else { (j, i) };
    let (head, tail) = replicas.split_at_mut(high);
    let (a, b) = (&mut head[low], &mut tail[0]);
    debug_assert_eq!(a.id().as_raw(), low);
    debug_assert_eq!(b.id().as_raw(), high);

    if let (Some(slot_a), Some(slot_b)) = (a.slot(axis).cloned(), b.slot(axis).cloned()) {
        a.replace_slot(axis, slot_b);
        b.replace_slot(axis, slot_a);
        a.swapped_this_cycle = true;
        b.swapped_this_cycle = true;
    }
}

/// Runs one full decision pass over a group: every member draws a partner
/// from its own substream, in group order, and each accepted swap is applied
/// immediately. A replica that already traded earlier in the pass still gets
/// its own draw, so exchanges can chain through the group within one pass.
/// Returns the applied swaps in draw order.
pub fn exchange_pass(
    replicas: &mut [Replica],
    group: &[usize],
    matrix: &SwapMatrix,
    axis: Axis,
    mut seed_for: impl FnMut(usize) -> u64,
) -> Vec<(usize, usize)> {
    let mut swaps = Vec::new();
    for &i in group {
        let mut rng = RngHandle::from_seed(seed_for(i));
        let j = select_partner(i, group, matrix, &mut rng);
        if j != i {
            apply_swap(replicas, i, j, axis);
            swaps.push((i, j));
        }
    }
    swaps
}
