use repex_core::{derive_substream_seed, Axis};

fn axis_tag(axis: Axis) -> u64 {
    match axis {
        Axis::Temperature => 1,
        Axis::Secondary => 2,
    }
}

/// Derives the deterministic seed used for a specific replica's substream.
pub fn replica_seed(master_seed: u64, replica_index: usize) -> u64 {
    derive_substream_seed(master_seed, replica_index as u64)
}

/// Deterministic seed for one replica's exchange decision within a cycle.
///
/// Every decision draws from its own substream so that job-completion order
/// and grouping layout cannot perturb the sampled outcome.
pub fn exchange_seed(master_seed: u64, cycle: usize, axis: Axis, replica_index: usize) -> u64 {
    let intermediate = derive_substream_seed(
        master_seed ^ 0xA5A5_A5A5_A5A5_A5A5,
        (cycle as u64) << 8 | axis_tag(axis),
    );
    derive_substream_seed(intermediate, replica_index as u64)
}

/// Seed for the synthetic potential evaluated by simulated MD jobs.
pub fn potential_seed(master_seed: u64, replica_index: usize, cycle: usize) -> u64 {
    let intermediate =
        derive_substream_seed(master_seed, (replica_index as u64) << 32 | cycle as u64);
    derive_substream_seed(intermediate, 0x9E37)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_seeds_differ_per_axis() {
        let a = exchange_seed(7, 3, Axis::Temperature, 0);
        let b = exchange_seed(7, 3, Axis::Secondary, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn exchange_seeds_differ_per_replica_and_cycle() {
        let base = exchange_seed(7, 3, Axis::Temperature, 0);
        assert_ne!(base, exchange_seed(7, 3, Axis::Temperature, 1));
        assert_ne!(base, exchange_seed(7, 4, Axis::Temperature, 0));
        assert_eq!(base, exchange_seed(7, 3, Axis::Temperature, 0));
    }
}
