//! Reduced (dimension-less) energy helpers shared by energy workers.

/// Boltzmann constant in kcal/mol, matching the MD output units.
pub const KB: f64 = 0.0019872041;

/// Inverse temperature `1 / (kb * T)`; `1 / kb` when `T == 0` so that
/// zeroed degraded data stays finite.
pub fn beta(temperature: f64) -> f64 {
    if temperature != 0.0 {
        1.0 / (KB * temperature)
    } else {
        1.0 / KB
    }
}

/// Reduced energy of a configuration with the given potential evaluated at
/// the given temperature. These are the entries of the swap matrix.
pub fn reduced_energy(temperature: f64, potential: f64) -> f64 {
    beta(temperature) * potential
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduced_energy_scales_inversely_with_temperature() {
        let cold = reduced_energy(300.0, -120.0);
        let hot = reduced_energy(600.0, -120.0);
        assert!((hot.abs() - cold.abs() / 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_temperature_does_not_divide_by_zero() {
        let value = reduced_energy(0.0, 10.0);
        assert!(value.is_finite());
        assert!((value - 10.0 / KB).abs() < 1e-9);
    }
}
