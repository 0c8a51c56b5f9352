use crate::config::{LadderConfig, LadderPolicy};

/// Builds a deterministic temperature ladder following the provided policy.
pub fn build_ladder(config: &LadderConfig) -> Vec<f64> {
    match &config.policy {
        LadderPolicy::Geometric { ratio } => {
            let ratio = (*ratio).max(1.001);
            let mut ladder = Vec::with_capacity(config.rungs.max(1));
            let mut temp = config.base_temperature;
            for _ in 0..config.rungs.max(1) {
                ladder.push(temp.max(1e-6));
                temp *= ratio;
            }
            ladder
        }
        LadderPolicy::Manual { temperatures } => {
            if temperatures.is_empty() {
                vec![config.base_temperature]
            } else {
                temperatures.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometric_ladder_is_monotonic() {
        let config = LadderConfig {
            rungs: 6,
            base_temperature: 300.0,
            policy: LadderPolicy::Geometric { ratio: 1.03 },
        };
        let ladder = build_ladder(&config);
        assert_eq!(ladder.len(), 6);
        for pair in ladder.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn manual_ladder_is_used_verbatim() {
        let config = LadderConfig {
            rungs: 2,
            base_temperature: 300.0,
            policy: LadderPolicy::Manual {
                temperatures: vec![300.0, 310.0, 320.0, 330.0],
            },
        };
        assert_eq!(build_ladder(&config), vec![300.0, 310.0, 320.0, 330.0]);
    }

    #[test]
    fn empty_manual_ladder_falls_back_to_base() {
        let config = LadderConfig {
            rungs: 3,
            base_temperature: 295.0,
            policy: LadderPolicy::Manual {
                temperatures: Vec::new(),
            },
        };
        assert_eq!(build_ladder(&config), vec![295.0]);
    }
}
