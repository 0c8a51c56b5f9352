use std::path::PathBuf;

use repex_core::errors::ErrorInfo;
use repex_core::{Axis, Replica, ReplicaId, RepexError};
use serde::{Deserialize, Serialize};

use crate::ladder;

/// YAML-configurable parameters governing a replica-exchange run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of MD-plus-exchange cycles to execute. A run of C cycles
    /// performs C MD segments but only C-1 exchange decisions per axis.
    pub cycles: usize,
    /// Temperature ladder specification.
    #[serde(default)]
    pub ladder: LadderConfig,
    /// Secondary-axis values; presence enables the 2D grid.
    #[serde(default)]
    pub secondary: Option<SecondaryConfig>,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Barrier behaviour for stalled jobs.
    #[serde(default)]
    pub barrier: BarrierConfig,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cycles: 4,
            ladder: LadderConfig::default(),
            secondary: None,
            seed_policy: SeedPolicy::default(),
            barrier: BarrierConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    /// Axes declared by this configuration, in fixed execution order.
    pub fn axes(&self) -> Vec<Axis> {
        if self.secondary.is_some() {
            vec![Axis::Temperature, Axis::Secondary]
        } else {
            vec![Axis::Temperature]
        }
    }

    /// Total ensemble size: the ladder length, multiplied by the number of
    /// secondary values when the 2D grid is enabled.
    pub fn ensemble_size(&self) -> usize {
        let temps = self.ladder.len();
        match &self.secondary {
            Some(secondary) => temps * secondary.values.len().max(1),
            None => temps,
        }
    }
}

/// Temperature ladder construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Number of rungs in the ladder.
    #[serde(default = "default_rungs")]
    pub rungs: usize,
    /// Temperature of the coldest rung.
    #[serde(default = "default_base_temperature")]
    pub base_temperature: f64,
    /// Policy used to generate higher temperatures.
    #[serde(default)]
    pub policy: LadderPolicy,
}

fn default_rungs() -> usize {
    4
}

fn default_base_temperature() -> f64 {
    300.0
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            rungs: default_rungs(),
            base_temperature: default_base_temperature(),
            policy: LadderPolicy::default(),
        }
    }
}

impl LadderConfig {
    /// Number of temperatures the ladder will produce.
    pub fn len(&self) -> usize {
        match &self.policy {
            LadderPolicy::Geometric { .. } => self.rungs.max(1),
            LadderPolicy::Manual { temperatures } => {
                if temperatures.is_empty() {
                    1
                } else {
                    temperatures.len()
                }
            }
        }
    }

    /// Whether the ladder would be empty (never true by construction).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Supported ladder construction strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LadderPolicy {
    /// Geometric progression with a fixed ratio between neighbouring rungs.
    Geometric {
        /// Multiplicative spacing ratio between adjacent rungs.
        #[serde(default = "default_ratio")]
        ratio: f64,
    },
    /// Explicit list of temperatures supplied by the user (overrides `rungs`).
    Manual {
        /// Ordered list of temperatures.
        temperatures: Vec<f64>,
    },
}

fn default_ratio() -> f64 {
    1.05
}

impl Default for LadderPolicy {
    fn default() -> Self {
        LadderPolicy::Geometric {
            ratio: default_ratio(),
        }
    }
}

/// Secondary-axis parameter grid (salt concentration, restraint value, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryConfig {
    /// Values of the secondary parameter; each temperature rung is
    /// replicated once per value.
    pub values: Vec<f64>,
    /// Optional per-value auxiliary file templates, matched by index.
    #[serde(default)]
    pub aux_files: Vec<String>,
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label used when deriving substream seeds (kept in manifests).
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x4E5E_4B1E_5EED_0001_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Barrier behaviour configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarrierConfig {
    /// Per-stage timeout in seconds after which stalled jobs are treated as
    /// failed so the barrier can release. `None` waits indefinitely.
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
}

/// Output directory layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts. Created if it does not exist.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// History filename relative to `run_directory`.
    #[serde(default = "default_history_filename")]
    pub history_file: PathBuf,
    /// Execution profile filename relative to `run_directory`.
    #[serde(default = "default_profile_filename")]
    pub profile_file: PathBuf,
    /// Manifest filename relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
}

fn default_history_filename() -> PathBuf {
    PathBuf::from("history.json")
}

fn default_profile_filename() -> PathBuf {
    PathBuf::from("profile.csv")
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            history_file: default_history_filename(),
            profile_file: default_profile_filename(),
            manifest_file: default_manifest_filename(),
        }
    }
}

/// Builds the replica ensemble described by a configuration.
///
/// Ids are assigned row-major over the (temperature, secondary) grid so that
/// replicas sharing a temperature rung are contiguous per secondary value.
pub fn build_replicas(config: &RunConfig) -> Result<Vec<Replica>, RepexError> {
    if config.cycles == 0 {
        return Err(RepexError::Config(
            ErrorInfo::new("cycles-zero", "a run must contain at least one cycle")
                .with_hint("set cycles >= 1"),
        ));
    }
    let temperatures = ladder::build_ladder(&config.ladder);
    if temperatures.is_empty() {
        return Err(RepexError::Config(ErrorInfo::new(
            "ladder-empty",
            "temperature ladder contained no rungs",
        )));
    }

    let mut replicas = Vec::new();
    match &config.secondary {
        None => {
            for (index, &temperature) in temperatures.iter().enumerate() {
                replicas.push(Replica::new(ReplicaId::from_raw(index), temperature));
            }
        }
        Some(secondary) => {
            if secondary.values.is_empty() {
                return Err(RepexError::Config(ErrorInfo::new(
                    "secondary-empty",
                    "secondary axis enabled but no values supplied",
                )));
            }
            let mut index = 0;
            for &temperature in &temperatures {
                for (slot, &value) in secondary.values.iter().enumerate() {
                    let mut replica = Replica::new(ReplicaId::from_raw(index), temperature)
                        .with_secondary(value);
                    if let Some(aux) = secondary.aux_files.get(slot) {
                        replica.set_aux_file(Axis::Secondary, aux.clone());
                    }
                    replicas.push(replica);
                    index += 1;
                }
            }
        }
    }
    Ok(replicas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_1d_ensemble() {
        let config = RunConfig::default();
        let replicas = build_replicas(&config).unwrap();
        assert_eq!(replicas.len(), config.ensemble_size());
        assert!(replicas.iter().all(|r| !r.has_axis(Axis::Secondary)));
    }

    #[test]
    fn secondary_values_span_the_grid() {
        let config = RunConfig {
            ladder: LadderConfig {
                rungs: 2,
                base_temperature: 300.0,
                policy: LadderPolicy::Manual {
                    temperatures: vec![300.0, 310.0],
                },
            },
            secondary: Some(SecondaryConfig {
                values: vec![0.1, 0.2, 0.3],
                aux_files: Vec::new(),
            }),
            ..RunConfig::default()
        };
        let replicas = build_replicas(&config).unwrap();
        assert_eq!(replicas.len(), 6);
        assert_eq!(replicas[0].parameter(Axis::Secondary), Some(0.1));
        assert_eq!(replicas[5].parameter(Axis::Temperature), Some(310.0));
        assert_eq!(replicas[5].parameter(Axis::Secondary), Some(0.3));
    }

    #[test]
    fn zero_cycles_is_rejected() {
        let config = RunConfig {
            cycles: 0,
            ..RunConfig::default()
        };
        let err = build_replicas(&config).unwrap_err();
        assert_eq!(err.info().code, "cycles-zero");
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let config = RunConfig {
            cycles: 8,
            secondary: Some(SecondaryConfig {
                values: vec![0.5, 1.0],
                aux_files: vec!["rstr.0".into(), "rstr.1".into()],
            }),
            ..RunConfig::default()
        };
        let text = serde_yaml::to_string(&config).unwrap();
        let back: RunConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(config, back);
    }
}
