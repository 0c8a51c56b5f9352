use std::collections::HashMap;
use std::time::Duration;

use repex_core::{Axis, Replica, RepexError, RngHandle};
use repex_exchange::column::MatrixColumn;
use repex_exchange::config::{
    BarrierConfig, LadderConfig, LadderPolicy, OutputConfig, RunConfig, SecondaryConfig, SeedPolicy,
};
use repex_exchange::energy::reduced_energy;
use repex_exchange::history::NO_EXCHANGE;
use repex_exchange::orchestrator::{
    CycleOrchestrator, JobExecutor, JobHandle, JobResult, JobSpec, JobStatus, MdKernel, Stage,
};
use repex_exchange::{build_replicas, determinism, SingleGroup, ValuePartition};

/// In-process executor: MD jobs are no-ops, exchange jobs print the column
/// record a real energy worker would, using a deterministic synthetic
/// potential derived from the master seed.
struct SimExecutor {
    master_seed: u64,
    next_handle: u64,
    pending: HashMap<JobHandle, JobSpec>,
    /// (cycle, replica) pairs whose exchange job reports failure.
    failed_exchange_jobs: Vec<(usize, usize)>,
    /// (cycle, replica) pairs whose exchange job finishes but prints
    /// something that is not a column record.
    garbled_exchange_jobs: Vec<(usize, usize)>,
}

impl SimExecutor {
    fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            next_handle: 0,
            pending: HashMap::new(),
            failed_exchange_jobs: Vec::new(),
            garbled_exchange_jobs: Vec::new(),
        }
    }

    fn potential(&self, replica_id: usize, cycle: usize) -> f64 {
        let mut rng = RngHandle::from_seed(determinism::potential_seed(
            self.master_seed,
            replica_id,
            cycle,
        ));
        -150.0 + 40.0 * rng.uniform()
    }
}

impl JobExecutor for SimExecutor {
    fn submit(&mut self, spec: JobSpec) -> Result<JobHandle, RepexError> {
        let handle = JobHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.insert(handle, spec);
        Ok(handle)
    }

    fn wait_all(
        &mut self,
        handles: &[JobHandle],
        _timeout: Option<Duration>,
    ) -> Result<Vec<JobResult>, RepexError> {
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let spec = self.pending.remove(handle).expect("unknown handle");
            let cycle: usize = spec.arguments[1].parse().unwrap();
            let workdir = format!("unit-{:04}-c{}", spec.replica_id, cycle);
            let result = match spec.stage {
                Stage::Md => JobResult {
                    status: JobStatus::Done,
                    stdout: String::new(),
                    working_directory: workdir,
                },
                Stage::Exchange => {
                    if self.failed_exchange_jobs.contains(&(cycle, spec.replica_id)) {
                        JobResult {
                            status: JobStatus::Failed,
                            stdout: String::new(),
                            working_directory: workdir,
                        }
                    } else if self.garbled_exchange_jobs.contains(&(cycle, spec.replica_id)) {
                        JobResult {
                            status: JobStatus::Done,
                            stdout: "kernel banner\nnot a column record\n".to_string(),
                            working_directory: workdir,
                        }
                    } else {
                        let temperatures: Vec<f64> = spec.arguments[2]
                            .split(',')
                            .map(|t| t.parse().unwrap())
                            .collect();
                        let potential = self.potential(spec.replica_id, cycle);
                        let column = MatrixColumn {
                            replica_id: spec.replica_id,
                            energies: temperatures
                                .iter()
                                .map(|&t| reduced_energy(t, potential))
                                .collect(),
                            provenance: workdir.clone(),
                        };
                        JobResult {
                            status: JobStatus::Done,
                            stdout: column.render(),
                            working_directory: workdir,
                        }
                    }
                }
            };
            results.push(result);
        }
        Ok(results)
    }
}

struct SimKernel;

impl MdKernel for SimKernel {
    fn prepare_md_job(
        &self,
        replica: &Replica,
        _axis: Axis,
        cycle: usize,
    ) -> Result<JobSpec, RepexError> {
        Ok(JobSpec {
            executable: "sim-md".to_string(),
            arguments: vec![replica.id().as_raw().to_string(), cycle.to_string()],
            cores: 1,
            input_staging: Vec::new(),
            output_staging: Vec::new(),
            stage: Stage::Md,
            replica_id: replica.id().as_raw(),
        })
    }

    fn prepare_exchange_job(
        &self,
        replica: &Replica,
        _axis: Axis,
        cycle: usize,
        ensemble: &[Replica],
    ) -> Result<JobSpec, RepexError> {
        let temperatures: Vec<String> = ensemble
            .iter()
            .map(|r| r.parameter(Axis::Temperature).unwrap_or(0.0).to_string())
            .collect();
        Ok(JobSpec {
            executable: "sim-column".to_string(),
            arguments: vec![
                replica.id().as_raw().to_string(),
                cycle.to_string(),
                temperatures.join(","),
            ],
            cores: 1,
            input_staging: Vec::new(),
            output_staging: Vec::new(),
            stage: Stage::Exchange,
            replica_id: replica.id().as_raw(),
        })
    }
}

fn config_1d(cycles: usize) -> RunConfig {
    RunConfig {
        cycles,
        ladder: LadderConfig {
            rungs: 4,
            base_temperature: 300.0,
            policy: LadderPolicy::Manual {
                temperatures: vec![300.0, 310.0, 320.0, 330.0],
            },
        },
        secondary: None,
        seed_policy: SeedPolicy {
            master_seed: 0xC0FFEE,
            label: None,
        },
        barrier: BarrierConfig::default(),
        output: OutputConfig::default(),
    }
}

#[test]
fn run_preserves_replica_identities_and_parameter_multiset() {
    let config = config_1d(6);
    let mut replicas = build_replicas(&config).unwrap();
    let mut orchestrator = CycleOrchestrator::new(
        SimExecutor::new(0xC0FFEE),
        SimKernel,
        Box::new(SingleGroup),
        config,
    );
    let report = orchestrator.run(&mut replicas).unwrap();
    assert_eq!(report.cycles_completed, 6);

    // every submitted job was collected at a barrier
    let executor = orchestrator.into_executor();
    assert!(executor.pending.is_empty());

    let ids: Vec<usize> = replicas.iter().map(|r| r.id().as_raw()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);

    let mut temps: Vec<f64> = replicas
        .iter()
        .map(|r| r.parameter(Axis::Temperature).unwrap())
        .collect();
    temps.sort_by(f64::total_cmp);
    assert_eq!(temps, vec![300.0, 310.0, 320.0, 330.0]);
}

#[test]
fn history_has_one_populated_column_per_cycle() {
    let cycles = 5;
    let config = config_1d(cycles);
    let mut replicas = build_replicas(&config).unwrap();
    let mut orchestrator = CycleOrchestrator::new(
        SimExecutor::new(0xC0FFEE),
        SimKernel,
        Box::new(SingleGroup),
        config,
    );
    let report = orchestrator.run(&mut replicas).unwrap();
    let history = &report.history;
    assert_eq!(history.recorded_cycles(Axis::Temperature), cycles);

    for replica in 0..4 {
        let trajectory = history.trajectory(Axis::Temperature, replica).unwrap();
        assert_eq!(trajectory.len(), cycles);
        assert!(trajectory.iter().all(|v| v.is_finite()));
        // final cycle runs MD only: always the no-exchange marker
        assert_eq!(
            history.partner_of(Axis::Temperature, replica, cycles - 1),
            Some(NO_EXCHANGE)
        );
    }
}

#[test]
fn identical_seeds_reproduce_identical_trajectories() {
    let run = |seed: u64| {
        let mut config = config_1d(5);
        config.seed_policy.master_seed = seed;
        let mut replicas = build_replicas(&config).unwrap();
        let mut orchestrator = CycleOrchestrator::new(
            SimExecutor::new(seed),
            SimKernel,
            Box::new(SingleGroup),
            config,
        );
        let report = orchestrator.run(&mut replicas).unwrap();
        report
            .history
            .trajectory(Axis::Temperature, 0)
            .unwrap()
            .to_vec()
    };
    assert_eq!(run(42), run(42));
}

#[test]
fn failed_exchange_job_degrades_without_aborting() {
    let config = config_1d(3);
    let mut executor = SimExecutor::new(0xC0FFEE);
    executor.failed_exchange_jobs.push((0, 2));
    let mut replicas = build_replicas(&config).unwrap();
    let mut orchestrator =
        CycleOrchestrator::new(executor, SimKernel, Box::new(SingleGroup), config);
    let report = orchestrator.run(&mut replicas).unwrap();
    assert_eq!(report.cycles_completed, 3);
    assert!(report.degraded_jobs >= 1);
}

#[test]
fn garbled_exchange_output_degrades_without_aborting() {
    // The job finishes, but its stdout is not a column record. The cycle
    // must carry on with a zeroed column instead of aborting.
    let config = config_1d(3);
    let mut executor = SimExecutor::new(0xC0FFEE);
    executor.garbled_exchange_jobs.push((0, 1));
    let mut replicas = build_replicas(&config).unwrap();
    let mut orchestrator =
        CycleOrchestrator::new(executor, SimKernel, Box::new(SingleGroup), config);
    let report = orchestrator.run(&mut replicas).unwrap();
    assert_eq!(report.cycles_completed, 3);
    assert!(report.degraded_jobs >= 1);
    assert_eq!(report.history.recorded_cycles(Axis::Temperature), 3);
}

#[test]
fn two_dimensional_run_keeps_both_axes_partitioned() {
    let config = RunConfig {
        cycles: 4,
        ladder: LadderConfig {
            rungs: 2,
            base_temperature: 300.0,
            policy: LadderPolicy::Manual {
                temperatures: vec![300.0, 315.0],
            },
        },
        secondary: Some(SecondaryConfig {
            values: vec![0.5, 1.0],
            aux_files: Vec::new(),
        }),
        seed_policy: SeedPolicy {
            master_seed: 0xD00D,
            label: None,
        },
        barrier: BarrierConfig::default(),
        output: OutputConfig::default(),
    };
    let mut replicas = build_replicas(&config).unwrap();
    let mut orchestrator = CycleOrchestrator::new(
        SimExecutor::new(0xD00D),
        SimKernel,
        Box::new(ValuePartition),
        config,
    );
    let report = orchestrator.run(&mut replicas).unwrap();
    assert_eq!(report.history.recorded_cycles(Axis::Temperature), 4);
    assert_eq!(report.history.recorded_cycles(Axis::Secondary), 4);

    let mut temps: Vec<f64> = replicas
        .iter()
        .map(|r| r.parameter(Axis::Temperature).unwrap())
        .collect();
    temps.sort_by(f64::total_cmp);
    assert_eq!(temps, vec![300.0, 300.0, 315.0, 315.0]);

    let mut salts: Vec<f64> = replicas
        .iter()
        .map(|r| r.parameter(Axis::Secondary).unwrap())
        .collect();
    salts.sort_by(f64::total_cmp);
    assert_eq!(salts, vec![0.5, 0.5, 1.0, 1.0]);
}

#[test]
fn history_is_persisted_per_cycle_when_run_directory_is_set() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_1d(3);
    config.output.run_directory = Some(dir.path().to_path_buf());
    let history_path = dir.path().join(&config.output.history_file);

    let mut replicas = build_replicas(&config).unwrap();
    let mut orchestrator = CycleOrchestrator::new(
        SimExecutor::new(0xC0FFEE),
        SimKernel,
        Box::new(SingleGroup),
        config,
    );
    let report = orchestrator.run(&mut replicas).unwrap();

    let loaded = repex_exchange::ExchangeHistory::load(&history_path).unwrap();
    assert_eq!(loaded, report.history);
}

/// Executor whose submissions always fail: the resource-acquisition fault
/// from the fatal family.
struct DeadExecutor;

impl JobExecutor for DeadExecutor {
    fn submit(&mut self, _spec: JobSpec) -> Result<JobHandle, RepexError> {
        Err(RepexError::Job(repex_core::ErrorInfo::new(
            "submit-failed",
            "pilot unreachable",
        )))
    }

    fn wait_all(
        &mut self,
        _handles: &[JobHandle],
        _timeout: Option<Duration>,
    ) -> Result<Vec<JobResult>, RepexError> {
        unreachable!("no job is ever submitted")
    }
}

#[test]
fn submit_failure_aborts_the_run() {
    let config = config_1d(3);
    let mut replicas = build_replicas(&config).unwrap();
    let mut orchestrator =
        CycleOrchestrator::new(DeadExecutor, SimKernel, Box::new(SingleGroup), config);
    let err = orchestrator.run(&mut replicas).unwrap_err();
    assert_eq!(err.info().code, "submit-failed");
}
