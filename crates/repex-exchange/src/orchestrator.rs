//! Barrier-synchronized MD / exchange cycle loop.
//!
//! The orchestrator owns the only mutable view of the replica set and the
//! history tables; all remote concurrency belongs to the job-execution
//! collaborator, which it treats as an opaque submit/wait interface. Per
//! axis per cycle there are two global barriers: after MD submission and
//! after exchange-energy submission. No replica advances past a barrier
//! until every replica's job for that stage has reported a terminal state.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use repex_core::errors::ErrorInfo;
use repex_core::{Axis, Replica, RepexError};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::column::MatrixColumn;
use crate::config::RunConfig;
use crate::determinism;
use crate::gibbs;
use crate::grouping::GroupingStrategy;
use crate::history::ExchangeHistory;
use crate::matrix;

/// Terminal state of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Job finished and produced output.
    Done,
    /// Job failed or timed out past the stage barrier.
    Failed,
}

/// Coordinator stage a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// An MD segment for one replica.
    Md,
    /// A decentralized exchange-energy (column) computation.
    Exchange,
}

impl Stage {
    /// Stable textual name used in logs and the execution profile.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Md => "md",
            Stage::Exchange => "exchange",
        }
    }
}

/// Description of one job handed to the execution collaborator. The
/// coordinator never inspects resource-allocation details beyond this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Executable to launch on the target resource.
    pub executable: String,
    /// Command-line arguments.
    pub arguments: Vec<String>,
    /// Cores requested for the job.
    pub cores: usize,
    /// Files staged into the job sandbox before launch.
    pub input_staging: Vec<String>,
    /// Files staged back out after completion.
    pub output_staging: Vec<String>,
    /// Stage the job belongs to.
    pub stage: Stage,
    /// Replica the job computes for.
    pub replica_id: usize,
}

/// Opaque handle for a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub u64);

/// Terminal result reported for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Terminal status.
    pub status: JobStatus,
    /// Standard output payload (the column record for exchange jobs).
    pub stdout: String,
    /// Working-directory / provenance reference of the job sandbox.
    pub working_directory: String,
}

/// Job-execution collaborator contract. Implementations own all remote
/// concurrency; `wait_all` is the barrier and must return one result per
/// handle, substituting `Failed` for jobs that never reached a terminal
/// state within the timeout.
pub trait JobExecutor {
    /// Submits a job; an error here is fatal (nothing can run).
    fn submit(&mut self, spec: JobSpec) -> Result<JobHandle, RepexError>;

    /// Blocks until every handle has a terminal result.
    fn wait_all(
        &mut self,
        handles: &[JobHandle],
        timeout: Option<Duration>,
    ) -> Result<Vec<JobResult>, RepexError>;
}

/// MD-kernel collaborator contract: builds job specs for both stages.
/// Partner selection is always performed centrally by the orchestrator, even
/// when energy computation is decentralized.
pub trait MdKernel {
    /// Job spec for one replica's MD segment on an axis.
    fn prepare_md_job(&self, replica: &Replica, axis: Axis, cycle: usize)
        -> Result<JobSpec, RepexError>;

    /// Job spec for one replica's swap-matrix column computation. The full
    /// ensemble is provided because the column spans every member's
    /// parameter state.
    fn prepare_exchange_job(
        &self,
        replica: &Replica,
        axis: Axis,
        cycle: usize,
        ensemble: &[Replica],
    ) -> Result<JobSpec, RepexError>;
}

/// Wall-clock duration of one stage, kept for the execution profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    /// Cycle index (0-based).
    pub cycle: usize,
    /// Axis the stage ran on.
    pub axis: Axis,
    /// Stage kind.
    pub stage: Stage,
    /// Barrier-to-barrier duration in seconds.
    pub seconds: f64,
}

/// Summary returned after a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Cycles fully completed.
    pub cycles_completed: usize,
    /// Exchange decisions that resulted in a swap, per axis order of the run.
    pub exchanges_performed: usize,
    /// Jobs that reported failure and were substituted with degraded data.
    pub degraded_jobs: usize,
    /// Exchange history tables.
    pub history: ExchangeHistory,
    /// Stage timings.
    pub timings: Vec<StageTiming>,
}

/// Drives the alternating MD / exchange cycle under the global barrier.
pub struct CycleOrchestrator<E, K> {
    executor: E,
    kernel: K,
    grouping: Box<dyn GroupingStrategy>,
    config: RunConfig,
}

impl<E: JobExecutor, K: MdKernel> CycleOrchestrator<E, K> {
    /// Creates an orchestrator over the given collaborators and run
    /// configuration.
    pub fn new(executor: E, kernel: K, grouping: Box<dyn GroupingStrategy>, config: RunConfig) -> Self {
        Self {
            executor,
            kernel,
            grouping,
            config,
        }
    }

    /// Consumes the orchestrator, returning the executor (useful to inspect
    /// simulated state in tests).
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Runs the full cycle loop over an id-ordered ensemble.
    ///
    /// A run of C cycles performs C MD segments per axis but only C-1
    /// exchange decisions per axis; the final cycle records the untouched
    /// parameters with the no-exchange marker. When a run directory is
    /// configured the history file is rewritten after every cycle so a fatal
    /// abort preserves everything up to the last fully recorded cycle.
    pub fn run(&mut self, replicas: &mut [Replica]) -> Result<RunReport, RepexError> {
        let size = replicas.len();
        if size == 0 {
            return Err(RepexError::Config(ErrorInfo::new(
                "ensemble-empty",
                "cannot run an exchange over zero replicas",
            )));
        }
        for (index, replica) in replicas.iter().enumerate() {
            if replica.id().as_raw() != index {
                return Err(RepexError::Config(
                    ErrorInfo::new("ensemble-order", "replica slice must be ordered by id")
                        .with_context("position", index.to_string())
                        .with_context("id", replica.id().as_raw().to_string()),
                ));
            }
        }

        let axes = self.config.axes();
        let cycles = self.config.cycles;
        let timeout = self
            .config
            .barrier
            .stage_timeout_secs
            .map(Duration::from_secs);
        let master_seed = self.config.seed_policy.master_seed;
        let history_path = self.history_path();

        let mut history = ExchangeHistory::new(size, cycles, &axes);
        let mut timings = Vec::new();
        let mut exchanges_performed = 0;
        let mut degraded_jobs = 0;

        for cycle in 0..cycles {
            info!(cycle, "performing cycle");
            for replica in replicas.iter_mut() {
                replica.begin_cycle();
            }

            for &axis in &axes {
                let md_started = Instant::now();
                let results = self.run_stage(replicas, axis, cycle, Stage::Md, timeout)?;
                timings.push(StageTiming {
                    cycle,
                    axis,
                    stage: Stage::Md,
                    seconds: md_started.elapsed().as_secs_f64(),
                });
                for (replica, result) in replicas.iter().zip(results.iter()) {
                    if result.status == JobStatus::Failed {
                        degraded_jobs += 1;
                        error!(
                            cycle,
                            axis = axis.as_str(),
                            replica = replica.id().as_raw(),
                            "MD job failed; continuing with previous coordinates"
                        );
                    }
                }
                for replica in replicas.iter_mut() {
                    replica.cycle += 1;
                }

                let last_cycle = cycle + 1 == cycles;
                if last_cycle {
                    continue;
                }

                let ex_started = Instant::now();
                let results = self.run_stage(replicas, axis, cycle, Stage::Exchange, timeout)?;
                timings.push(StageTiming {
                    cycle,
                    axis,
                    stage: Stage::Exchange,
                    seconds: ex_started.elapsed().as_secs_f64(),
                });

                let mut columns = Vec::with_capacity(size);
                for (replica, result) in replicas.iter().zip(results.into_iter()) {
                    let id = replica.id().as_raw();
                    if result.status == JobStatus::Failed {
                        degraded_jobs += 1;
                        warn!(
                            cycle,
                            axis = axis.as_str(),
                            replica = id,
                            "exchange job failed; column populated with zeros"
                        );
                        columns.push(MatrixColumn::zeroed(id, size));
                        continue;
                    }
                    match MatrixColumn::parse(&result.stdout, size) {
                        Ok(column) => columns.push(column),
                        Err(err) => {
                            degraded_jobs += 1;
                            warn!(
                                cycle,
                                axis = axis.as_str(),
                                replica = id,
                                error = %err,
                                "unparsable column record; column populated with zeros"
                            );
                            columns.push(MatrixColumn::zeroed(id, size));
                        }
                    }
                }

                info!(cycle, axis = axis.as_str(), "composing swap matrix");
                let swap_matrix = matrix::compose(replicas, columns)?;

                info!(cycle, axis = axis.as_str(), "performing exchange");
                let mut partners: Vec<Option<usize>> = vec![None; size];
                let groups = self.grouping.group_for_axis(axis, replicas);
                for group in groups {
                    let swaps = gibbs::exchange_pass(replicas, &group, &swap_matrix, axis, |i| {
                        determinism::exchange_seed(master_seed, cycle, axis, i)
                    });
                    // swaps can chain through a group; the last write for a
                    // replica's cell wins
                    for &(i, j) in &swaps {
                        partners[i] = Some(j);
                        partners[j] = Some(i);
                    }
                    exchanges_performed += swaps.len();
                }
                history.record(axis, cycle, replicas, &partners)?;
            }

            // final cycle: parameters recorded, no exchange decision
            if cycle + 1 == cycles {
                let no_partners: Vec<Option<usize>> = vec![None; size];
                for &axis in &axes {
                    history.record(axis, cycle, replicas, &no_partners)?;
                }
            }

            if let Some(path) = &history_path {
                history.save(path)?;
            }
        }

        Ok(RunReport {
            cycles_completed: cycles,
            exchanges_performed,
            degraded_jobs,
            history,
            timings,
        })
    }

    fn run_stage(
        &mut self,
        replicas: &[Replica],
        axis: Axis,
        cycle: usize,
        stage: Stage,
        timeout: Option<Duration>,
    ) -> Result<Vec<JobResult>, RepexError> {
        info!(
            cycle,
            axis = axis.as_str(),
            stage = stage.as_str(),
            replicas = replicas.len(),
            "submitting replicas"
        );
        let mut handles = Vec::with_capacity(replicas.len());
        for replica in replicas {
            let spec = match stage {
                Stage::Md => self.kernel.prepare_md_job(replica, axis, cycle)?,
                Stage::Exchange => {
                    self.kernel.prepare_exchange_job(replica, axis, cycle, replicas)?
                }
            };
            handles.push(self.executor.submit(spec)?);
        }
        let results = self.executor.wait_all(&handles, timeout)?;
        if results.len() != handles.len() {
            return Err(RepexError::Job(
                ErrorInfo::new("barrier-short", "executor returned fewer results than handles")
                    .with_context("expected", handles.len().to_string())
                    .with_context("found", results.len().to_string()),
            ));
        }
        Ok(results)
    }

    fn history_path(&self) -> Option<PathBuf> {
        self.config
            .output
            .run_directory
            .as_ref()
            .map(|dir| dir.join(&self.config.output.history_file))
    }
}
