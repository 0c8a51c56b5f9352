//! In-process execution harness.
//!
//! Stands in for a remote pilot: every job runs synchronously inside
//! `wait_all`, and exchange jobs emit the same single-line column record a
//! real remote energy worker would print on stdout. Potentials are synthetic
//! but deterministic, derived from the master seed per (replica, cycle), so
//! whole runs replay bit-identically.

use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;

use repex_core::{Axis, Replica, RepexError, RngHandle};
use repex_exchange::column::MatrixColumn;
use repex_exchange::energy::reduced_energy;
use repex_exchange::orchestrator::{
    JobExecutor, JobHandle, JobResult, JobSpec, JobStatus, Stage,
};
use repex_exchange::determinism;

/// Executor that runs every job in-process.
#[derive(Default)]
pub struct LocalExecutor {
    next_handle: u64,
    pending: HashMap<JobHandle, JobSpec>,
}

impl JobExecutor for LocalExecutor {
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
            let spec = self.pending.remove(handle).ok_or_else(|| {
                RepexError::Job(
                    repex_core::ErrorInfo::new("handle-unknown", "wait on an unsubmitted job")
                        .with_context("handle", handle.0.to_string()),
                )
            })?;
            results.push(execute(&spec)?);
        }
        Ok(results)
    }
}

fn execute(spec: &JobSpec) -> Result<JobResult, RepexError> {
    let id = spec.replica_id;
    let cycle: usize = parse_argument(spec, 1)?;
    let working_directory = format!("replica-{id:04}-cycle-{cycle:04}");
    let stdout = match spec.stage {
        Stage::Md => String::new(),
        Stage::Exchange => {
            let potential: f64 = parse_argument(spec, 2)?;
            let temperatures: Vec<f64> = argument(spec, 3)?
                .split(',')
                .map(|token| token.parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|err| malformed_spec(spec, &err))?;
            let column = MatrixColumn {
                replica_id: id,
                energies: temperatures
                    .iter()
                    .map(|&t| reduced_energy(t, potential))
                    .collect(),
                provenance: working_directory.clone(),
            };
            column.render()
        }
    };
    Ok(JobResult {
        status: JobStatus::Done,
        stdout,
        working_directory,
    })
}

fn argument(spec: &JobSpec, position: usize) -> Result<&str, RepexError> {
    spec.arguments
        .get(position)
        .map(String::as_str)
        .ok_or_else(|| {
            RepexError::Job(
                repex_core::ErrorInfo::new("spec-malformed", "job spec missing an argument")
                    .with_context("position", position.to_string()),
            )
        })
}

fn parse_argument<T: std::str::FromStr>(spec: &JobSpec, position: usize) -> Result<T, RepexError>
where
    T::Err: Error,
{
    argument(spec, position)?
        .parse()
        .map_err(|err: T::Err| malformed_spec(spec, &err))
}

fn malformed_spec(spec: &JobSpec, err: &dyn Error) -> RepexError {
    RepexError::Job(
        repex_core::ErrorInfo::new("spec-malformed", err.to_string())
            .with_context("replica", spec.replica_id.to_string()),
    )
}

/// Kernel producing job specs for the in-process executor.
///
/// The synthetic potential is a draw around a temperature-dependent mean, so
/// adjacent rungs overlap enough for exchanges to actually occur while
/// distant rungs stay effectively frozen, the shape a short solvated peptide
/// run produces.
pub struct LocalKernel {
    master_seed: u64,
}

impl LocalKernel {
    /// Creates a kernel whose potentials derive from the given master seed.
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    fn potential(&self, replica: &Replica, cycle: usize) -> f64 {
        let mut rng = RngHandle::from_seed(determinism::potential_seed(
            self.master_seed,
            replica.id().as_raw(),
            cycle,
        ));
        let temperature = replica.parameter(Axis::Temperature).unwrap_or(300.0);
        -250.0 + 0.12 * temperature + 18.0 * rng.uniform()
    }
}

impl repex_exchange::orchestrator::MdKernel for LocalKernel {
    fn prepare_md_job(
        &self,
        replica: &Replica,
        _axis: Axis,
        cycle: usize,
    ) -> Result<JobSpec, RepexError> {
        Ok(JobSpec {
            executable: "repex-md".to_string(),
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
            .map(|member| {
                member
                    .parameter(Axis::Temperature)
                    .unwrap_or(300.0)
                    .to_string()
            })
            .collect();
        Ok(JobSpec {
            executable: "repex-column".to_string(),
            arguments: vec![
                replica.id().as_raw().to_string(),
                cycle.to_string(),
                self.potential(replica, cycle).to_string(),
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
