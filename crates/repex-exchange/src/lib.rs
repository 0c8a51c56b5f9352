#![deny(missing_docs)]

//! Replica-exchange cycle coordinator.
//!
//! An ensemble of independent MD replicas periodically pauses at a global
//! barrier to probabilistically swap thermodynamic parameters. This crate
//! holds the coordination core: the barrier-synchronized cycle loop, the
//! swap-matrix composer, Gibbs-sampling partner selection, per-axis grouping
//! for the two-dimensional variant, and the append-only exchange history.
//! Job execution and MD integration are external collaborators consumed
//! through the traits in [`orchestrator`].

/// Rank-based collective variant of the exchange-energy step.
pub mod collective;
/// Wire format for per-replica swap-matrix columns.
pub mod column;
/// YAML configuration schema and ensemble construction.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Reduced-energy helpers.
pub mod energy;
/// Gibbs partner selection and the parameter swap.
pub mod gibbs;
/// Exchange-group partitioning strategies.
pub mod grouping;
/// Append-only exchange history tables.
pub mod history;
/// Temperature ladder construction.
pub mod ladder;
/// Run manifest serialization helpers.
pub mod manifest;
/// Dense swap matrix and the column composer.
pub mod matrix;
/// Cycle orchestrator and collaborator contracts.
pub mod orchestrator;
/// Pairs-for-exchange boundary format.
pub mod pairs;

pub use config::{build_replicas, LadderConfig, LadderPolicy, RunConfig, SecondaryConfig, SeedPolicy};
pub use grouping::{GroupingStrategy, SingleGroup, ValuePartition};
pub use history::{ExchangeHistory, NO_EXCHANGE};
pub use matrix::{compose, SwapMatrix};
pub use orchestrator::{
    CycleOrchestrator, JobExecutor, JobHandle, JobResult, JobSpec, JobStatus, MdKernel, RunReport,
    Stage, StageTiming,
};
