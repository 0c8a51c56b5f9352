use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use repex_exchange::config::RunConfig;
use repex_exchange::manifest::RunManifest;
use repex_exchange::orchestrator::{CycleOrchestrator, StageTiming};
use repex_exchange::{build_replicas, GroupingStrategy, SingleGroup, ValuePartition};
use serde_json::json;
use tracing::info;

use crate::harness::{LocalExecutor, LocalKernel};
use crate::write_json;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML configuration describing the exchange run.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for run artefacts.
    #[arg(long)]
    pub out: PathBuf,
    /// Override the configured master seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let contents = fs::read_to_string(&args.config)?;
    let mut config: RunConfig = serde_yaml::from_str(&contents)?;
    config.output.run_directory = Some(args.out.clone());
    if let Some(seed) = args.seed {
        config.seed_policy.master_seed = seed;
    }

    let mut replicas = build_replicas(&config)?;
    info!(
        replicas = replicas.len(),
        cycles = config.cycles,
        axes = config.axes().len(),
        "starting exchange run"
    );

    let grouping: Box<dyn GroupingStrategy> = if config.secondary.is_some() {
        Box::new(ValuePartition)
    } else {
        Box::new(SingleGroup)
    };
    let kernel = LocalKernel::new(config.seed_policy.master_seed);
    let mut orchestrator =
        CycleOrchestrator::new(LocalExecutor::default(), kernel, grouping, config.clone());
    let report = orchestrator.run(&mut replicas)?;

    write_profile(&args.out.join(&config.output.profile_file), &report.timings)?;

    let manifest = RunManifest {
        written_at: RunManifest::timestamp_now(),
        master_seed: config.seed_policy.master_seed,
        seed_label: config.seed_policy.label.clone(),
        cycles_completed: report.cycles_completed,
        exchanges_performed: report.exchanges_performed,
        history_file: Some(config.output.history_file.clone()),
        profile_file: Some(config.output.profile_file.clone()),
        config: config.clone(),
    };
    manifest.write(&args.out.join(&config.output.manifest_file))?;

    let summary = json!({
        "cycles_completed": report.cycles_completed,
        "exchanges_performed": report.exchanges_performed,
        "degraded_jobs": report.degraded_jobs,
        "final_temperatures": replicas
            .iter()
            .map(|r| r.parameter(repex_core::Axis::Temperature))
            .collect::<Vec<_>>(),
    });
    write_json(args.out.join("summary.json"), &summary)?;

    // Persist the run configuration for reproducibility.
    fs::copy(&args.config, args.out.join("config.yaml")).ok();

    info!(
        cycles = report.cycles_completed,
        exchanges = report.exchanges_performed,
        degraded = report.degraded_jobs,
        "run complete"
    );
    Ok(())
}

/// Writes stage timings as CSV, one row per barrier-to-barrier interval.
fn write_profile(path: &std::path::Path, timings: &[StageTiming]) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["cycle", "axis", "stage", "seconds"])?;
    for timing in timings {
        writer.write_record([
            timing.cycle.to_string(),
            timing.axis.as_str().to_string(),
            timing.stage.as_str().to_string(),
            format!("{:.6}", timing.seconds),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
