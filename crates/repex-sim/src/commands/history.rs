use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::Args;
use repex_core::Axis;
use repex_exchange::{ExchangeHistory, NO_EXCHANGE};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Run directory produced by `repex-sim run` (or a history file directly).
    #[arg(long)]
    pub input: PathBuf,
    /// Axis to report.
    #[arg(long, default_value = "temperature")]
    pub axis: String,
    /// Restrict the report to one replica.
    #[arg(long)]
    pub replica: Option<usize>,
}

pub fn run(args: &HistoryArgs) -> Result<(), Box<dyn Error>> {
    let path = if args.input.is_dir() {
        args.input.join("history.json")
    } else {
        args.input.clone()
    };
    let history = ExchangeHistory::load(&path)?;
    let axis = parse_axis(&args.axis)?;

    let replicas: Vec<usize> = match args.replica {
        Some(replica) if replica < history.size() => vec![replica],
        Some(replica) => {
            return Err(format!(
                "replica {replica} out of range for an ensemble of {}",
                history.size()
            )
            .into())
        }
        None => (0..history.size()).collect(),
    };

    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["replica", "cycle", "value", "partner"])?;
    for replica in replicas {
        let trajectory = history
            .trajectory(axis, replica)
            .ok_or_else(|| format!("no {} table in {}", axis.as_str(), path.display()))?;
        for (cycle, value) in trajectory.iter().enumerate() {
            let partner = match history.partner_of(axis, replica, cycle) {
                Some(NO_EXCHANGE) | None => "-".to_string(),
                Some(partner) => partner.to_string(),
            };
            writer.write_record([
                replica.to_string(),
                cycle.to_string(),
                format!("{value:.4}"),
                partner,
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn parse_axis(text: &str) -> Result<Axis, Box<dyn Error>> {
    match text {
        "temperature" => Ok(Axis::Temperature),
        "secondary" => Ok(Axis::Secondary),
        other => Err(format!("unknown axis {other:?} (temperature or secondary)").into()),
    }
}
