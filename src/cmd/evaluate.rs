use crate::reports;
use clap::Args;
use lineforge::api::{parse_stations, LineBalancer};
use lineforge::config::Config;
use lineforge::error::LbResult;
use lineforge::optimizer::LocalSearchMode;

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub config: Config,

    /// Stations separated by '|', tasks by ',' (e.g. "1,3,2,6|5,4,7|8,9").
    #[arg(short = 's', long)]
    pub stations: String,

    /// Run a local search around the given line.
    #[arg(long)]
    pub improve: Option<LocalSearchMode>,

    /// Write the improved results as JSON.
    #[arg(short = 'e', long)]
    pub export: Option<String>,
}

pub fn run(args: &EvaluateArgs, balancer: &LineBalancer, config: &Config) -> LbResult<()> {
    let stations = parse_stations(&args.stations)?;
    let cycle_time = balancer.resolve_cycle_time(config);

    println!("\n🔎 === LINE AUDIT === 🔎");
    let metrics = balancer.metrics(stations.clone(), cycle_time)?;
    reports::print_metrics_table(&[("given".to_string(), &metrics)]);

    if let Some(mode) = args.improve {
        println!("\n🔧 Local search ({})", mode);
        let report = balancer.improve(stations, cycle_time, mode, config)?;
        reports::print_report(&report);
        if let Some(path) = &args.export {
            report.save_json(path)?;
            println!("💾 Results exported to {}", path);
        }
    }
    Ok(())
}
