use crate::reports;
use clap::Args;
use lineforge::api::LineBalancer;
use lineforge::config::Config;
use lineforge::error::LbResult;
use std::time::Instant;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct BalanceArgs {
    #[command(flatten)]
    pub config: Config,

    /// Write the ranked results as JSON.
    #[arg(short = 'e', long)]
    pub export: Option<String>,
}

pub fn run(args: &BalanceArgs, balancer: &LineBalancer, config: &Config) -> LbResult<()> {
    let started = Instant::now();
    println!(
        "\n🏭 Balancing {} tasks ({} total work) with {}",
        balancer.graph().len(),
        balancer.graph().total_duration(),
        config.search.method
    );
    if config.line.cycle_time.is_none() {
        println!(
            "⏱️  No cycle time given, using {} rule: {:.2}",
            config.line.cycle_time_rule,
            balancer.resolve_cycle_time(config)
        );
    }

    let report = balancer.balance(config)?;
    reports::print_report(&report);

    if let Some(path) = &args.export {
        report.save_json(path)?;
        println!("💾 Results exported to {}", path);
    }
    info!(elapsed = ?started.elapsed(), "balance finished");
    Ok(())
}
