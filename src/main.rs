use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use lineforge::api::LineBalancer;
use lineforge::config::Config;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Assembly line balancing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Task list (.csv, otherwise JSON).
    #[arg(global = true, short = 't', long, default_value = "data/tasks.json")]
    tasks: String,

    /// JSON file with base settings; command-line values override it.
    #[arg(global = true, long)]
    config_file: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Balance the line with the configured method.
    Balance(cmd::balance::BalanceArgs),
    /// Balance the line with the genetic algorithm.
    Genetic(cmd::genetic::GeneticArgs),
    /// Measure (and optionally improve) a hand-written line.
    Evaluate(cmd::evaluate::EvaluateArgs),
    /// Show the task graph, its articulation points and regions.
    Inspect(cmd::inspect::InspectArgs),
}

fn resolve_config(base: Option<&str>, cli_config: &Config, sub_matches: &ArgMatches) -> Config {
    match base {
        Some(path) => {
            info!("⚙️  Loading settings from: {}", path);
            let mut config = Config::load_from_file(path).unwrap_or_else(|e| {
                error!("❌ {}", e);
                process::exit(1);
            });
            config.merge_from_cli(cli_config, sub_matches);
            config
        }
        None => cli_config.clone(),
    }
}

fn main() {
    // 1. Parse raw matches (to tell user input from defaults)
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    // 2. Load the task graph
    info!("📂 Loading tasks: {}", cli.tasks);
    let balancer = LineBalancer::from_file(&cli.tasks).unwrap_or_else(|e| {
        error!("❌ {}", e);
        process::exit(1);
    });

    // 3. Settings: file base, explicit CLI values on top
    let (name, cli_config) = match &cli.command {
        Commands::Balance(args) => ("balance", Some(&args.config)),
        Commands::Genetic(args) => ("genetic", Some(&args.config)),
        Commands::Evaluate(args) => ("evaluate", Some(&args.config)),
        Commands::Inspect(_) => ("inspect", None),
    };
    let config = match (cli_config, matches.subcommand_matches(name)) {
        (Some(cfg), Some(sub)) => resolve_config(cli.config_file.as_deref(), cfg, sub),
        _ => {
            if cli.config_file.is_some() {
                warn!("⚠️  --config-file is ignored by '{}'", name);
            }
            Config::default()
        }
    };

    // 4. Execute
    let outcome = match &cli.command {
        Commands::Balance(args) => cmd::balance::run(args, &balancer, &config),
        Commands::Genetic(args) => cmd::genetic::run(args, &balancer, &config),
        Commands::Evaluate(args) => cmd::evaluate::run(args, &balancer, &config),
        Commands::Inspect(_) => cmd::inspect::run(&balancer),
    };

    if let Err(e) = outcome {
        error!("❌ {}", e);
        process::exit(1);
    }
}
