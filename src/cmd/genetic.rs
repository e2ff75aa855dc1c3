use crate::reports;
use clap::Args;
use lineforge::api::LineBalancer;
use lineforge::config::Config;
use lineforge::error::LbResult;
use lineforge::optimizer::ProgressCallback;
use lineforge::pool::Quality;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Args, Debug, Clone)]
pub struct GeneticArgs {
    #[command(flatten)]
    pub config: Config,

    /// Write the ranked results as JSON.
    #[arg(short = 'e', long)]
    pub export: Option<String>,

    /// Print progress every N generations.
    #[arg(long, default_value_t = 10)]
    pub report_every: usize,
}

/// Prints a progress line when the best line improves or every
/// `every` generations.
struct ConsoleProgress {
    every: usize,
    started: Instant,
    last: Mutex<Option<Quality>>,
}

impl ProgressCallback for ConsoleProgress {
    fn on_generation(&self, generation: usize, best: &Quality) -> bool {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let improved = last.map_or(true, |q| best.is_better_than(&q));
        if improved {
            println!(
                "   ✨ Gen {:>4}: {} ({:.1}s)",
                generation,
                best,
                self.started.elapsed().as_secs_f32()
            );
        } else if self.every > 0 && generation % self.every == 0 {
            println!("   ⏳ Gen {:>4}: {}", generation, best);
        }
        *last = Some(*best);
        true
    }
}

pub fn run(args: &GeneticArgs, balancer: &LineBalancer, config: &Config) -> LbResult<()> {
    println!(
        "\n🧬 Genetic search: {} generations x {} chromosomes (p_m {}, p_c {})",
        config.genetic.generation, config.genetic.size, config.genetic.p_m, config.genetic.p_c
    );

    let progress = ConsoleProgress {
        every: args.report_every,
        started: Instant::now(),
        last: Mutex::new(None),
    };
    let report = balancer.genetic(config, progress)?;
    reports::print_report(&report);

    if let Some(path) = &args.export {
        report.save_json(path)?;
        println!("💾 Results exported to {}", path);
    }
    Ok(())
}
