use super::initialization::random_order;
use super::local_search::{improve, LocalSearchMode, LocalSearchOptions};
use super::{seeded_rng, sub_seeds, Budget, SelectionWeighting};
use crate::config::Config;
use crate::consts::DEFAULT_ITERATIONS;
use crate::decoder::decode_trusted;
use crate::error::LbResult;
use crate::graph::{TaskGraph, Time};
use crate::pool::{Candidate, CandidatePool, OutLimit};
use fastrand::Rng;
use rayon::prelude::*;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ComsoalOptions {
    pub iterations: usize,
    pub out: OutLimit,
    pub weighting: SelectionWeighting,
    /// Applied to every trial before it enters the pool.
    pub local_search: Option<LocalSearchMode>,
    pub seed: Option<u64>,
    pub max_time: Option<Duration>,
}

impl Default for ComsoalOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            out: OutLimit::default(),
            weighting: SelectionWeighting::default(),
            local_search: None,
            seed: None,
            max_time: None,
        }
    }
}

impl From<&Config> for ComsoalOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            iterations: cfg.search.iteration,
            out: cfg.search.out,
            weighting: cfg.search.weighting,
            local_search: cfg.search.local_search,
            seed: cfg.search.seed,
            max_time: cfg.search.time_limit.map(Duration::from_secs),
        }
    }
}

/// Randomized multi-start construction.
///
/// Trials are independent: each draws a random feasible order, decodes it
/// and fills its own pool; the pools are merged afterwards. The first trial
/// always runs, later ones are skipped once the time budget is spent.
pub fn comsoal(graph: &TaskGraph, cycle_time: Time, options: &ComsoalOptions) -> LbResult<CandidatePool> {
    graph.check_cycle_time(cycle_time)?;

    let iterations = options.iterations.max(1);
    let seeds = sub_seeds(&mut seeded_rng(options.seed), iterations);
    let budget = Budget::new(options.max_time);
    info!(
        iterations,
        weighting = %options.weighting,
        out = %options.out,
        "COMSOAL started"
    );

    let trials = seeds
        .par_iter()
        .enumerate()
        .map(|(k, &s)| -> LbResult<Option<CandidatePool>> {
            if k > 0 && budget.exhausted() {
                return Ok(None);
            }
            let mut rng = Rng::with_seed(s);
            let order = random_order(graph, options.weighting, &mut rng);
            let assignment = decode_trusted(graph, &order, cycle_time);

            match options.local_search {
                Some(mode) => {
                    let ls = LocalSearchOptions {
                        out: options.out,
                        seed: Some(rng.u64(..)),
                        ..LocalSearchOptions::new(mode)
                    };
                    improve(graph, &assignment, cycle_time, &ls).map(Some)
                }
                None => {
                    let mut pool = CandidatePool::new(options.out);
                    pool.insert(Candidate::new(graph, assignment));
                    Ok(Some(pool))
                }
            }
        })
        .collect::<Vec<_>>();

    let mut pool = CandidatePool::new(options.out);
    let mut skipped = 0usize;
    for trial in trials {
        match trial? {
            Some(found) => pool = pool.merge(found),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "time budget exhausted before all COMSOAL trials ran");
    }
    if let Some(best) = pool.best() {
        info!(best = %best.quality, kept = pool.len(), "COMSOAL finished");
    }
    Ok(pool)
}
