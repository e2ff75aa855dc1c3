use super::UChromosome;
use crate::consts::fits;
use crate::decoder::{decode_u, Side, StationAssignment, UStep};
use crate::error::LbResult;
use crate::graph::{TaskGraph, Time};
use crate::heuristics::Heuristic;
use crate::optimizer::{
    seeded_rng, sub_seeds, Budget, ComsoalOptions, GeneticOptimizer, GeneticOptions,
    LocalSearchMode, SelectionWeighting, SilentProgress,
};
use crate::pool::{Candidate, CandidatePool};
use fastrand::Rng;
use rayon::prelude::*;
use tracing::{info, warn};

/// Commit bookkeeping shared by the U-line constructors.
struct Frontier {
    pending_preds: Vec<usize>,
    pending_succs: Vec<usize>,
    committed: Vec<bool>,
}

impl Frontier {
    fn new(graph: &TaskGraph) -> Self {
        Self {
            pending_preds: (0..graph.len()).map(|i| graph.preds_at(i).len()).collect(),
            pending_succs: (0..graph.len()).map(|i| graph.succs_at(i).len()).collect(),
            committed: vec![false; graph.len()],
        }
    }

    /// Uncommitted tasks open on at least one side, as (index, front, back).
    fn open(&self) -> Vec<(usize, bool, bool)> {
        (0..self.committed.len())
            .filter(|&i| !self.committed[i])
            .map(|i| (i, self.pending_preds[i] == 0, self.pending_succs[i] == 0))
            .filter(|&(_, f, b)| f || b)
            .collect()
    }

    fn commit(&mut self, graph: &TaskGraph, i: usize) {
        self.committed[i] = true;
        for &s in graph.succs_at(i) {
            self.pending_preds[s] -= 1;
        }
        for &p in graph.preds_at(i) {
            self.pending_succs[p] -= 1;
        }
    }
}

fn back_key(rule: Heuristic, graph: &TaskGraph, i: usize) -> Time {
    match rule {
        Heuristic::Lcr => graph.duration_at(i),
        Heuristic::Hb => graph.reverse_weight_at(i),
    }
}

/// Station-oriented priority sequencing from both ends of the line.
///
/// Front-open tasks are keyed by the rule's forward key, back-open tasks by
/// its backward key, and a task open on both sides takes the larger (front
/// on ties). The highest key that fits the open station is committed,
/// ties to the smallest id; when nothing fits a new station is opened.
pub fn u_sequence(graph: &TaskGraph, cycle_time: Time, rule: Heuristic) -> LbResult<Vec<UStep>> {
    graph.check_cycle_time(cycle_time)?;

    let mut frontier = Frontier::new(graph);
    let mut load = 0.0;
    let mut steps = Vec::with_capacity(graph.len());

    while steps.len() < graph.len() {
        let mut open: Vec<(usize, Time, Side)> = frontier
            .open()
            .into_iter()
            .map(|(i, f, b)| {
                let fk = rule.key(graph, i);
                let bk = back_key(rule, graph, i);
                match (f, b) {
                    (true, true) if fk >= bk => (i, fk, Side::Front),
                    (true, true) => (i, bk, Side::Back),
                    (true, false) => (i, fk, Side::Front),
                    _ => (i, bk, Side::Back),
                }
            })
            .collect();
        open.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let slot = match open
            .iter()
            .position(|&(i, _, _)| fits(load, graph.duration_at(i), cycle_time))
        {
            Some(k) => k,
            None => {
                load = 0.0;
                0
            }
        };
        // An acyclic graph always has a task open on some side.
        let Some(&(i, _, side)) = open.get(slot) else {
            break;
        };
        load += graph.duration_at(i);
        frontier.commit(graph, i);
        steps.push(UStep::new(graph.id_at(i), side));
    }
    Ok(steps)
}

/// Balances a U-shaped line with a priority rule.
pub fn u_heuristic(graph: &TaskGraph, cycle_time: Time, rule: Heuristic) -> LbResult<StationAssignment> {
    decode_u(graph, &u_sequence(graph, cycle_time, rule)?, cycle_time)
}

/// A random commit sequence. A task open on both sides goes to a random one.
pub(crate) fn random_steps(graph: &TaskGraph, weighting: SelectionWeighting, rng: &mut Rng) -> Vec<UStep> {
    let mut frontier = Frontier::new(graph);
    let mut steps = Vec::with_capacity(graph.len());

    while steps.len() < graph.len() {
        let open = frontier.open();
        if open.is_empty() {
            break;
        }
        let indices: Vec<usize> = open.iter().map(|&(i, _, _)| i).collect();
        let (i, f, b) = open[weighting.pick(graph, &indices, rng)];
        let side = match (f, b) {
            (true, true) if rng.bool() => Side::Front,
            (true, true) => Side::Back,
            (true, false) => Side::Front,
            _ => Side::Back,
        };
        frontier.commit(graph, i);
        steps.push(UStep::new(graph.id_at(i), side));
    }
    steps
}

/// Randomized multi-start construction on a U-shaped line.
///
/// Only the `genetics` local search carries over to U-lines; it evolves the
/// trial's chromosome with both sides in play. Other modes are skipped.
pub fn u_comsoal(graph: &TaskGraph, cycle_time: Time, options: &ComsoalOptions) -> LbResult<CandidatePool> {
    graph.check_cycle_time(cycle_time)?;

    let iterations = options.iterations.max(1);
    let seeds = sub_seeds(&mut seeded_rng(options.seed), iterations);
    let budget = Budget::new(options.max_time);
    let polish = match options.local_search {
        Some(LocalSearchMode::Genetics) => true,
        Some(mode) => {
            warn!(%mode, "local search mode not available on U-shaped lines, skipped");
            false
        }
        None => false,
    };
    info!(iterations, weighting = %options.weighting, "U-line COMSOAL started");

    let trials = seeds
        .par_iter()
        .enumerate()
        .map(|(k, &s)| -> LbResult<Option<CandidatePool>> {
            if k > 0 && budget.exhausted() {
                return Ok(None);
            }
            let mut rng = Rng::with_seed(s);
            let steps = random_steps(graph, options.weighting, &mut rng);
            let mut pool = CandidatePool::new(options.out);
            pool.insert(Candidate::new(graph, decode_u(graph, &steps, cycle_time)?));

            if polish {
                let ga = GeneticOptions {
                    generations: crate::consts::LOCAL_SEARCH_GENERATIONS,
                    population: crate::consts::LOCAL_SEARCH_POPULATION,
                    out: options.out,
                    seed: Some(rng.u64(..)),
                    ..GeneticOptions::default()
                };
                let found = GeneticOptimizer::new(graph, cycle_time, ga)
                    .with_seeds(vec![UChromosome::from_steps(graph, &steps)])
                    .run(SilentProgress)?;
                pool = pool.merge(found);
            }
            Ok(Some(pool))
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
        warn!(skipped, "time budget exhausted before all U-line trials ran");
    }
    if let Some(best) = pool.best() {
        info!(best = %best.quality, kept = pool.len(), "U-line COMSOAL finished");
    }
    Ok(pool)
}
