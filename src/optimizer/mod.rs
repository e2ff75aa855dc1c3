pub mod comsoal;
pub mod crossover;
pub mod genetic;
pub mod initialization;
pub mod local_search;
pub mod mutation;

pub use self::comsoal::{comsoal, ComsoalOptions};
pub use self::genetic::{
    Chromosome, GeneticOptimizer, GeneticOptions, Genome, ProgressCallback, SilentProgress,
};
pub use self::local_search::{improve, LocalSearchMode, LocalSearchOptions};

use crate::graph::TaskGraph;
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use strum_macros::{Display, EnumIter, EnumString};

/// Operator outcomes that are recovered by skipping the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    EmptyPopulation,
    NoFeasibleRelocation,
}

/// How a randomized constructor weighs the currently available tasks.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SelectionWeighting {
    #[default]
    Uniform,
    /// Proportional to task duration.
    Duration,
    /// Proportional to ranked positional weight.
    PositionalWeight,
}

impl SelectionWeighting {
    /// Index into `candidates` (arena indices) of the drawn task.
    /// All-zero weights fall back to a uniform draw.
    pub(crate) fn pick(&self, graph: &TaskGraph, candidates: &[usize], rng: &mut Rng) -> usize {
        let weight = |i: usize| match self {
            Self::Uniform => 1.0,
            Self::Duration => graph.duration_at(i),
            Self::PositionalWeight => graph.weight_at(i),
        };
        let total: f64 = candidates.iter().map(|&c| weight(c)).sum();
        if total <= 0.0 {
            return rng.usize(..candidates.len());
        }
        let mut ticket = rng.f64() * total;
        for (k, &c) in candidates.iter().enumerate() {
            ticket -= weight(c);
            if ticket < 0.0 {
                return k;
            }
        }
        candidates.len() - 1
    }
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> Rng {
    match seed {
        Some(s) => Rng::with_seed(s),
        None => Rng::new(),
    }
}

/// One seed per unit of work, drawn before fanning out so a seeded run
/// does not depend on thread scheduling.
pub(crate) fn sub_seeds(rng: &mut Rng, count: usize) -> Vec<u64> {
    (0..count).map(|_| rng.u64(..)).collect()
}

/// Cooperative wall-clock budget, checked between units of work.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    start: Instant,
    limit: Option<Duration>,
}

impl Budget {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.limit
            .is_some_and(|limit| self.start.elapsed() >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;

    #[test]
    fn duration_weighting_never_draws_zero_weight_tasks() {
        let g = TaskGraph::build(&[
            Task::new(1, &[], 0.0),
            Task::new(2, &[], 5.0),
        ])
        .unwrap();
        let mut rng = Rng::with_seed(7);
        for _ in 0..200 {
            assert_eq!(SelectionWeighting::Duration.pick(&g, &[0, 1], &mut rng), 1);
        }
    }

    #[test]
    fn zero_budget_is_exhausted_immediately() {
        assert!(Budget::new(Some(Duration::ZERO)).exhausted());
        assert!(!Budget::new(None).exhausted());
    }
}
