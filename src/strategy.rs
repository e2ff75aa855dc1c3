use crate::config::{Config, Method};
use crate::error::LbResult;
use crate::graph::{TaskGraph, Time};
use crate::heuristics::Heuristic;
use crate::optimizer::{
    comsoal, Chromosome, ComsoalOptions, GeneticOptimizer, GeneticOptions, ProgressCallback,
    SilentProgress,
};
use crate::pool::{Candidate, CandidatePool, OutLimit};
use crate::ushape::{u_comsoal, u_heuristic, UChromosome};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Straight,
    UShaped,
}

impl Layout {
    pub fn from_flag(u_shaped: bool) -> Self {
        if u_shaped {
            Self::UShaped
        } else {
            Self::Straight
        }
    }
}

/// The constructors a line can be balanced with.
#[derive(Debug, Clone)]
pub enum Strategy {
    Heuristic(Heuristic),
    Comsoal(ComsoalOptions),
    Genetic(GeneticOptions),
}

impl Strategy {
    /// The constructor `method` names, configured from `cfg`.
    pub fn from_config(cfg: &Config) -> Self {
        match cfg.search.method {
            Method::Lcr => Self::Heuristic(Heuristic::Lcr),
            Method::Hb => Self::Heuristic(Heuristic::Hb),
            Method::Comsoal => Self::Comsoal(ComsoalOptions::from(cfg)),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Heuristic(rule) => rule.to_string(),
            Self::Comsoal(_) => "comsoal".into(),
            Self::Genetic(_) => "genetic".into(),
        }
    }

    pub fn produce(&self, graph: &TaskGraph, cycle_time: Time, layout: Layout) -> LbResult<CandidatePool> {
        self.produce_with(graph, cycle_time, layout, SilentProgress)
    }

    /// Like `produce`, reporting genetic generations to `callback`.
    pub fn produce_with<CB: ProgressCallback>(
        &self,
        graph: &TaskGraph,
        cycle_time: Time,
        layout: Layout,
        callback: CB,
    ) -> LbResult<CandidatePool> {
        match (self, layout) {
            (Self::Heuristic(rule), Layout::Straight) => {
                single(graph, rule.balance(graph, cycle_time)?)
            }
            (Self::Heuristic(rule), Layout::UShaped) => {
                single(graph, u_heuristic(graph, cycle_time, *rule)?)
            }
            (Self::Comsoal(options), Layout::Straight) => comsoal(graph, cycle_time, options),
            (Self::Comsoal(options), Layout::UShaped) => u_comsoal(graph, cycle_time, options),
            (Self::Genetic(options), Layout::Straight) => {
                GeneticOptimizer::<Chromosome>::new(graph, cycle_time, options.clone()).run(callback)
            }
            (Self::Genetic(options), Layout::UShaped) => {
                GeneticOptimizer::<UChromosome>::new(graph, cycle_time, options.clone()).run(callback)
            }
        }
    }
}

fn single(graph: &TaskGraph, assignment: crate::decoder::StationAssignment) -> LbResult<CandidatePool> {
    let mut pool = CandidatePool::new(OutLimit::Count(1));
    pool.insert(Candidate::new(graph, assignment));
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;

    fn diamond() -> TaskGraph {
        TaskGraph::build(&[
            Task::new(1, &[], 2.0),
            Task::new(2, &[1], 5.0),
            Task::new(3, &[1], 4.0),
            Task::new(4, &[2, 3], 3.0),
        ])
        .unwrap()
    }

    #[test]
    fn method_selects_the_strategy() {
        let mut cfg = Config::default();
        cfg.search.method = Method::Hb;
        assert!(matches!(Strategy::from_config(&cfg), Strategy::Heuristic(Heuristic::Hb)));
        cfg.search.method = Method::Comsoal;
        assert_eq!(Strategy::from_config(&cfg).name(), "comsoal");
    }

    #[test]
    fn every_strategy_produces_a_feasible_line_on_both_layouts() {
        let g = diamond();
        let strategies = [
            Strategy::Heuristic(Heuristic::Lcr),
            Strategy::Comsoal(ComsoalOptions {
                iterations: 20,
                seed: Some(4),
                ..Default::default()
            }),
            Strategy::Genetic(GeneticOptions {
                generations: 5,
                population: 8,
                seed: Some(4),
                ..Default::default()
            }),
        ];
        for strategy in &strategies {
            for layout in [Layout::Straight, Layout::UShaped] {
                let pool = strategy.produce(&g, 6.0, layout).unwrap();
                let best = pool.best().unwrap();
                assert!(best.assignment.verify(&g).is_ok(), "{} {}", strategy.name(), layout);
                assert_eq!(best.assignment.sides.is_some(), layout == Layout::UShaped);
            }
        }
    }
}
