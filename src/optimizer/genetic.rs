use super::crossover::region_crossover;
use super::initialization::random_order;
use super::local_search::{improve, LocalSearchMode, LocalSearchOptions};
use super::mutation::region_mutation;
use super::{seeded_rng, sub_seeds, Budget, SelectionWeighting, Skip};
use crate::config::Config;
use crate::consts::*;
use crate::decoder::{decode_trusted, StationAssignment};
use crate::error::{LbResult, LineError};
use crate::graph::{TaskGraph, TaskId, Time};
use crate::heuristics::Heuristic;
use crate::pool::{Candidate, CandidatePool, OutLimit, Quality};
use fastrand::Rng;
use rayon::prelude::*;
use std::time::Duration;
use strum::IntoEnumIterator;
use tracing::{debug, info, trace, warn};

/// A chromosome the genetic search can evolve.
pub trait Genome: Clone + Send + Sync + Sized {
    /// Orders built by the deterministic rules, used to seed the population.
    fn constructive(graph: &TaskGraph, cycle_time: Time) -> LbResult<Vec<Self>>;

    fn random(graph: &TaskGraph, weighting: SelectionWeighting, rng: &mut Rng) -> Self;

    fn decode(&self, graph: &TaskGraph, cycle_time: Time) -> LbResult<StationAssignment>;

    fn crossover(&self, other: &Self, graph: &TaskGraph, rng: &mut Rng) -> (Self, Self);

    fn mutate(&mut self, graph: &TaskGraph, rng: &mut Rng) -> Result<(), Skip>;

    /// Whether `polish` does anything for this genome.
    const POLISHES: bool = false;

    /// Optional refinement of a freshly bred child.
    fn polish(
        self,
        _graph: &TaskGraph,
        _cycle_time: Time,
        _mode: LocalSearchMode,
        _seed: u64,
    ) -> LbResult<Self> {
        Ok(self)
    }
}

/// Straight-line chromosome: a precedence-feasible task order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chromosome(pub Vec<TaskId>);

impl Genome for Chromosome {
    const POLISHES: bool = true;

    fn constructive(graph: &TaskGraph, cycle_time: Time) -> LbResult<Vec<Self>> {
        Heuristic::iter()
            .map(|rule| rule.order(graph, cycle_time).map(Chromosome))
            .collect()
    }

    fn random(graph: &TaskGraph, weighting: SelectionWeighting, rng: &mut Rng) -> Self {
        Chromosome(random_order(graph, weighting, rng))
    }

    fn decode(&self, graph: &TaskGraph, cycle_time: Time) -> LbResult<StationAssignment> {
        Ok(decode_trusted(graph, &self.0, cycle_time))
    }

    fn crossover(&self, other: &Self, graph: &TaskGraph, rng: &mut Rng) -> (Self, Self) {
        let (a, b) = region_crossover(graph, &self.0, &other.0, rng);
        (Chromosome(a), Chromosome(b))
    }

    fn mutate(&mut self, graph: &TaskGraph, rng: &mut Rng) -> Result<(), Skip> {
        region_mutation(graph, &mut self.0, rng).map(|_| ())
    }

    fn polish(
        self,
        graph: &TaskGraph,
        cycle_time: Time,
        mode: LocalSearchMode,
        seed: u64,
    ) -> LbResult<Self> {
        let assignment = decode_trusted(graph, &self.0, cycle_time);
        let options = LocalSearchOptions {
            seed: Some(seed),
            ..LocalSearchOptions::new(mode)
        };
        let pool = improve(graph, &assignment, cycle_time, &options)?;
        Ok(match pool.best() {
            Some(best) => Chromosome(best.assignment.order()),
            None => self,
        })
    }
}

/// A trait for receiving updates during the genetic search.
/// Returning false stops the run after the current generation.
pub trait ProgressCallback: Send + Sync {
    fn on_generation(&self, generation: usize, best: &Quality) -> bool;
}

/// Ignores progress and never stops the run.
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_generation(&self, _generation: usize, _best: &Quality) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct GeneticOptions {
    pub generations: usize,
    pub population: usize,
    pub p_mutation: f64,
    pub p_crossover: f64,
    pub elites: usize,
    pub tournament: usize,
    pub weighting: SelectionWeighting,
    pub out: OutLimit,
    pub local_search: Option<LocalSearchMode>,
    pub seed: Option<u64>,
    pub max_time: Option<Duration>,
}

impl Default for GeneticOptions {
    fn default() -> Self {
        Self {
            generations: DEFAULT_GENERATIONS,
            population: DEFAULT_POPULATION,
            p_mutation: DEFAULT_P_MUTATION,
            p_crossover: DEFAULT_P_CROSSOVER,
            elites: DEFAULT_ELITES,
            tournament: DEFAULT_TOURNAMENT,
            weighting: SelectionWeighting::default(),
            out: OutLimit::default(),
            local_search: None,
            seed: None,
            max_time: None,
        }
    }
}

impl From<&Config> for GeneticOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            generations: cfg.genetic.generation,
            population: cfg.genetic.size,
            p_mutation: cfg.genetic.p_m,
            p_crossover: cfg.genetic.p_c,
            elites: cfg.genetic.elites,
            tournament: cfg.genetic.tournament,
            weighting: cfg.search.weighting,
            out: cfg.search.out,
            local_search: cfg.search.local_search,
            seed: cfg.search.seed,
            max_time: cfg.search.time_limit.map(Duration::from_secs),
        }
    }
}

impl GeneticOptions {
    pub fn validate(&self) -> LbResult<()> {
        for (name, p) in [("p_m", self.p_mutation), ("p_c", self.p_crossover)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(LineError::Config(format!(
                    "{} must lie in [0, 1], got {}",
                    name, p
                )));
            }
        }
        if self.population == 0 {
            return Err(LineError::Config("population size must be positive".into()));
        }
        Ok(())
    }
}

struct Individual<G> {
    genome: G,
    candidate: Candidate,
}

pub struct GeneticOptimizer<'g, G: Genome> {
    graph: &'g TaskGraph,
    cycle_time: Time,
    options: GeneticOptions,
    seeds: Vec<G>,
}

impl<'g, G: Genome> GeneticOptimizer<'g, G> {
    pub fn new(graph: &'g TaskGraph, cycle_time: Time, options: GeneticOptions) -> Self {
        Self {
            graph,
            cycle_time,
            options,
            seeds: Vec::new(),
        }
    }

    /// Chromosomes placed in the first population ahead of the constructive ones.
    pub fn with_seeds(mut self, seeds: Vec<G>) -> Self {
        self.seeds = seeds;
        self
    }

    /// Evolves the population and returns the best distinct assignments
    /// seen over all generations.
    pub fn run<CB: ProgressCallback>(&self, callback: CB) -> LbResult<CandidatePool> {
        let opts = &self.options;
        opts.validate()?;
        self.graph.check_cycle_time(self.cycle_time)?;

        if let (Some(mode), false) = (opts.local_search, G::POLISHES) {
            warn!(%mode, "local search mode not available for this chromosome, skipped");
        }

        let mut master = seeded_rng(opts.seed);
        let budget = Budget::new(opts.max_time);
        info!(
            generations = opts.generations,
            population = opts.population,
            p_m = opts.p_mutation,
            p_c = opts.p_crossover,
            "genetic search started"
        );

        // 1. Seed: caller chromosomes, rule-built orders, then random fill
        let mut genomes: Vec<G> = self.seeds.clone();
        genomes.extend(G::constructive(self.graph, self.cycle_time)?);
        genomes.truncate(opts.population);
        let fill = sub_seeds(&mut master, opts.population - genomes.len());
        genomes.extend(
            fill.par_iter()
                .map(|&s| G::random(self.graph, opts.weighting, &mut Rng::with_seed(s)))
                .collect::<Vec<_>>(),
        );

        let mut population = self.evaluate(genomes)?;
        let mut archive = CandidatePool::new(opts.out);
        archive.extend(population.iter().map(|ind| ind.candidate.clone()));

        // 2. Generations
        let elites = opts.elites.min(opts.population);
        let needed = opts.population - elites;
        for generation in 1..=opts.generations {
            if budget.exhausted() {
                warn!(generation, "time budget exhausted, stopping genetic search");
                break;
            }

            let pair_seeds = sub_seeds(&mut master, needed.div_ceil(2));
            let pairs = pair_seeds
                .par_iter()
                .map(|&s| self.breed(&population, s))
                .collect::<LbResult<Vec<(G, G)>>>()?;
            let offspring: Vec<G> = pairs
                .into_iter()
                .flat_map(|(a, b)| [a, b])
                .take(needed)
                .collect();

            let children = self.evaluate(offspring)?;
            archive.extend(children.iter().map(|ind| ind.candidate.clone()));

            population.truncate(elites);
            population.extend(children);
            sort_population(&mut population);

            let best = population[0].candidate.quality;
            if generation % LOG_EVERY_GENERATIONS == 0 || generation == opts.generations {
                debug!(generation, best = %best, "generation complete");
            }
            if !callback.on_generation(generation, &best) {
                info!(generation, "genetic search stopped by callback");
                break;
            }
        }

        if let Some(best) = archive.best() {
            info!(best = %best.quality, kept = archive.len(), "genetic search finished");
        }
        Ok(archive)
    }

    fn evaluate(&self, genomes: Vec<G>) -> LbResult<Vec<Individual<G>>> {
        let mut scored = genomes
            .into_par_iter()
            .map(|genome| {
                let assignment = genome.decode(self.graph, self.cycle_time)?;
                Ok(Individual {
                    candidate: Candidate::new(self.graph, assignment),
                    genome,
                })
            })
            .collect::<LbResult<Vec<_>>>()?;
        sort_population(&mut scored);
        Ok(scored)
    }

    fn breed(&self, population: &[Individual<G>], seed: u64) -> LbResult<(G, G)> {
        let opts = &self.options;
        let mut rng = Rng::with_seed(seed);

        let a = tournament(population, opts.tournament, &mut rng);
        let b = tournament(population, opts.tournament, &mut rng);

        let (mut x, mut y) = if population.len() < 2 {
            trace!(skip = ?Skip::EmptyPopulation, "crossover skipped");
            (a.clone(), b.clone())
        } else if rng.f64() < opts.p_crossover {
            a.crossover(b, self.graph, &mut rng)
        } else {
            (a.clone(), b.clone())
        };

        for child in [&mut x, &mut y] {
            if rng.f64() < opts.p_mutation {
                if let Err(skip) = child.mutate(self.graph, &mut rng) {
                    trace!(?skip, "mutation skipped");
                }
            }
        }

        if let (Some(mode), true) = (opts.local_search, G::POLISHES) {
            x = x.polish(self.graph, self.cycle_time, mode, rng.u64(..))?;
            y = y.polish(self.graph, self.cycle_time, mode, rng.u64(..))?;
        }
        Ok((x, y))
    }
}

fn sort_population<G>(population: &mut [Individual<G>]) {
    population.sort_by(|a, b| {
        a.candidate
            .quality
            .rank_cmp(&b.candidate.quality)
            .then_with(|| {
                a.candidate
                    .assignment
                    .stations
                    .cmp(&b.candidate.assignment.stations)
            })
    });
}

/// Best of `size` distinct contestants. The population is sorted, so the
/// smallest drawn index wins.
fn tournament<'a, G>(population: &'a [Individual<G>], size: usize, rng: &mut Rng) -> &'a G {
    let size = size.clamp(1, population.len());
    let mut drawn: Vec<usize> = Vec::with_capacity(size);
    while drawn.len() < size {
        let i = rng.usize(..population.len());
        if !drawn.contains(&i) {
            drawn.push(i);
        }
    }
    let winner = drawn.into_iter().min().unwrap_or(0);
    &population[winner].genome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;

    fn graph() -> TaskGraph {
        TaskGraph::build(&[
            Task::new(1, &[], 3.0),
            Task::new(2, &[1], 4.0),
            Task::new(3, &[1], 2.0),
            Task::new(4, &[2], 3.0),
            Task::new(5, &[3], 4.0),
            Task::new(6, &[2, 3], 3.0),
            Task::new(7, &[4, 5], 3.0),
            Task::new(8, &[6], 4.0),
            Task::new(9, &[7, 8], 3.0),
        ])
        .unwrap()
    }

    struct StopAfter(usize);

    impl ProgressCallback for StopAfter {
        fn on_generation(&self, generation: usize, _best: &Quality) -> bool {
            generation < self.0
        }
    }

    #[test]
    fn never_worse_than_the_constructive_seeds() {
        let g = graph();
        let options = GeneticOptions {
            generations: 10,
            population: 12,
            seed: Some(5),
            ..Default::default()
        };
        let pool = GeneticOptimizer::<Chromosome>::new(&g, 12.0, options)
            .run(SilentProgress)
            .unwrap();
        let best = pool.best().unwrap().quality;
        for rule in Heuristic::iter() {
            let seed = Candidate::new(&g, rule.balance(&g, 12.0).unwrap());
            assert!(best.is_no_worse_than(&seed.quality));
        }
    }

    #[test]
    fn callback_can_stop_the_run() {
        let g = graph();
        let options = GeneticOptions {
            generations: 1_000,
            population: 6,
            seed: Some(1),
            ..Default::default()
        };
        let pool = GeneticOptimizer::<Chromosome>::new(&g, 12.0, options)
            .run(StopAfter(2))
            .unwrap();
        assert!(!pool.is_empty());
    }

    #[test]
    fn rejects_probabilities_outside_unit_interval() {
        let g = graph();
        let options = GeneticOptions {
            p_mutation: 1.5,
            ..Default::default()
        };
        let err = GeneticOptimizer::<Chromosome>::new(&g, 12.0, options)
            .run(SilentProgress)
            .unwrap_err();
        assert!(matches!(err, LineError::Config(_)));
    }

    #[test]
    fn tournament_of_whole_population_picks_the_best() {
        let g = graph();
        let mut population: Vec<Individual<Chromosome>> = [vec![1, 2, 3, 4, 5, 6, 7, 8, 9]]
            .into_iter()
            .map(|o| Individual {
                candidate: Candidate::new(&g, decode_trusted(&g, &o, 12.0)),
                genome: Chromosome(o),
            })
            .collect();
        population.push(Individual {
            candidate: Candidate::new(&g, decode_trusted(&g, &[1, 3, 2, 5, 4, 6, 7, 8, 9], 12.0)),
            genome: Chromosome(vec![1, 3, 2, 5, 4, 6, 7, 8, 9]),
        });
        sort_population(&mut population);
        let mut rng = Rng::with_seed(9);
        let winner = tournament(&population, 2, &mut rng);
        assert_eq!(winner, &population[0].genome);
    }
}
