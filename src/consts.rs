use crate::graph::Time;

/// Slack used when comparing accumulated station loads against the cycle time.
pub const TIME_EPSILON: Time = 1e-9;

/// Cycle time used when no task has a positive duration.
pub const FALLBACK_CYCLE_TIME: Time = 1.0;

// COMSOAL
pub const DEFAULT_ITERATIONS: usize = 100;

// Genetic algorithm
pub const DEFAULT_GENERATIONS: usize = 50;
pub const DEFAULT_POPULATION: usize = 30;
pub const DEFAULT_P_MUTATION: f64 = 0.7;
pub const DEFAULT_P_CROSSOVER: f64 = 0.5;
pub const DEFAULT_ELITES: usize = 2;
pub const DEFAULT_TOURNAMENT: usize = 3;
pub const LOG_EVERY_GENERATIONS: usize = 10;

// Local search budgets
pub const LOCAL_SEARCH_NEIGHBOURS: usize = 30;
pub const LOCAL_SEARCH_MAX_PASSES: usize = 200;
pub const LOCAL_SEARCH_GENERATIONS: usize = 15;
pub const LOCAL_SEARCH_POPULATION: usize = 30;
pub const HEURISTIC_WINDOW_MAX: usize = 8;

#[inline(always)]
pub fn fits(load: Time, duration: Time, cycle_time: Time) -> bool {
    load + duration <= cycle_time + TIME_EPSILON
}
