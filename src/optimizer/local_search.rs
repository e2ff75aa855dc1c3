use super::genetic::{Chromosome, GeneticOptimizer, GeneticOptions, SilentProgress};
use super::{seeded_rng, sub_seeds, Budget};
use crate::config::Config;
use crate::consts::*;
use crate::decoder::{decode_trusted, Station, StationAssignment};
use crate::error::{LbResult, LineError};
use crate::graph::{TaskGraph, TaskId, Time};
use crate::heuristics::{sequence, Heuristic};
use crate::pool::{Candidate, CandidatePool, OutLimit, Quality};
use fastrand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LocalSearchMode {
    /// Greedy boundary-task moves between adjacent stations.
    Local,
    /// Priority-rule re-sequencing of random sub-windows.
    Heuristic,
    /// A short genetic run seeded with the current order.
    Genetics,
}

#[derive(Debug, Clone)]
pub struct LocalSearchOptions {
    pub mode: LocalSearchMode,
    pub out: OutLimit,
    pub neighbours: usize,
    pub max_passes: usize,
    pub seed: Option<u64>,
    pub max_time: Option<Duration>,
}

impl LocalSearchOptions {
    pub fn new(mode: LocalSearchMode) -> Self {
        Self {
            mode,
            out: OutLimit::default(),
            neighbours: LOCAL_SEARCH_NEIGHBOURS,
            max_passes: LOCAL_SEARCH_MAX_PASSES,
            seed: None,
            max_time: None,
        }
    }

    pub fn from_config(cfg: &Config, mode: LocalSearchMode) -> Self {
        Self {
            out: cfg.search.out,
            seed: cfg.search.seed,
            max_time: cfg.search.time_limit.map(Duration::from_secs),
            ..Self::new(mode)
        }
    }
}

/// Explores feasible reassignments around `assignment`.
///
/// The input itself is always part of the returned pool, so the best entry
/// is never worse than what was passed in.
pub fn improve(
    graph: &TaskGraph,
    assignment: &StationAssignment,
    cycle_time: Time,
    options: &LocalSearchOptions,
) -> LbResult<CandidatePool> {
    if assignment.sides.is_some() {
        return Err(LineError::InvalidSequence(
            "local search works on straight-line assignments".into(),
        ));
    }
    let start = StationAssignment::from_stations(graph, assignment.stations.clone(), cycle_time)?;
    let order = start.order();
    let stations = start.stations.clone();

    let mut pool = CandidatePool::new(options.out);
    let seed = Candidate::new(graph, start);
    let before = seed.quality;
    pool.insert(seed);

    match options.mode {
        LocalSearchMode::Local => {
            let budget = Budget::new(options.max_time);
            pool.extend(boundary_moves(
                graph,
                &stations,
                cycle_time,
                options.max_passes,
                budget,
            ));
        }
        LocalSearchMode::Heuristic => {
            pool.extend(reseed_windows(graph, &order, cycle_time, options));
        }
        LocalSearchMode::Genetics => {
            let ga = GeneticOptions {
                generations: LOCAL_SEARCH_GENERATIONS,
                population: LOCAL_SEARCH_POPULATION,
                out: options.out,
                seed: options.seed,
                max_time: options.max_time,
                ..GeneticOptions::default()
            };
            let found = GeneticOptimizer::new(graph, cycle_time, ga)
                .with_seeds(vec![Chromosome(order)])
                .run(SilentProgress)?;
            pool = pool.merge(found);
        }
    }

    if let Some(best) = pool.best() {
        debug!(mode = %options.mode, before = %before, after = %best.quality, "local search done");
    }
    Ok(pool)
}

fn quality_of(graph: &TaskGraph, stations: &[Station], cycle_time: Time) -> Quality {
    Quality {
        stations: stations.len(),
        efficiency: crate::metrics::line_efficiency(graph, stations, cycle_time),
    }
}

fn to_candidate(graph: &TaskGraph, stations: Vec<Station>, cycle_time: Time) -> Candidate {
    let loads = stations
        .iter()
        .map(|s| crate::metrics::station_time(graph, s))
        .collect();
    Candidate::new(
        graph,
        StationAssignment {
            stations,
            cycle_time,
            loads,
            sides: None,
        },
    )
}

/// Best-improvement hill climbing over boundary moves. Every accepted
/// step is returned.
fn boundary_moves(
    graph: &TaskGraph,
    stations: &[Station],
    cycle_time: Time,
    max_passes: usize,
    budget: Budget,
) -> Vec<Candidate> {
    let mut current = stations.to_vec();
    let mut quality = quality_of(graph, &current, cycle_time);
    let mut accepted = Vec::new();

    for _ in 0..max_passes {
        if budget.exhausted() {
            break;
        }
        let step = neighbours(graph, &current, cycle_time)
            .into_par_iter()
            .map(|s| (quality_of(graph, &s, cycle_time), s))
            .filter(|(q, _)| q.is_better_than(&quality))
            .min_by(|a, b| a.0.rank_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        match step {
            Some((q, s)) => {
                quality = q;
                current = s;
                accepted.push(to_candidate(graph, current.clone(), cycle_time));
            }
            None => break,
        }
    }
    accepted
}

/// All single boundary-task moves to an adjacent station that keep
/// capacity and precedence.
fn neighbours(graph: &TaskGraph, stations: &[Station], cycle_time: Time) -> Vec<Vec<Station>> {
    let loads: Vec<Time> = stations
        .iter()
        .map(|s| crate::metrics::station_time(graph, s))
        .collect();
    let mut moves = Vec::new();

    let depends_on = |later: &[TaskId], task: TaskId| later.iter().any(|&t| graph.is_ancestor(task, t));
    let waits_for = |earlier: &[TaskId], task: TaskId| earlier.iter().any(|&t| graph.is_ancestor(t, task));

    for k in 0..stations.len() {
        let station = &stations[k];
        let (Some(&first), Some(&last)) = (station.first(), station.last()) else {
            continue;
        };

        // Forward: into the front of station k + 1.
        if k + 1 < stations.len() {
            for (task, rest) in [(last, &station[..station.len() - 1]), (first, &station[1..])] {
                let d = graph.duration(task).unwrap_or(0.0);
                let blocked = task == first && depends_on(rest, task);
                if !blocked && fits(loads[k + 1], d, cycle_time) {
                    moves.push(shift(stations, k, task, k + 1, true));
                }
                if first == last {
                    break;
                }
            }
        }

        // Backward: onto the end of station k - 1.
        if k > 0 {
            for (task, rest) in [(first, &station[1..]), (last, &station[..station.len() - 1])] {
                let d = graph.duration(task).unwrap_or(0.0);
                let blocked = task == last && waits_for(rest, task);
                if !blocked && fits(loads[k - 1], d, cycle_time) {
                    moves.push(shift(stations, k, task, k - 1, false));
                }
                if first == last {
                    break;
                }
            }
        }
    }
    moves
}

fn shift(stations: &[Station], from: usize, task: TaskId, to: usize, at_front: bool) -> Vec<Station> {
    let mut next = stations.to_vec();
    next[from].retain(|&t| t != task);
    if at_front {
        next[to].insert(0, task);
    } else {
        next[to].push(task);
    }
    next.retain(|s| !s.is_empty());
    next
}

/// Re-sequences random windows of the order with a priority rule, starting
/// from the load the decoder would carry into the window.
fn reseed_windows(
    graph: &TaskGraph,
    order: &[TaskId],
    cycle_time: Time,
    options: &LocalSearchOptions,
) -> Vec<Candidate> {
    let n = order.len();
    if n < 2 {
        return Vec::new();
    }
    let mut master = seeded_rng(options.seed);
    let seeds = sub_seeds(&mut master, options.neighbours);
    let budget = Budget::new(options.max_time);

    seeds
        .par_iter()
        .filter_map(|&s| {
            if budget.exhausted() {
                return None;
            }
            let mut rng = Rng::with_seed(s);
            let width = rng.usize(2..=HEURISTIC_WINDOW_MAX.min(n));
            let start = rng.usize(0..=n - width);
            let rule = if rng.bool() { Heuristic::Lcr } else { Heuristic::Hb };

            let prefix = &order[..start];
            let open_load = decode_trusted(graph, prefix, cycle_time)
                .loads
                .last()
                .copied()
                .unwrap_or(0.0);
            let members: Vec<usize> = order[start..start + width]
                .iter()
                .filter_map(|&id| graph.index_of(id))
                .collect();

            let mut candidate = prefix.to_vec();
            candidate.extend(sequence(graph, &members, open_load, cycle_time, |i| {
                rule.key(graph, i)
            }));
            candidate.extend_from_slice(&order[start + width..]);
            Some(Candidate::new(graph, decode_trusted(graph, &candidate, cycle_time)))
        })
        .collect()
}
