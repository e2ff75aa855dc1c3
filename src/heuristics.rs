use crate::consts::fits;
use crate::decoder::{decode_trusted, StationAssignment};
use crate::error::LbResult;
use crate::graph::{TaskGraph, TaskId, Time};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;

/// Deterministic priority rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// Largest Candidate Rule: longest task first.
    Lcr,
    /// Helgeson-Birnie: largest ranked positional weight first.
    Hb,
}

impl Heuristic {
    pub(crate) fn key(&self, graph: &TaskGraph, i: usize) -> Time {
        match self {
            Self::Lcr => graph.duration_at(i),
            Self::Hb => graph.weight_at(i),
        }
    }

    /// The task order this rule builds for `cycle_time`.
    pub fn order(&self, graph: &TaskGraph, cycle_time: Time) -> LbResult<Vec<TaskId>> {
        graph.check_cycle_time(cycle_time)?;
        let all: Vec<usize> = (0..graph.len()).collect();
        Ok(sequence(graph, &all, 0.0, cycle_time, |i| self.key(graph, i)))
    }

    pub fn balance(&self, graph: &TaskGraph, cycle_time: Time) -> LbResult<StationAssignment> {
        let order = self.order(graph, cycle_time)?;
        let assignment = decode_trusted(graph, &order, cycle_time);
        debug!(rule = %self, stations = assignment.station_count(), "heuristic balance");
        Ok(assignment)
    }
}

/// Station-oriented priority sequencing over `members` (arena indices).
///
/// Among the members whose in-set predecessors are placed, the highest key
/// that still fits the open station is taken (ties to the smallest id). When
/// nothing fits, the station is closed and the top candidate opens the next
/// one. `start_load` is the load already sitting in the open station.
/// Decoding the result reproduces exactly the stations built here.
pub(crate) fn sequence<K>(
    graph: &TaskGraph,
    members: &[usize],
    start_load: Time,
    cycle_time: Time,
    key: K,
) -> Vec<TaskId>
where
    K: Fn(usize) -> Time,
{
    let mut in_set = vec![false; graph.len()];
    for &m in members {
        in_set[m] = true;
    }
    let mut pending = vec![0usize; graph.len()];
    for &m in members {
        pending[m] = graph.preds_at(m).iter().filter(|&&p| in_set[p]).count();
    }
    let mut available: Vec<usize> = members.iter().copied().filter(|&m| pending[m] == 0).collect();

    let mut load = start_load;
    let mut out = Vec::with_capacity(members.len());

    while !available.is_empty() {
        available.sort_by(|&a, &b| key(b).total_cmp(&key(a)).then(a.cmp(&b)));
        let slot = match available
            .iter()
            .position(|&t| fits(load, graph.duration_at(t), cycle_time))
        {
            Some(k) => k,
            None => {
                load = 0.0;
                0
            }
        };
        let t = available.remove(slot);
        load += graph.duration_at(t);
        out.push(graph.id_at(t));

        for &s in graph.succs_at(t) {
            if in_set[s] {
                pending[s] -= 1;
                if pending[s] == 0 {
                    available.push(s);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;

    #[test]
    fn lcr_fills_stations_with_the_largest_fitting_task() {
        let g = TaskGraph::build(&[
            Task::new(1, &[], 1.0),
            Task::new(2, &[], 4.0),
            Task::new(3, &[], 3.0),
            Task::new(4, &[], 2.0),
        ])
        .unwrap();
        let a = Heuristic::Lcr.balance(&g, 5.0).unwrap();
        assert_eq!(a.stations, vec![vec![2, 1], vec![3, 4]]);
    }

    #[test]
    fn sub_window_sequencing_respects_open_load() {
        let g = TaskGraph::build(&[
            Task::new(1, &[], 3.0),
            Task::new(2, &[], 2.0),
            Task::new(3, &[], 1.0),
        ])
        .unwrap();
        // Three of five units are already used, so only task 2 fits before a reset.
        let order = sequence(&g, &[0, 1, 2], 3.0, 5.0, |i| g.duration_at(i));
        assert_eq!(order, vec![2, 1, 3]);
    }
}
