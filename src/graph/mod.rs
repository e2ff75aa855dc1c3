mod regions;

pub use self::regions::Region;

use crate::consts::fits;
use crate::error::{LbResult, LineError};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

pub type TaskId = u32;
pub type Time = f64;

/// Predecessor marker meaning "no predecessor".
pub const NO_PREDECESSOR: TaskId = 0;

/// A task as registered by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub predecessors: Vec<TaskId>,
    pub duration: Time,
}

impl Task {
    pub fn new(id: TaskId, predecessors: &[TaskId], duration: Time) -> Self {
        Self {
            id,
            predecessors: predecessors.to_vec(),
            duration,
        }
    }
}

impl From<(TaskId, Vec<TaskId>, Time)> for Task {
    fn from((id, predecessors, duration): (TaskId, Vec<TaskId>, Time)) -> Self {
        Self {
            id,
            predecessors,
            duration,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    id: TaskId,
    duration: Time,
    preds: Vec<usize>,
    succs: Vec<usize>,
}

/// Immutable precedence graph.
///
/// Tasks live in an arena sorted by id, so comparing arena indices is the
/// same as comparing task ids. Everything derived from the precedence
/// relation (closures, positional weights, regions) is computed once in
/// [`TaskGraph::build`].
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: Vec<Node>,
    index: HashMap<TaskId, usize>,
    baseline: Vec<usize>,
    ancestors: Vec<Vec<u64>>,
    positional_weight: Vec<Time>,
    reverse_weight: Vec<Time>,
    articulation: Vec<usize>,
    regions: Vec<Region>,
    region_of: Vec<usize>,
}

impl TaskGraph {
    pub fn build(tasks: &[Task]) -> LbResult<Self> {
        if tasks.is_empty() {
            return Err(LineError::InvalidTask("task set is empty".into()));
        }

        let mut sorted: Vec<&Task> = tasks.iter().collect();
        sorted.sort_by_key(|t| t.id);

        let mut index = HashMap::with_capacity(sorted.len());
        for (i, t) in sorted.iter().enumerate() {
            if t.id == NO_PREDECESSOR {
                return Err(LineError::InvalidTask(format!(
                    "task id {} is reserved for 'no predecessor'",
                    NO_PREDECESSOR
                )));
            }
            if !t.duration.is_finite() || t.duration < 0.0 {
                return Err(LineError::InvalidTask(format!(
                    "task {} has invalid duration {}",
                    t.id, t.duration
                )));
            }
            if index.insert(t.id, i).is_some() {
                return Err(LineError::InvalidTask(format!(
                    "duplicate task id {}",
                    t.id
                )));
            }
        }

        let mut nodes: Vec<Node> = sorted
            .iter()
            .map(|t| Node {
                id: t.id,
                duration: t.duration,
                preds: Vec::new(),
                succs: Vec::new(),
            })
            .collect();

        for (i, t) in sorted.iter().enumerate() {
            for &p in &t.predecessors {
                if p == NO_PREDECESSOR {
                    continue;
                }
                let pi = *index.get(&p).ok_or(LineError::UnknownPredecessor {
                    task: t.id,
                    predecessor: p,
                })?;
                if !nodes[i].preds.contains(&pi) {
                    nodes[i].preds.push(pi);
                    nodes[pi].succs.push(i);
                }
            }
        }
        for node in &mut nodes {
            node.preds.sort_unstable();
            node.succs.sort_unstable();
        }

        // Cycle check on a petgraph mirror of the arena.
        let mut dag: DiGraph<usize, ()> = DiGraph::with_capacity(nodes.len(), 0);
        let handles: Vec<NodeIndex> = (0..nodes.len()).map(|i| dag.add_node(i)).collect();
        for (i, node) in nodes.iter().enumerate() {
            for &p in &node.preds {
                dag.add_edge(handles[p], handles[i], ());
            }
        }
        toposort(&dag, None).map_err(|cycle| LineError::CyclicPrecedence {
            task: nodes[dag[cycle.node_id()]].id,
        })?;

        let baseline = smallest_id_first_order(&nodes);
        let words = nodes.len().div_ceil(64);

        let mut descendants = vec![vec![0u64; words]; nodes.len()];
        for &v in baseline.iter().rev() {
            let mut row = vec![0u64; words];
            for &s in &nodes[v].succs {
                set_bit(&mut row, s);
                or_into(&mut row, &descendants[s]);
            }
            descendants[v] = row;
        }

        let mut ancestors = vec![vec![0u64; words]; nodes.len()];
        for &v in &baseline {
            let mut row = vec![0u64; words];
            for &p in &nodes[v].preds {
                set_bit(&mut row, p);
                or_into(&mut row, &ancestors[p]);
            }
            ancestors[v] = row;
        }

        let closure_weight = |rows: &[Vec<u64>]| -> Vec<Time> {
            rows.iter()
                .enumerate()
                .map(|(v, row)| {
                    nodes[v].duration + bits(row).map(|u| nodes[u].duration).sum::<Time>()
                })
                .collect()
        };
        let positional_weight = closure_weight(&descendants);
        let reverse_weight = closure_weight(&ancestors);

        let adjacency: Vec<(&[usize], &[usize])> = nodes
            .iter()
            .map(|n| (n.preds.as_slice(), n.succs.as_slice()))
            .collect();
        let cut = regions::articulation_points(&adjacency);
        let (articulation, regions, region_of) =
            regions::partition(&nodes, &ancestors, &baseline, cut);

        Ok(Self {
            nodes,
            index,
            baseline,
            ancestors,
            positional_weight,
            reverse_weight,
            articulation,
            regions,
            region_of,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.index.contains_key(&id)
    }

    /// Task ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.nodes
            .iter()
            .map(|n| Task {
                id: n.id,
                predecessors: n.preds.iter().map(|&p| self.nodes[p].id).collect(),
                duration: n.duration,
            })
            .collect()
    }

    pub fn duration(&self, id: TaskId) -> Option<Time> {
        self.index.get(&id).map(|&i| self.nodes[i].duration)
    }

    pub fn predecessors(&self, id: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.index
            .get(&id)
            .into_iter()
            .flat_map(move |&i| self.nodes[i].preds.iter().map(move |&p| self.nodes[p].id))
    }

    pub fn successors(&self, id: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.index
            .get(&id)
            .into_iter()
            .flat_map(move |&i| self.nodes[i].succs.iter().map(move |&s| self.nodes[s].id))
    }

    /// True when `ancestor` must precede `task` in every valid order.
    pub fn is_ancestor(&self, ancestor: TaskId, task: TaskId) -> bool {
        match (self.index.get(&ancestor), self.index.get(&task)) {
            (Some(&a), Some(&t)) => test_bit(&self.ancestors[t], a),
            _ => false,
        }
    }

    pub fn total_duration(&self) -> Time {
        self.nodes.iter().map(|n| n.duration).sum()
    }

    pub fn max_duration(&self) -> Time {
        self.nodes.iter().map(|n| n.duration).fold(0.0, Time::max)
    }

    /// Smallest-id-first topological order.
    pub fn topological_order(&self) -> Vec<TaskId> {
        self.baseline.iter().map(|&i| self.nodes[i].id).collect()
    }

    /// Own duration plus the durations of every transitive successor.
    pub fn ranked_positional_weight(&self, id: TaskId) -> Option<Time> {
        self.index.get(&id).map(|&i| self.positional_weight[i])
    }

    /// Own duration plus the durations of every transitive predecessor.
    pub fn reverse_positional_weight(&self, id: TaskId) -> Option<Time> {
        self.index.get(&id).map(|&i| self.reverse_weight[i])
    }

    /// Cut vertices of the precedence skeleton, in sequence order.
    pub fn articulation_points(&self) -> Vec<TaskId> {
        self.articulation.iter().map(|&i| self.nodes[i].id).collect()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region_of(&self, id: TaskId) -> Option<&Region> {
        self.index
            .get(&id)
            .map(|&i| &self.regions[self.region_of[i]])
    }

    /// Fails with `InfeasibleOrder` for the first task (by id) that cannot
    /// fit in any station.
    pub fn check_cycle_time(&self, cycle_time: Time) -> LbResult<()> {
        if !cycle_time.is_finite() || cycle_time <= 0.0 {
            return Err(LineError::Config(format!(
                "cycle time must be positive, got {}",
                cycle_time
            )));
        }
        match self
            .nodes
            .iter()
            .find(|n| !fits(0.0, n.duration, cycle_time))
        {
            Some(n) => Err(LineError::InfeasibleOrder {
                task: n.id,
                duration: n.duration,
                cycle_time,
            }),
            None => Ok(()),
        }
    }

    /// Position of every task (arena-indexed) in `order`, after checking that
    /// `order` is a complete permutation that respects precedence.
    pub fn position_map(&self, order: &[TaskId]) -> LbResult<Vec<usize>> {
        if order.len() != self.len() {
            return Err(LineError::InvalidSequence(format!(
                "order has {} entries, expected {}",
                order.len(),
                self.len()
            )));
        }
        let mut pos = vec![usize::MAX; self.len()];
        for (p, &id) in order.iter().enumerate() {
            let i = self.require(id)?;
            if pos[i] != usize::MAX {
                return Err(LineError::InvalidSequence(format!(
                    "task {} appears twice",
                    id
                )));
            }
            pos[i] = p;
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(&p) = node.preds.iter().find(|&&p| pos[p] > pos[i]) {
                return Err(LineError::InvalidSequence(format!(
                    "task {} is placed before its predecessor {}",
                    node.id, self.nodes[p].id
                )));
            }
        }
        Ok(pos)
    }

    pub fn is_valid_order(&self, order: &[TaskId]) -> bool {
        self.position_map(order).is_ok()
    }

    // --- arena access for the decoder and the optimizers ---

    pub(crate) fn require(&self, id: TaskId) -> LbResult<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or_else(|| LineError::InvalidSequence(format!("unknown task {}", id)))
    }

    pub(crate) fn index_of(&self, id: TaskId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(crate) fn id_at(&self, i: usize) -> TaskId {
        self.nodes[i].id
    }

    pub(crate) fn duration_at(&self, i: usize) -> Time {
        self.nodes[i].duration
    }

    pub(crate) fn preds_at(&self, i: usize) -> &[usize] {
        &self.nodes[i].preds
    }

    pub(crate) fn succs_at(&self, i: usize) -> &[usize] {
        &self.nodes[i].succs
    }

    pub(crate) fn weight_at(&self, i: usize) -> Time {
        self.positional_weight[i]
    }

    pub(crate) fn reverse_weight_at(&self, i: usize) -> Time {
        self.reverse_weight[i]
    }

    pub(crate) fn region_index_at(&self, i: usize) -> usize {
        self.region_of[i]
    }
}

/// Kahn's algorithm, always releasing the smallest available id.
fn smallest_id_first_order(nodes: &[Node]) -> Vec<usize> {
    let mut pending: Vec<usize> = nodes.iter().map(|n| n.preds.len()).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = pending
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c == 0)
        .map(|(i, _)| Reverse(i))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse(v)) = ready.pop() {
        order.push(v);
        for &s in &nodes[v].succs {
            pending[s] -= 1;
            if pending[s] == 0 {
                ready.push(Reverse(s));
            }
        }
    }
    order
}

#[inline]
fn set_bit(row: &mut [u64], i: usize) {
    row[i / 64] |= 1u64 << (i % 64);
}

#[inline]
fn test_bit(row: &[u64], i: usize) -> bool {
    row[i / 64] & (1u64 << (i % 64)) != 0
}

#[inline]
fn or_into(row: &mut [u64], other: &[u64]) {
    for (a, b) in row.iter_mut().zip(other) {
        *a |= b;
    }
}

fn bits(row: &[u64]) -> impl Iterator<Item = usize> + '_ {
    row.iter().enumerate().flat_map(|(w, &word)| {
        (0..64)
            .filter(move |b| word & (1u64 << b) != 0)
            .map(move |b| w * 64 + b)
    })
}
