use super::{test_bit, Node, TaskGraph, TaskId};
use serde::Serialize;
use std::ops::Range;

/// A block of consecutive sequence positions.
///
/// Every valid order places exactly the same tasks inside `window()`, so the
/// block can be permuted (respecting its own precedence) or swapped wholesale
/// between two orders without disturbing anything outside it. A `pivot`
/// region is a single articulation point whose position never changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub index: usize,
    pub tasks: Vec<TaskId>,
    pub start: usize,
    pub pivot: bool,
}

impl Region {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn window(&self) -> Range<usize> {
        self.start..self.start + self.tasks.len()
    }

    pub fn is_pivot(&self) -> bool {
        self.pivot
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains(&id)
    }

    /// True when `sequence` is a permutation of this region's tasks that
    /// respects the precedence edges inside the region.
    pub fn admits(&self, graph: &TaskGraph, sequence: &[TaskId]) -> bool {
        if sequence.len() != self.tasks.len() {
            return false;
        }
        let mut placed = vec![false; graph.len()];
        for &id in sequence {
            let Some(i) = graph.index_of(id) else {
                return false;
            };
            if graph.region_index_at(i) != self.index || placed[i] {
                return false;
            }
            let blocked = graph
                .preds_at(i)
                .iter()
                .any(|&p| graph.region_index_at(p) == self.index && !placed[p]);
            if blocked {
                return false;
            }
            placed[i] = true;
        }
        true
    }
}

/// Cut vertices of the undirected precedence skeleton, closed off by a
/// virtual source (linked to every root) and a virtual sink (linked to
/// every leaf). Iterative Tarjan lowlink.
pub(super) fn articulation_points(adjacency: &[(&[usize], &[usize])]) -> Vec<usize> {
    const UNSEEN: usize = usize::MAX;
    let n = adjacency.len();
    let source = n;
    let sink = n + 1;

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n + 2];
    for (v, (preds, succs)) in adjacency.iter().enumerate() {
        adj[v].extend_from_slice(preds);
        adj[v].extend_from_slice(succs);
        if preds.is_empty() {
            adj[v].push(source);
            adj[source].push(v);
        }
        if succs.is_empty() {
            adj[v].push(sink);
            adj[sink].push(v);
        }
    }

    let mut disc = vec![UNSEEN; n + 2];
    let mut low = vec![0; n + 2];
    let mut parent = vec![UNSEEN; n + 2];
    let mut is_cut = vec![false; n + 2];

    // Every task reaches the source through one of its roots, so a single
    // DFS from the source covers the whole skeleton.
    disc[source] = 0;
    let mut timer = 1;
    let mut stack = vec![(source, 0usize)];

    while let Some(top) = stack.last_mut() {
        let v = top.0;
        if top.1 < adj[v].len() {
            let w = adj[v][top.1];
            top.1 += 1;
            if disc[w] == UNSEEN {
                parent[w] = v;
                disc[w] = timer;
                low[w] = timer;
                timer += 1;
                stack.push((w, 0));
            } else if w != parent[v] {
                low[v] = low[v].min(disc[w]);
            }
        } else {
            stack.pop();
            if let Some(&(u, _)) = stack.last() {
                low[u] = low[u].min(low[v]);
                if u != source && low[v] >= disc[u] {
                    is_cut[u] = true;
                }
            }
        }
    }

    (0..n).filter(|&v| is_cut[v]).collect()
}

/// Splits the tasks into regions.
///
/// Each articulation point is comparable with every other task, so its
/// position equals its ancestor count in any valid order. A non-cut task
/// lives between the k-th and (k+1)-th cut vertex, where k is the number of
/// cut vertices among its ancestors.
pub(super) fn partition(
    nodes: &[Node],
    ancestors: &[Vec<u64>],
    baseline: &[usize],
    mut cut: Vec<usize>,
) -> (Vec<usize>, Vec<Region>, Vec<usize>) {
    let depth = |v: usize| -> usize { ancestors[v].iter().map(|w| w.count_ones() as usize).sum() };
    cut.sort_by_key(|&c| depth(c));

    let mut cut_rank = vec![None; nodes.len()];
    for (k, &c) in cut.iter().enumerate() {
        cut_rank[c] = Some(k);
    }

    let mut slots: Vec<Vec<usize>> = vec![Vec::new(); 2 * cut.len() + 1];
    for &v in baseline {
        let slot = match cut_rank[v] {
            Some(k) => 2 * k + 1,
            None => 2 * cut.iter().filter(|&&c| test_bit(&ancestors[v], c)).count(),
        };
        slots[slot].push(v);
    }

    let mut regions = Vec::new();
    let mut region_of = vec![0; nodes.len()];
    let mut start = 0;
    for (slot, members) in slots.into_iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        let index = regions.len();
        for &v in &members {
            region_of[v] = index;
        }
        let len = members.len();
        regions.push(Region {
            index,
            tasks: members.iter().map(|&v| nodes[v].id).collect(),
            start,
            pivot: slot % 2 == 1,
        });
        start += len;
    }

    (cut, regions, region_of)
}
