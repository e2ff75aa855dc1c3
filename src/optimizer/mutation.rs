use super::Skip;
use crate::graph::{TaskGraph, TaskId};
use fastrand::Rng;
use std::ops::RangeInclusive;

/// A performed move: the task at `from` now sits at `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from: usize,
    pub to: usize,
}

/// Arena-indexed position of every task in a trusted order.
pub(crate) fn positions(graph: &TaskGraph, order: &[TaskId]) -> Vec<usize> {
    let mut pos = vec![0; graph.len()];
    for (p, &id) in order.iter().enumerate() {
        if let Some(i) = graph.index_of(id) {
            pos[i] = p;
        }
    }
    pos
}

/// Positions the task at `position` may move to: after its latest
/// predecessor, before its earliest successor, inside its own region.
pub fn relocation_window(
    graph: &TaskGraph,
    order: &[TaskId],
    position: usize,
) -> Option<RangeInclusive<usize>> {
    let i = graph.index_of(*order.get(position)?)?;
    Some(window_at(graph, &positions(graph, order), i))
}

fn window_at(graph: &TaskGraph, pos: &[usize], i: usize) -> RangeInclusive<usize> {
    let region = graph.regions()[graph.region_index_at(i)].window();
    let lo = graph
        .preds_at(i)
        .iter()
        .map(|&p| pos[p] + 1)
        .fold(region.start, usize::max);
    let hi = graph
        .succs_at(i)
        .iter()
        .map(|&s| pos[s])
        .fold(region.end, usize::min)
        - 1;
    lo..=hi
}

/// Moves one element, shifting everything in between by one slot.
pub fn relocate(order: &mut Vec<TaskId>, from: usize, to: usize) {
    if from != to {
        let task = order.remove(from);
        order.insert(to, task);
    }
}

/// Region-based mutation: relocates one random movable task to a uniformly
/// drawn position of its window.
pub fn region_mutation(
    graph: &TaskGraph,
    order: &mut Vec<TaskId>,
    rng: &mut Rng,
) -> Result<Relocation, Skip> {
    let movable: Vec<usize> = graph
        .regions()
        .iter()
        .filter(|r| !r.is_pivot() && r.len() > 1)
        .flat_map(|r| r.window())
        .collect();
    if movable.is_empty() {
        return Err(Skip::NoFeasibleRelocation);
    }

    let from = movable[rng.usize(..movable.len())];
    let i = graph
        .index_of(order[from])
        .ok_or(Skip::NoFeasibleRelocation)?;
    let window = window_at(graph, &positions(graph, order), i);
    if window.start() == window.end() {
        return Err(Skip::NoFeasibleRelocation);
    }

    let to = rng.usize(window);
    relocate(order, from, to);
    Ok(Relocation { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;

    fn graph() -> TaskGraph {
        // 1 -> {2 -> 3, 4} -> 5
        TaskGraph::build(&[
            Task::new(1, &[], 1.0),
            Task::new(2, &[1], 1.0),
            Task::new(3, &[2], 1.0),
            Task::new(4, &[1], 1.0),
            Task::new(5, &[3, 4], 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn window_is_bounded_by_neighbours_and_region() {
        let g = graph();
        let order = vec![1, 2, 4, 3, 5];
        assert_eq!(relocation_window(&g, &order, 1), Some(1..=2));
        assert_eq!(relocation_window(&g, &order, 3), Some(2..=3));
        assert_eq!(relocation_window(&g, &order, 2), Some(1..=3));
        assert_eq!(relocation_window(&g, &order, 0), Some(0..=0));
        assert_eq!(relocation_window(&g, &order, 9), None);
    }

    #[test]
    fn mutation_keeps_order_valid() {
        let g = graph();
        let mut rng = Rng::with_seed(11);
        let mut order = g.topological_order();
        for _ in 0..200 {
            let before = order.clone();
            match region_mutation(&g, &mut order, &mut rng) {
                Ok(mv) => {
                    let window = relocation_window(&g, &before, mv.from).unwrap();
                    assert!(window.contains(&mv.to));
                }
                Err(skip) => assert_eq!(skip, Skip::NoFeasibleRelocation),
            }
            assert!(g.is_valid_order(&order), "{:?}", order);
        }
    }

    #[test]
    fn chains_have_nothing_to_move() {
        let g = TaskGraph::build(&[Task::new(1, &[], 1.0), Task::new(2, &[1], 1.0)]).unwrap();
        let mut order = vec![1, 2];
        let mut rng = Rng::with_seed(1);
        assert_eq!(
            region_mutation(&g, &mut order, &mut rng),
            Err(Skip::NoFeasibleRelocation)
        );
    }
}
