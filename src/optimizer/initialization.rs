use super::SelectionWeighting;
use crate::graph::{TaskGraph, TaskId};
use fastrand::Rng;

/// Draws a random precedence-feasible order, one available task at a time.
pub fn random_order(graph: &TaskGraph, weighting: SelectionWeighting, rng: &mut Rng) -> Vec<TaskId> {
    let n = graph.len();
    let mut pending: Vec<usize> = (0..n).map(|i| graph.preds_at(i).len()).collect();
    let mut available: Vec<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while !available.is_empty() {
        let k = weighting.pick(graph, &available, rng);
        let t = available.swap_remove(k);
        order.push(graph.id_at(t));
        for &s in graph.succs_at(t) {
            pending[s] -= 1;
            if pending[s] == 0 {
                available.push(s);
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;

    #[test]
    fn random_orders_are_topological() {
        let g = TaskGraph::build(&[
            Task::new(1, &[], 1.0),
            Task::new(2, &[1], 1.0),
            Task::new(3, &[1], 1.0),
            Task::new(4, &[], 1.0),
            Task::new(5, &[3, 4], 1.0),
        ])
        .unwrap();
        let mut rng = Rng::with_seed(42);
        for _ in 0..100 {
            let order = random_order(&g, SelectionWeighting::Uniform, &mut rng);
            assert!(g.is_valid_order(&order), "{:?}", order);
        }
    }
}
