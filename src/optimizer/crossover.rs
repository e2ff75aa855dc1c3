use crate::graph::{TaskGraph, TaskId};
use fastrand::Rng;

/// Region-wise uniform crossover.
///
/// Each non-pivot region's position window is swapped between the two
/// children with probability 0.5. Both parents hold the same task set in
/// every window, so the children stay valid orders without repair.
pub fn region_crossover(
    graph: &TaskGraph,
    a: &[TaskId],
    b: &[TaskId],
    rng: &mut Rng,
) -> (Vec<TaskId>, Vec<TaskId>) {
    let mut left = a.to_vec();
    let mut right = b.to_vec();

    for region in graph.regions() {
        if region.is_pivot() || region.len() < 2 {
            continue;
        }
        if rng.bool() {
            let window = region.window();
            left[window.clone()].swap_with_slice(&mut right[window]);
        }
    }

    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;

    #[test]
    fn swaps_whole_windows_only() {
        // Pivots 1, 4 and 7 separate two blocks {2,3} and {5,6}.
        let g = TaskGraph::build(&[
            Task::new(1, &[], 1.0),
            Task::new(2, &[1], 1.0),
            Task::new(3, &[1], 1.0),
            Task::new(4, &[2, 3], 1.0),
            Task::new(5, &[4], 1.0),
            Task::new(6, &[4], 1.0),
            Task::new(7, &[5, 6], 1.0),
        ])
        .unwrap();
        let a = vec![1, 2, 3, 4, 5, 6, 7];
        let b = vec![1, 3, 2, 4, 6, 5, 7];
        let mut rng = Rng::with_seed(3);
        for _ in 0..50 {
            let (x, y) = region_crossover(&g, &a, &b, &mut rng);
            assert!(g.is_valid_order(&x) && g.is_valid_order(&y));
            for p in [0, 3, 6] {
                assert_eq!(x[p], a[p]);
            }
            for window in [1..3, 4..6] {
                let from_a = x[window.clone()] == a[window.clone()];
                let from_b = x[window.clone()] == b[window.clone()];
                assert!(from_a || from_b);
                assert_eq!(from_a, y[window.clone()] == b[window]);
            }
        }
    }
}
