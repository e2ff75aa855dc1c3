//! U-shaped lines: tasks are taken from the front (after all their
//! predecessors) or from the back (after all their successors) of the
//! line, and both streams share the same stations.

mod construct;

pub use self::construct::{u_comsoal, u_heuristic, u_sequence};

use crate::consts::fits;
use crate::decoder::{decode_u, Side, StationAssignment, UStep};
use crate::error::LbResult;
use crate::graph::{TaskGraph, TaskId, Time};
use crate::heuristics::Heuristic;
use crate::optimizer::crossover::region_crossover;
use crate::optimizer::initialization::random_order;
use crate::optimizer::mutation::region_mutation;
use crate::optimizer::{Genome, SelectionWeighting, Skip};
use fastrand::Rng;
use strum::IntoEnumIterator;

/// U-line chromosome.
///
/// `order` is a topological order. `sides` (arena-indexed) is closed: a
/// front task has only front predecessors and a back task only back
/// successors. Front tasks are committed in `order`, back tasks in
/// reverse `order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UChromosome {
    pub order: Vec<TaskId>,
    sides: Vec<Side>,
}

impl UChromosome {
    /// Every task on the front: the straight-line special case.
    pub fn all_front(graph: &TaskGraph, order: Vec<TaskId>) -> Self {
        Self {
            order,
            sides: vec![Side::Front; graph.len()],
        }
    }

    /// Rebuilds a chromosome from a commit sequence.
    pub fn from_steps(graph: &TaskGraph, steps: &[UStep]) -> Self {
        let mut sides = vec![Side::Front; graph.len()];
        let mut front = Vec::new();
        let mut back = Vec::new();
        for step in steps {
            if let Some(i) = graph.index_of(step.task) {
                sides[i] = step.side;
            }
            match step.side {
                Side::Front => front.push(step.task),
                Side::Back => back.push(step.task),
            }
        }
        front.extend(back.into_iter().rev());
        Self {
            order: front,
            sides,
        }
    }

    pub fn side_of(&self, graph: &TaskGraph, id: TaskId) -> Option<Side> {
        graph.index_of(id).map(|i| self.sides[i])
    }

    /// Merges the front stream with the reversed back stream. At each step
    /// the head that fits the open station is taken, the longer one when both
    /// fit (front on ties); when neither fits a new station is opened.
    pub fn unfold(&self, graph: &TaskGraph, cycle_time: Time) -> Vec<UStep> {
        let side = |id: TaskId| graph.index_of(id).map(|i| self.sides[i]);
        let front: Vec<TaskId> = self
            .order
            .iter()
            .copied()
            .filter(|&id| side(id) == Some(Side::Front))
            .collect();
        let back: Vec<TaskId> = self
            .order
            .iter()
            .rev()
            .copied()
            .filter(|&id| side(id) == Some(Side::Back))
            .collect();

        let duration = |id: TaskId| graph.duration(id).unwrap_or(0.0);
        let (mut f, mut b) = (0, 0);
        let mut load = 0.0;
        let mut steps = Vec::with_capacity(self.order.len());

        while f < front.len() || b < back.len() {
            let head_f = front.get(f).map(|&id| (id, duration(id)));
            let head_b = back.get(b).map(|&id| (id, duration(id)));
            let fit_f = head_f.filter(|&(_, d)| fits(load, d, cycle_time));
            let fit_b = head_b.filter(|&(_, d)| fits(load, d, cycle_time));

            let take_front = match (fit_f, fit_b) {
                (Some((_, df)), Some((_, db))) => df >= db,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => {
                    load = 0.0;
                    match (head_f, head_b) {
                        (Some((_, df)), Some((_, db))) => df >= db,
                        (Some(_), None) => true,
                        _ => false,
                    }
                }
            };

            let (id, d) = if take_front {
                f += 1;
                (front[f - 1], duration(front[f - 1]))
            } else {
                b += 1;
                (back[b - 1], duration(back[b - 1]))
            };
            load += d;
            steps.push(UStep::new(
                id,
                if take_front { Side::Front } else { Side::Back },
            ));
        }
        steps
    }

    /// True when the side tags are closed under precedence.
    pub fn is_closed(&self, graph: &TaskGraph) -> bool {
        sides_closed(graph, &self.sides)
    }

    /// Flips one task's side when the flip keeps the tags closed.
    fn try_flip(&mut self, graph: &TaskGraph, i: usize) -> bool {
        let allowed = match self.sides[i] {
            Side::Front => graph.succs_at(i).iter().all(|&s| self.sides[s] == Side::Back),
            Side::Back => graph.preds_at(i).iter().all(|&p| self.sides[p] == Side::Front),
        };
        if allowed {
            self.sides[i] = match self.sides[i] {
                Side::Front => Side::Back,
                Side::Back => Side::Front,
            };
        }
        allowed
    }
}

fn sides_closed(graph: &TaskGraph, sides: &[Side]) -> bool {
    (0..graph.len()).all(|i| match sides[i] {
        Side::Front => graph.preds_at(i).iter().all(|&p| sides[p] == Side::Front),
        Side::Back => true,
    })
}

impl Genome for UChromosome {
    fn constructive(graph: &TaskGraph, cycle_time: Time) -> LbResult<Vec<Self>> {
        Heuristic::iter()
            .map(|rule| {
                u_sequence(graph, cycle_time, rule).map(|steps| Self::from_steps(graph, &steps))
            })
            .collect()
    }

    fn random(graph: &TaskGraph, weighting: SelectionWeighting, rng: &mut Rng) -> Self {
        let mut chromosome = Self::all_front(graph, random_order(graph, weighting, rng));
        // Walk the order backwards, moving a random tail to the back side.
        for &id in chromosome.order.clone().iter().rev() {
            if !rng.bool() {
                break;
            }
            if let Some(i) = graph.index_of(id) {
                chromosome.try_flip(graph, i);
            }
        }
        chromosome
    }

    fn decode(&self, graph: &TaskGraph, cycle_time: Time) -> LbResult<StationAssignment> {
        decode_u(graph, &self.unfold(graph, cycle_time), cycle_time)
    }

    fn crossover(&self, other: &Self, graph: &TaskGraph, rng: &mut Rng) -> (Self, Self) {
        let (order_a, order_b) = region_crossover(graph, &self.order, &other.order, rng);
        let mut sides_a = self.sides.clone();
        let mut sides_b = other.sides.clone();

        for region in graph.regions() {
            if !rng.bool() {
                continue;
            }
            let members: Vec<usize> = region
                .tasks
                .iter()
                .filter_map(|&id| graph.index_of(id))
                .collect();
            for &i in &members {
                std::mem::swap(&mut sides_a[i], &mut sides_b[i]);
            }
            if !sides_closed(graph, &sides_a) || !sides_closed(graph, &sides_b) {
                for &i in &members {
                    std::mem::swap(&mut sides_a[i], &mut sides_b[i]);
                }
            }
        }

        (
            Self {
                order: order_a,
                sides: sides_a,
            },
            Self {
                order: order_b,
                sides: sides_b,
            },
        )
    }

    fn mutate(&mut self, graph: &TaskGraph, rng: &mut Rng) -> Result<(), Skip> {
        let moved = region_mutation(graph, &mut self.order, rng);
        let i = rng.usize(..graph.len());
        let flipped = rng.bool() && self.try_flip(graph, i);
        match (moved, flipped) {
            (Err(skip), false) => Err(skip),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Task;

    fn chain() -> TaskGraph {
        TaskGraph::build(&[
            Task::new(1, &[], 3.0),
            Task::new(2, &[1], 2.0),
            Task::new(3, &[2], 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn unfold_interleaves_both_ends() {
        let g = chain();
        let steps = [
            UStep::new(3, Side::Back),
            UStep::new(1, Side::Front),
            UStep::new(2, Side::Front),
        ];
        let c = UChromosome::from_steps(&g, &steps);
        assert_eq!(c.order, vec![1, 2, 3]);
        assert!(c.is_closed(&g));

        let unfolded = c.unfold(&g, 5.0);
        // 3 (back) is the longer head that fits, then 1 opens a new station.
        assert_eq!(unfolded[0], UStep::new(3, Side::Back));
        let a = c.decode(&g, 5.0).unwrap();
        assert!(a.verify(&g).is_ok());
        assert_eq!(a.stations.len(), 2);
    }

    #[test]
    fn flips_keep_sides_closed() {
        let g = chain();
        let mut c = UChromosome::all_front(&g, vec![1, 2, 3]);
        // 2 cannot move back while its successor 3 is on the front.
        assert!(!c.try_flip(&g, 1));
        assert!(c.try_flip(&g, 2));
        assert!(c.try_flip(&g, 1));
        assert!(c.is_closed(&g));
        assert_eq!(c.side_of(&g, 2), Some(Side::Back));
    }
}
