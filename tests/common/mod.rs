#![allow(dead_code)]

use lineforge::decoder::StationAssignment;
use lineforge::graph::{Task, TaskGraph, TaskId, Time};

/// Builder for task lists to keep fixtures short.
#[derive(Default)]
pub struct TaskSet {
    tasks: Vec<Task>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, id: TaskId, predecessors: &[TaskId], duration: Time) -> Self {
        self.tasks.push(Task::new(id, predecessors, duration));
        self
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn graph(&self) -> TaskGraph {
        TaskGraph::build(&self.tasks).expect("fixture graph must build")
    }
}

/// 1 -> {2, 3} -> 4 with durations 2, 5, 4, 3.
pub fn diamond() -> TaskSet {
    TaskSet::new()
        .task(1, &[0], 2.0)
        .task(2, &[1], 5.0)
        .task(3, &[1], 4.0)
        .task(4, &[2, 3], 3.0)
}

/// Nine tasks, 29 units of work.
pub fn nine_tasks() -> TaskSet {
    TaskSet::new()
        .task(1, &[], 3.0)
        .task(2, &[1], 4.0)
        .task(3, &[1], 2.0)
        .task(4, &[2], 3.0)
        .task(5, &[3], 4.0)
        .task(6, &[2, 3], 3.0)
        .task(7, &[4, 5], 3.0)
        .task(8, &[6], 4.0)
        .task(9, &[7, 8], 3.0)
}

/// Three diamonds joined through the cut vertices 4 and 8.
pub fn chained_diamonds() -> TaskSet {
    TaskSet::new()
        .task(1, &[], 2.0)
        .task(2, &[1], 3.0)
        .task(3, &[1], 1.0)
        .task(9, &[1], 2.0)
        .task(4, &[2, 3, 9], 2.0)
        .task(5, &[4], 4.0)
        .task(6, &[4], 1.0)
        .task(10, &[6], 2.0)
        .task(7, &[4], 3.0)
        .task(8, &[5, 10, 7], 2.0)
        .task(11, &[8], 1.0)
        .task(12, &[8], 2.0)
        .task(13, &[11, 12], 3.0)
}

/// Capacity, completeness and uniqueness of an assignment.
pub fn assert_feasible(graph: &TaskGraph, assignment: &StationAssignment) {
    if let Err(e) = assignment.verify(graph) {
        panic!("infeasible assignment {:?}: {}", assignment.stations, e);
    }
    for (k, load) in assignment.loads.iter().enumerate() {
        assert!(
            *load <= assignment.cycle_time + 1e-9,
            "station {} carries {} over {}",
            k + 1,
            load,
            assignment.cycle_time
        );
    }
}
