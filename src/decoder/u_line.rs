use super::{StationAssignment, StationBuilder};
use crate::error::{LbResult, LineError};
use crate::graph::{TaskGraph, TaskId, Time};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// End of a U-shaped line a task is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
pub enum Side {
    #[strum(serialize = "F", serialize = "front")]
    Front,
    #[strum(serialize = "B", serialize = "back")]
    Back,
}

/// Reported placement of a task on a U-shaped line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum SideLabel {
    #[serde(rename = "F")]
    #[strum(serialize = "F")]
    Front,
    #[serde(rename = "B")]
    #[strum(serialize = "B")]
    Back,
    #[serde(rename = "F-B")]
    #[strum(serialize = "F-B")]
    Either,
}

/// One commit of a U-line unfolding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UStep {
    pub task: TaskId,
    pub side: Side,
}

impl UStep {
    pub fn new(task: TaskId, side: Side) -> Self {
        Self { task, side }
    }
}

/// Packs a U-line commit sequence into stations.
///
/// A front commit needs every predecessor committed already, a back commit
/// every successor. Each task is labelled `F-B` when both ends were open to
/// it at commit time, otherwise with the side it was taken from.
pub fn decode_u(graph: &TaskGraph, steps: &[UStep], cycle_time: Time) -> LbResult<StationAssignment> {
    graph.check_cycle_time(cycle_time)?;
    if steps.len() != graph.len() {
        return Err(LineError::InvalidSequence(format!(
            "sequence has {} entries, expected {}",
            steps.len(),
            graph.len()
        )));
    }

    let mut committed = vec![false; graph.len()];
    let mut labels = Vec::with_capacity(steps.len());
    let mut builder = StationBuilder::new(cycle_time);

    for step in steps {
        let i = graph.require(step.task)?;
        if committed[i] {
            return Err(LineError::InvalidSequence(format!(
                "task {} appears twice",
                step.task
            )));
        }
        let front_ok = graph.preds_at(i).iter().all(|&p| committed[p]);
        let back_ok = graph.succs_at(i).iter().all(|&s| committed[s]);

        let label = match (step.side, front_ok, back_ok) {
            (_, true, true) => SideLabel::Either,
            (Side::Front, true, false) => SideLabel::Front,
            (Side::Back, false, true) => SideLabel::Back,
            (side, _, _) => {
                return Err(LineError::InvalidSequence(format!(
                    "task {} is not available from the {:?} side",
                    step.task, side
                )))
            }
        };

        committed[i] = true;
        labels.push(label);
        builder.push(step.task, graph.duration_at(i));
    }

    let mut assignment = builder.finish();
    assignment.sides = Some(labels);
    Ok(assignment)
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
    fn back_commits_need_successors() {
        let g = chain();
        let steps = [
            UStep::new(3, Side::Back),
            UStep::new(1, Side::Front),
            UStep::new(2, Side::Front),
        ];
        let a = decode_u(&g, &steps, 5.0).unwrap();
        assert_eq!(a.stations, vec![vec![3], vec![1, 2]]);
        assert_eq!(
            a.sides,
            Some(vec![SideLabel::Back, SideLabel::Front, SideLabel::Either])
        );
        assert!(a.verify(&g).is_ok());
    }

    #[test]
    fn rejects_back_commit_with_open_successors() {
        let g = chain();
        let steps = [
            UStep::new(2, Side::Back),
            UStep::new(1, Side::Front),
            UStep::new(3, Side::Front),
        ];
        assert!(matches!(
            decode_u(&g, &steps, 5.0),
            Err(LineError::InvalidSequence(_))
        ));
    }

    #[test]
    fn side_labels_render_as_letters() {
        assert_eq!(SideLabel::Either.to_string(), "F-B");
        assert_eq!("B".parse::<Side>().unwrap(), Side::Back);
    }
}
