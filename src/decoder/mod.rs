mod u_line;

pub use self::u_line::{decode_u, Side, SideLabel, UStep};

use crate::consts::fits;
use crate::error::{LbResult, LineError};
use crate::graph::{TaskGraph, TaskId, Time};
use crate::metrics;
use crate::pool::Quality;
use serde::{Deserialize, Serialize};

pub type Station = Vec<TaskId>;

/// Tasks packed into an ordered list of stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationAssignment {
    pub stations: Vec<Station>,
    pub cycle_time: Time,
    pub loads: Vec<Time>,
    /// Per-task side labels for U-shaped lines, parallel to `order()`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sides: Option<Vec<SideLabel>>,
}

impl StationAssignment {
    /// Wraps a hand-written station list after checking it against the graph.
    pub fn from_stations(
        graph: &TaskGraph,
        stations: Vec<Station>,
        cycle_time: Time,
    ) -> LbResult<Self> {
        graph.check_cycle_time(cycle_time)?;
        let loads = stations
            .iter()
            .map(|s| {
                s.iter()
                    .map(|&id| graph.duration(id).unwrap_or(0.0))
                    .sum::<Time>()
            })
            .collect();
        let assignment = Self {
            stations,
            cycle_time,
            loads,
            sides: None,
        };
        assignment.verify(graph)?;
        Ok(assignment)
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Stations concatenated in order.
    pub fn order(&self) -> Vec<TaskId> {
        self.stations.iter().flatten().copied().collect()
    }

    pub fn quality(&self, graph: &TaskGraph) -> Quality {
        Quality {
            stations: self.stations.len(),
            efficiency: metrics::line_efficiency(graph, &self.stations, self.cycle_time),
        }
    }

    /// Checks completeness, uniqueness, station capacity and precedence.
    ///
    /// Straight lines need every predecessor earlier in the concatenated
    /// order. U-shaped lines (when `sides` is set) need, for every task,
    /// either all predecessors or all successors committed before it.
    pub fn verify(&self, graph: &TaskGraph) -> LbResult<()> {
        let order = self.order();
        if order.len() != graph.len() {
            return Err(LineError::InvalidSequence(format!(
                "assignment covers {} tasks, expected {}",
                order.len(),
                graph.len()
            )));
        }

        for (k, station) in self.stations.iter().enumerate() {
            if station.is_empty() {
                return Err(LineError::InvalidSequence(format!("station {} is empty", k + 1)));
            }
            let load: Time = station
                .iter()
                .map(|&id| graph.duration(id).unwrap_or(0.0))
                .sum();
            if !fits(0.0, load, self.cycle_time) {
                return Err(LineError::InvalidSequence(format!(
                    "station {} carries {} beyond cycle time {}",
                    k + 1,
                    load,
                    self.cycle_time
                )));
            }
        }

        if self.sides.is_none() {
            return graph.position_map(&order).map(|_| ());
        }

        let mut committed = vec![false; graph.len()];
        for &id in &order {
            let i = graph.require(id)?;
            if committed[i] {
                return Err(LineError::InvalidSequence(format!("task {} appears twice", id)));
            }
            let front_ok = graph.preds_at(i).iter().all(|&p| committed[p]);
            let back_ok = graph.succs_at(i).iter().all(|&s| committed[s]);
            if !front_ok && !back_ok {
                return Err(LineError::InvalidSequence(format!(
                    "task {} committed before both its predecessors and successors",
                    id
                )));
            }
            committed[i] = true;
        }
        Ok(())
    }
}

/// Running state of a sequential station packer.
pub(crate) struct StationBuilder {
    cycle_time: Time,
    stations: Vec<Station>,
    loads: Vec<Time>,
    current: Station,
    load: Time,
}

impl StationBuilder {
    pub(crate) fn new(cycle_time: Time) -> Self {
        Self {
            cycle_time,
            stations: Vec::new(),
            loads: Vec::new(),
            current: Vec::new(),
            load: 0.0,
        }
    }

    /// Load already committed to the open station.
    pub(crate) fn load(&self) -> Time {
        self.load
    }

    pub(crate) fn fits(&self, duration: Time) -> bool {
        fits(self.load, duration, self.cycle_time)
    }

    /// Appends to the open station, opening a new one when the task does not fit.
    pub(crate) fn push(&mut self, id: TaskId, duration: Time) {
        if !self.current.is_empty() && !self.fits(duration) {
            self.close();
        }
        self.current.push(id);
        self.load += duration;
    }

    pub(crate) fn close(&mut self) {
        if self.current.is_empty() {
            return;
        }
        self.stations.push(std::mem::take(&mut self.current));
        self.loads.push(self.load);
        self.load = 0.0;
    }

    pub(crate) fn finish(mut self) -> StationAssignment {
        self.close();
        StationAssignment {
            stations: self.stations,
            cycle_time: self.cycle_time,
            loads: self.loads,
            sides: None,
        }
    }
}

/// Packs a precedence-respecting order into stations.
///
/// A task joins the open station when it fits the remaining capacity;
/// otherwise the station is closed and the task opens the next one.
pub fn decode(graph: &TaskGraph, order: &[TaskId], cycle_time: Time) -> LbResult<StationAssignment> {
    graph.check_cycle_time(cycle_time)?;
    graph.position_map(order)?;
    Ok(decode_trusted(graph, order, cycle_time))
}

/// `decode` without validation, for orders built by the optimizers.
pub(crate) fn decode_trusted(graph: &TaskGraph, order: &[TaskId], cycle_time: Time) -> StationAssignment {
    let mut builder = StationBuilder::new(cycle_time);
    for &id in order {
        builder.push(id, graph.duration(id).unwrap_or(0.0));
    }
    builder.finish()
}
