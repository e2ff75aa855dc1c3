//! Scalar line metrics over a station list.
//!
//! All functions take the station list as plain ids so they work for
//! hand-written lines as well as decoded assignments.

use crate::graph::{TaskGraph, TaskId, Time};
use serde::Serialize;

pub fn station_time(graph: &TaskGraph, station: &[TaskId]) -> Time {
    station.iter().filter_map(|&id| graph.duration(id)).sum()
}

pub fn total_work_time(graph: &TaskGraph, stations: &[Vec<TaskId>]) -> Time {
    stations.iter().map(|s| station_time(graph, s)).sum()
}

fn busiest(graph: &TaskGraph, stations: &[Vec<TaskId>]) -> Time {
    stations
        .iter()
        .map(|s| station_time(graph, s))
        .fold(0.0, Time::max)
}

/// sqrt of the summed squared idle time relative to the busiest station.
pub fn smoothness_index(graph: &TaskGraph, stations: &[Vec<TaskId>]) -> f64 {
    let max = busiest(graph, stations);
    stations
        .iter()
        .map(|s| {
            let idle = max - station_time(graph, s);
            idle * idle
        })
        .sum::<f64>()
        .sqrt()
}

/// `100 - 100 * SI / (n * c)`. A zero cycle time falls back to the busiest station.
pub fn line_efficiency(graph: &TaskGraph, stations: &[Vec<TaskId>], cycle_time: Time) -> f64 {
    if stations.is_empty() {
        return 0.0;
    }
    let c = effective_cycle_time(graph, stations, cycle_time);
    if c <= 0.0 {
        return 100.0;
    }
    100.0 - 100.0 * smoothness_index(graph, stations) / (stations.len() as f64 * c)
}

pub fn loss_of_balance(graph: &TaskGraph, stations: &[Vec<TaskId>], cycle_time: Time) -> f64 {
    100.0 - line_efficiency(graph, stations, cycle_time)
}

/// Total work content over installed capacity, as a percentage.
pub fn utilization(graph: &TaskGraph, stations: &[Vec<TaskId>], cycle_time: Time) -> f64 {
    if stations.is_empty() {
        return 0.0;
    }
    let c = effective_cycle_time(graph, stations, cycle_time);
    if c <= 0.0 {
        return 100.0;
    }
    100.0 * total_work_time(graph, stations) / (stations.len() as f64 * c)
}

fn effective_cycle_time(graph: &TaskGraph, stations: &[Vec<TaskId>], cycle_time: Time) -> Time {
    if cycle_time > 0.0 {
        cycle_time
    } else {
        busiest(graph, stations)
    }
}

/// Every metric for one line, as printed and exported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineMetrics {
    pub stations: usize,
    pub cycle_time: Time,
    pub station_times: Vec<Time>,
    pub total_work_time: Time,
    pub line_efficiency: f64,
    pub smoothness_index: f64,
    pub loss_of_balance: f64,
    pub utilization: f64,
}

impl LineMetrics {
    pub fn measure(graph: &TaskGraph, stations: &[Vec<TaskId>], cycle_time: Time) -> Self {
        let efficiency = line_efficiency(graph, stations, cycle_time);
        Self {
            stations: stations.len(),
            cycle_time,
            station_times: stations.iter().map(|s| station_time(graph, s)).collect(),
            total_work_time: total_work_time(graph, stations),
            line_efficiency: efficiency,
            smoothness_index: smoothness_index(graph, stations),
            loss_of_balance: 100.0 - efficiency,
            utilization: utilization(graph, stations, cycle_time),
        }
    }
}
