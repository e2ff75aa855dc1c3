use crate::config::Config;
use crate::decoder::{SideLabel, Station, StationAssignment};
use crate::error::{LbResult, LineError};
use crate::graph::{Task, TaskGraph, TaskId, Time};
use crate::loader;
use crate::metrics::LineMetrics;
use crate::optimizer::{
    improve, GeneticOptions, LocalSearchMode, LocalSearchOptions, ProgressCallback,
};
use crate::pool::{CandidatePool, OutLimit};
use crate::strategy::{Layout, Strategy};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// One ranked line of a report.
#[derive(Serialize, Debug, Clone)]
pub struct RankedLine {
    pub rank: usize,
    pub stations: Vec<Station>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sides: Option<Vec<(TaskId, SideLabel)>>,
    pub metrics: LineMetrics,
}

/// Outcome of a balancing run, ready for printing or export.
#[derive(Serialize, Debug, Clone)]
pub struct BalanceReport {
    pub method: String,
    pub layout: Layout,
    pub cycle_time: Time,
    pub total_work_time: Time,
    pub results: Vec<RankedLine>,
}

impl BalanceReport {
    fn from_pool(graph: &TaskGraph, method: String, layout: Layout, cycle_time: Time, pool: CandidatePool) -> Self {
        let results = pool
            .into_assignments()
            .into_iter()
            .enumerate()
            .map(|(k, a)| RankedLine {
                rank: k + 1,
                metrics: LineMetrics::measure(graph, &a.stations, cycle_time),
                sides: a.sides.as_ref().map(|labels| a.order().into_iter().zip(labels.iter().copied()).collect()),
                stations: a.stations,
            })
            .collect();
        Self {
            method,
            layout,
            cycle_time,
            total_work_time: graph.total_duration(),
            results,
        }
    }

    pub fn best(&self) -> Option<&RankedLine> {
        self.results.first()
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> LbResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Library entry point: a validated task graph plus the operations the
/// command line exposes.
pub struct LineBalancer {
    graph: TaskGraph,
}

impl LineBalancer {
    pub fn new(tasks: &[Task]) -> LbResult<Self> {
        Ok(Self {
            graph: TaskGraph::build(tasks)?,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> LbResult<Self> {
        Self::new(&loader::load_tasks(path)?)
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn resolve_cycle_time(&self, cfg: &Config) -> Time {
        cfg.resolve_cycle_time(&self.graph)
    }

    /// Runs the configured constructor, then the configured local search
    /// on straight lines built by a priority rule.
    pub fn balance(&self, cfg: &Config) -> LbResult<BalanceReport> {
        cfg.validate()?;
        let cycle_time = self.resolve_cycle_time(cfg);
        let layout = Layout::from_flag(cfg.line.u_shaped);
        let strategy = Strategy::from_config(cfg);
        info!(method = %strategy.name(), %layout, cycle_time, tasks = self.graph.len(), "balancing");

        let mut pool = strategy.produce(&self.graph, cycle_time, layout)?;

        match (&strategy, layout, cfg.search.local_search) {
            (Strategy::Heuristic(_), Layout::Straight, Some(mode)) => {
                let options = LocalSearchOptions::from_config(cfg, mode);
                let seeds: Vec<StationAssignment> = pool.iter().map(|c| c.assignment.clone()).collect();
                // A priority rule yields one line; widen to the configured `out`.
                pool = CandidatePool::new(cfg.search.out).merge(pool);
                for seed in &seeds {
                    pool = pool.merge(improve(&self.graph, seed, cycle_time, &options)?);
                }
            }
            (Strategy::Heuristic(_), Layout::UShaped, Some(mode)) => {
                warn!(%mode, "local search after a priority rule is only run on straight lines");
            }
            _ => {}
        }

        Ok(BalanceReport::from_pool(&self.graph, strategy.name(), layout, cycle_time, pool))
    }

    /// Genetic search with per-generation progress.
    pub fn genetic<CB: ProgressCallback>(&self, cfg: &Config, callback: CB) -> LbResult<BalanceReport> {
        cfg.validate()?;
        let cycle_time = self.resolve_cycle_time(cfg);
        let layout = Layout::from_flag(cfg.line.u_shaped);
        let strategy = Strategy::Genetic(GeneticOptions::from(cfg));
        let pool = strategy.produce_with(&self.graph, cycle_time, layout, callback)?;
        Ok(BalanceReport::from_pool(&self.graph, strategy.name(), layout, cycle_time, pool))
    }

    /// Metrics for a hand-written straight line, after checking it.
    pub fn metrics(&self, stations: Vec<Station>, cycle_time: Time) -> LbResult<LineMetrics> {
        let assignment = StationAssignment::from_stations(&self.graph, stations, cycle_time)?;
        Ok(LineMetrics::measure(&self.graph, &assignment.stations, cycle_time))
    }

    /// Local search around a hand-written straight line.
    pub fn improve(
        &self,
        stations: Vec<Station>,
        cycle_time: Time,
        mode: LocalSearchMode,
        cfg: &Config,
    ) -> LbResult<BalanceReport> {
        let assignment = StationAssignment::from_stations(&self.graph, stations, cycle_time)?;
        let options = LocalSearchOptions::from_config(cfg, mode);
        let pool = improve(&self.graph, &assignment, cycle_time, &options)?;
        Ok(BalanceReport::from_pool(&self.graph, mode.to_string(), Layout::Straight, cycle_time, pool))
    }
}

/// Parses `"1,3,2,6|5,4,7|8,9"` into stations.
pub fn parse_stations(s: &str) -> LbResult<Vec<Station>> {
    s.split('|')
        .map(|station| {
            station
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(|t| {
                    t.parse::<TaskId>().map_err(|_| {
                        LineError::InvalidSequence(format!("'{}' is not a task id", t))
                    })
                })
                .collect::<LbResult<Station>>()
        })
        .collect()
}

/// Quick balancing of a task list with default settings.
pub fn balance_tasks(tasks: &[Task], cycle_time: Time) -> LbResult<Vec<Station>> {
    let mut cfg = Config::default();
    cfg.line.cycle_time = Some(cycle_time);
    cfg.search.out = OutLimit::Count(1);
    let report = LineBalancer::new(tasks)?.balance(&cfg)?;
    report
        .results
        .into_iter()
        .next()
        .map(|line| line.stations)
        .ok_or_else(|| LineError::InvalidSequence("no assignment produced".into()))
}
