use crate::consts::*;
use crate::error::{LbResult, LineError};
use crate::graph::{TaskGraph, Time};
use crate::optimizer::{LocalSearchMode, SelectionWeighting};
use crate::pool::OutLimit;
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Args, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub line: LineParams,
    #[command(flatten)]
    pub search: SearchParams,
    #[command(flatten)]
    pub genetic: GeneticParams,
}

/// Constructor used by the `balance` runs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[default]
    Lcr,
    Hb,
    Comsoal,
}

/// How the cycle time is derived when none is given.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CycleTimeRule {
    /// The longest task duration.
    #[default]
    MaxTask,
    /// Total work over a station estimate of max(2, floor(total / longest)),
    /// never below the longest task.
    StationEstimate,
}

impl CycleTimeRule {
    /// Never zero: a task set of zero-duration tasks gets
    /// `FALLBACK_CYCLE_TIME`.
    pub fn resolve(&self, graph: &TaskGraph) -> Time {
        let longest = graph.max_duration();
        if longest <= 0.0 {
            return FALLBACK_CYCLE_TIME;
        }
        match self {
            Self::MaxTask => longest,
            Self::StationEstimate => {
                let total = graph.total_duration();
                let stations = (total / longest).floor().max(2.0);
                (total / stations).max(longest)
            }
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineParams {
    /// Maximum work per station. Derived from the task set when omitted.
    #[arg(short = 'c', long)]
    pub cycle_time: Option<f64>,

    #[arg(long, default_value_t = CycleTimeRule::MaxTask)]
    pub cycle_time_rule: CycleTimeRule,

    /// Balance a U-shaped line (tasks may be placed from either end).
    #[arg(short = 'u', long, default_value_t = false)]
    pub u_shaped: bool,
}

impl Default for LineParams {
    fn default() -> Self {
        Self {
            cycle_time: None,
            cycle_time_rule: CycleTimeRule::MaxTask,
            u_shaped: false,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    #[arg(short = 'm', long, default_value_t = Method::Lcr)]
    pub method: Method,

    /// COMSOAL trials.
    #[arg(short = 'i', long, default_value_t = DEFAULT_ITERATIONS)]
    pub iteration: usize,

    #[arg(short = 'l', long)]
    pub local_search: Option<LocalSearchMode>,

    /// Number of ranked results to keep, or "all".
    #[arg(short = 'o', long, default_value_t = OutLimit::Count(1))]
    pub out: OutLimit,

    #[arg(long, default_value_t = SelectionWeighting::Uniform)]
    pub weighting: SelectionWeighting,

    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    /// Wall-clock budget in seconds.
    #[arg(short = 'T', long)]
    pub time_limit: Option<u64>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            method: Method::Lcr,
            iteration: DEFAULT_ITERATIONS,
            local_search: None,
            out: OutLimit::Count(1),
            weighting: SelectionWeighting::Uniform,
            seed: None,
            time_limit: None,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticParams {
    #[arg(long, default_value_t = DEFAULT_GENERATIONS)]
    pub generation: usize,
    /// Population size.
    #[arg(long, default_value_t = DEFAULT_POPULATION)]
    pub size: usize,
    #[arg(long, default_value_t = DEFAULT_P_MUTATION)]
    pub p_m: f64,
    #[arg(long, default_value_t = DEFAULT_P_CROSSOVER)]
    pub p_c: f64,
    #[arg(long, default_value_t = DEFAULT_ELITES)]
    pub elites: usize,
    #[arg(long, default_value_t = DEFAULT_TOURNAMENT)]
    pub tournament: usize,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            generation: DEFAULT_GENERATIONS,
            size: DEFAULT_POPULATION,
            p_m: DEFAULT_P_MUTATION,
            p_c: DEFAULT_P_CROSSOVER,
            elites: DEFAULT_ELITES,
            tournament: DEFAULT_TOURNAMENT,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> LbResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Copies every value the user typed on the command line over the
    /// file-provided base.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($section:ident . $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$section.$field = cli.$section.$field.clone();
                }
            };
        }

        update_if_present!(line.cycle_time);
        update_if_present!(line.cycle_time_rule);
        update_if_present!(line.u_shaped);

        update_if_present!(search.method);
        update_if_present!(search.iteration);
        update_if_present!(search.local_search);
        update_if_present!(search.out);
        update_if_present!(search.weighting);
        update_if_present!(search.seed);
        update_if_present!(search.time_limit);

        update_if_present!(genetic.generation);
        update_if_present!(genetic.size);
        update_if_present!(genetic.p_m);
        update_if_present!(genetic.p_c);
        update_if_present!(genetic.elites);
        update_if_present!(genetic.tournament);
    }

    pub fn validate(&self) -> LbResult<()> {
        if let Some(ct) = self.line.cycle_time {
            if !ct.is_finite() || ct <= 0.0 {
                return Err(LineError::Config(format!(
                    "cycle_time must be positive, got {}",
                    ct
                )));
            }
        }
        if self.search.iteration == 0 {
            return Err(LineError::Config("iteration must be positive".into()));
        }
        if self.search.out == OutLimit::Count(0) {
            return Err(LineError::Config("out must be positive or \"all\"".into()));
        }
        for (name, p) in [("p_m", self.genetic.p_m), ("p_c", self.genetic.p_c)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(LineError::Config(format!(
                    "{} must lie in [0, 1], got {}",
                    name, p
                )));
            }
        }
        if self.genetic.size == 0 {
            return Err(LineError::Config("size must be positive".into()));
        }
        if self.genetic.tournament == 0 {
            return Err(LineError::Config("tournament must be positive".into()));
        }
        Ok(())
    }

    /// The configured cycle time, or the one the rule derives from `graph`.
    pub fn resolve_cycle_time(&self, graph: &TaskGraph) -> Time {
        self.line
            .cycle_time
            .unwrap_or_else(|| self.line.cycle_time_rule.resolve(graph))
    }
}
