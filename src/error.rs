use crate::graph::{TaskId, Time};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LineError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Task Definition Error: {0}")]
    InvalidTask(String),

    #[error("Precedence cycle detected through task {task}")]
    CyclicPrecedence { task: TaskId },

    #[error("Task {task} references unknown predecessor {predecessor}")]
    UnknownPredecessor { task: TaskId, predecessor: TaskId },

    #[error("Task {task} takes {duration} but the cycle time is {cycle_time}")]
    InfeasibleOrder {
        task: TaskId,
        duration: Time,
        cycle_time: Time,
    },

    #[error("Invalid Sequence: {0}")]
    InvalidSequence(String),
}

pub type LbResult<T> = Result<T, LineError>;
