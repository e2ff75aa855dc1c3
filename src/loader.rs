//! Reading task lists from CSV and JSON files.

use crate::error::{LbResult, LineError};
use crate::graph::{Task, TaskId, Time, NO_PREDECESSOR};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Loads tasks from `path`, picking the format from the extension
/// (`.csv`, otherwise JSON).
pub fn load_tasks<P: AsRef<Path>>(path: P) -> LbResult<Vec<Task>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let tasks = if is_csv {
        parse_csv(File::open(path)?)?
    } else {
        parse_json(&fs::read_to_string(path)?)?
    };
    debug!(path = %path.display(), tasks = tasks.len(), "task list loaded");
    Ok(tasks)
}

/// CSV with an `id,predecessors,duration` header. Predecessors are
/// separated by `;` or whitespace; `0` or an empty cell means none.
pub fn parse_csv<R: Read>(reader: R) -> LbResult<Vec<Task>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut tasks = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let rec = record?;
        // Header is line 1.
        let line = row + 2;
        if rec.iter().all(|field| field.is_empty()) {
            continue;
        }
        if rec.len() < 3 {
            return Err(LineError::InvalidTask(format!(
                "line {}: expected id,predecessors,duration",
                line
            )));
        }

        let id = parse_id(&rec[0], line)?;
        let predecessors = rec[1]
            .split(|c: char| c == ';' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| parse_id(s, line))
            .collect::<LbResult<Vec<_>>>()?;
        let duration: Time = rec[2].parse().map_err(|_| {
            LineError::InvalidTask(format!("line {}: bad duration '{}'", line, &rec[2]))
        })?;

        tasks.push(Task::from((id, strip_sentinel(predecessors), duration)));
    }
    Ok(tasks)
}

fn parse_id(s: &str, line: usize) -> LbResult<TaskId> {
    s.trim()
        .parse()
        .map_err(|_| LineError::InvalidTask(format!("line {}: bad task id '{}'", line, s)))
}

fn strip_sentinel(mut predecessors: Vec<TaskId>) -> Vec<TaskId> {
    predecessors.retain(|&p| p != NO_PREDECESSOR);
    predecessors
}

#[derive(Deserialize)]
struct TaskRecord {
    id: TaskId,
    #[serde(alias = "time")]
    duration: Time,
    #[serde(default, alias = "dependencies")]
    predecessors: Vec<TaskId>,
}

#[derive(Deserialize)]
struct KeyedRecord {
    #[serde(alias = "time")]
    duration: Time,
    #[serde(default, alias = "dependencies")]
    predecessors: Vec<TaskId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TaskFile {
    Triples(Vec<(TaskId, Vec<TaskId>, Time)>),
    Records(Vec<TaskRecord>),
    Keyed(BTreeMap<String, KeyedRecord>),
}

/// JSON as `[id, [preds], duration]` triples, as `{id, time, dependencies}`
/// records, or as an object keyed by task id.
pub fn parse_json(content: &str) -> LbResult<Vec<Task>> {
    let file: TaskFile = serde_json::from_str(content)?;
    let tasks = match file {
        TaskFile::Triples(rows) => rows
            .into_iter()
            .map(|(id, preds, d)| Task::from((id, strip_sentinel(preds), d)))
            .collect(),
        TaskFile::Records(rows) => rows
            .into_iter()
            .map(|r| Task::from((r.id, strip_sentinel(r.predecessors), r.duration)))
            .collect(),
        TaskFile::Keyed(map) => {
            let mut tasks = Vec::with_capacity(map.len());
            for (key, r) in map {
                let id: TaskId = key.trim().parse().map_err(|_| {
                    LineError::InvalidTask(format!("object key '{}' is not a task id", key))
                })?;
                tasks.push(Task::from((id, strip_sentinel(r.predecessors), r.duration)));
            }
            tasks
        }
    };
    if tasks.is_empty() {
        warn!("task file contains no tasks");
    }
    Ok(tasks)
}
