use crate::decoder::StationAssignment;
use crate::graph::TaskGraph;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Ranking key: fewer stations first, then higher line efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quality {
    pub stations: usize,
    pub efficiency: f64,
}

impl Quality {
    /// `Less` means `self` ranks ahead of `other`.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.stations
            .cmp(&other.stations)
            .then_with(|| other.efficiency.total_cmp(&self.efficiency))
    }

    pub fn is_better_than(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Less
    }

    pub fn is_no_worse_than(&self, other: &Self) -> bool {
        self.rank_cmp(other) != Ordering::Greater
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stations @ {:.2}%", self.stations, self.efficiency)
    }
}

/// How many ranked results a run hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOut", into = "RawOut")]
pub enum OutLimit {
    Count(usize),
    All,
}

impl OutLimit {
    pub fn cap(&self) -> Option<usize> {
        match self {
            Self::Count(n) => Some(*n),
            Self::All => None,
        }
    }
}

impl Default for OutLimit {
    fn default() -> Self {
        Self::Count(1)
    }
}

impl fmt::Display for OutLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{}", n),
            Self::All => f.write_str("all"),
        }
    }
}

impl FromStr for OutLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Self::Count(n)),
            _ => Err(format!("'{}' is neither a positive integer nor 'all'", s)),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawOut {
    Count(usize),
    Text(String),
}

impl TryFrom<RawOut> for OutLimit {
    type Error = String;

    fn try_from(raw: RawOut) -> Result<Self, Self::Error> {
        match raw {
            RawOut::Count(n) => n.to_string().parse(),
            RawOut::Text(s) => s.parse(),
        }
    }
}

impl From<OutLimit> for RawOut {
    fn from(out: OutLimit) -> Self {
        match out {
            OutLimit::Count(n) => RawOut::Count(n),
            OutLimit::All => RawOut::Text("all".into()),
        }
    }
}

/// A decoded assignment together with its ranking key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub assignment: StationAssignment,
    pub quality: Quality,
}

impl Candidate {
    pub fn new(graph: &TaskGraph, assignment: StationAssignment) -> Self {
        let quality = assignment.quality(graph);
        Self {
            assignment,
            quality,
        }
    }
}

// Total order: quality, then the station lists themselves. Two candidates
// compare equal exactly when their stations are identical.
fn ranking(a: &Candidate, b: &Candidate) -> Ordering {
    a.quality
        .rank_cmp(&b.quality)
        .then_with(|| a.assignment.stations.cmp(&b.assignment.stations))
}

/// Ranked, duplicate-free collection of candidates, capped by an [`OutLimit`].
///
/// Pools are plain values: workers fill their own and the results are
/// combined with [`CandidatePool::merge`], which gives the same pool no
/// matter how the inputs were split.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePool {
    limit: OutLimit,
    entries: Vec<Candidate>,
}

impl CandidatePool {
    pub fn new(limit: OutLimit) -> Self {
        Self {
            limit,
            entries: Vec::new(),
        }
    }

    pub fn limit(&self) -> OutLimit {
        self.limit
    }

    /// Returns false when the candidate was a duplicate or ranked below the cap.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        let pos = match self.entries.binary_search_by(|c| ranking(c, &candidate)) {
            Ok(_) => return false,
            Err(pos) => pos,
        };
        if let Some(cap) = self.limit.cap() {
            if pos >= cap {
                return false;
            }
            self.entries.insert(pos, candidate);
            self.entries.truncate(cap);
        } else {
            self.entries.insert(pos, candidate);
        }
        true
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.extend(other.entries);
        self
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.entries.iter()
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.entries
    }

    pub fn into_assignments(self) -> Vec<StationAssignment> {
        self.entries.into_iter().map(|c| c.assignment).collect()
    }
}

impl Extend<Candidate> for CandidatePool {
    fn extend<I: IntoIterator<Item = Candidate>>(&mut self, iter: I) {
        for candidate in iter {
            self.insert(candidate);
        }
    }
}

impl<'a> IntoIterator for &'a CandidatePool {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use crate::graph::{Task, TaskGraph};

    fn graph() -> TaskGraph {
        TaskGraph::build(&[
            Task::new(1, &[], 2.0),
            Task::new(2, &[], 3.0),
            Task::new(3, &[], 4.0),
        ])
        .unwrap()
    }

    fn candidate(g: &TaskGraph, order: &[u32]) -> Candidate {
        Candidate::new(g, decode(g, order, 5.0).unwrap())
    }

    #[test]
    fn keeps_best_k_without_duplicates() {
        let g = graph();
        let mut pool = CandidatePool::new(OutLimit::Count(2));
        assert!(pool.insert(candidate(&g, &[1, 2, 3])));
        assert!(!pool.insert(candidate(&g, &[1, 2, 3])));
        pool.insert(candidate(&g, &[1, 3, 2]));
        pool.insert(candidate(&g, &[3, 1, 2]));
        assert_eq!(pool.len(), 2);
        // [1,2],[3] and [3],[1,2] take two stations; [1],[3],[2] takes three.
        assert!(pool.iter().all(|c| c.quality.stations == 2));
    }

    #[test]
    fn merge_is_independent_of_split() {
        let g = graph();
        let orders: Vec<Vec<u32>> = vec![
            vec![1, 2, 3],
            vec![1, 3, 2],
            vec![2, 1, 3],
            vec![2, 3, 1],
            vec![3, 1, 2],
            vec![3, 2, 1],
        ];
        let fill = |chunk: &[Vec<u32>]| {
            let mut p = CandidatePool::new(OutLimit::Count(3));
            p.extend(chunk.iter().map(|o| candidate(&g, o)));
            p
        };
        let whole = fill(&orders);
        let split = fill(&orders[4..]).merge(fill(&orders[..4]));
        assert_eq!(whole, split);
    }

    #[test]
    fn out_limit_parses_counts_and_all() {
        assert_eq!("all".parse::<OutLimit>(), Ok(OutLimit::All));
        assert_eq!("4".parse::<OutLimit>(), Ok(OutLimit::Count(4)));
        assert!("0".parse::<OutLimit>().is_err());
        let json: OutLimit = serde_json::from_str("3").unwrap();
        assert_eq!(json, OutLimit::Count(3));
        assert_eq!(serde_json::to_string(&OutLimit::All).unwrap(), "\"all\"");
    }
}
