use serde::{Deserialize, Serialize};
use std::fmt;

/// Gym contests live under their own url namespace but otherwise behave like
/// regular rounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContestKind {
    Contest,
    Gym,
}

impl ContestKind {
    pub fn namespace(self) -> &'static str {
        match self {
            ContestKind::Contest => "contest",
            ContestKind::Gym => "gym",
        }
    }
    /// Gym ids start at 100000.
    pub fn guess(contest: u64) -> Self {
        if contest >= 100_000 {
            ContestKind::Gym
        } else {
            ContestKind::Contest
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ProblemRef {
    pub kind: ContestKind,
    pub contest: u64,
    pub index: String,
}

impl ProblemRef {
    pub fn new(kind: ContestKind, contest: u64, index: impl Into<String>) -> Self {
        Self {
            kind,
            contest,
            index: index.into(),
        }
    }
    pub fn problem_path(&self) -> String {
        format!(
            "{}/{}/problem/{}",
            self.kind.namespace(),
            self.contest,
            self.index
        )
    }
    pub fn problemset_path(&self) -> String {
        format!("problemset/problem/{}/{}", self.contest, self.index)
    }
}

impl fmt::Display for ProblemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            ContestKind::Contest => "Contest",
            ContestKind::Gym => "Gym",
        };
        write!(f, "{}-{}{}", prefix, self.contest, self.index)
    }
}

pub fn dashboard_path(kind: ContestKind, contest: u64) -> String {
    format!("{}/{}", kind.namespace(), contest)
}
pub fn submit_path(kind: ContestKind, contest: u64) -> String {
    format!("{}/{}/submit", kind.namespace(), contest)
}
pub fn my_submissions_path(kind: ContestKind, contest: u64) -> String {
    format!("{}/{}/my", kind.namespace(), contest)
}
pub fn submission_path(kind: ContestKind, contest: u64, id: u64) -> String {
    format!("{}/{}/submission/{}", kind.namespace(), contest, id)
}
