use super::types::{Problem, ProblemKey, Submission};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemFilter {
    pub tags: Vec<String>,
    pub min_rating: Option<u32>,
    pub max_rating: Option<u32>,
    /// Drop problems this handle already has an accepted submission for.
    pub exclude_solved_by: Option<String>,
}

impl ProblemFilter {
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_rating(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_rating = min;
        self.max_rating = max;
        self
    }
    pub fn excluding_solved_by(mut self, handle: impl Into<String>) -> Self {
        self.exclude_solved_by = Some(handle.into());
        self
    }
}

/// Unrated problems never match a bounded range.
pub fn by_rating(problems: Vec<Problem>, min: Option<u32>, max: Option<u32>) -> Vec<Problem> {
    if min.is_none() && max.is_none() {
        return problems;
    }
    problems
        .into_iter()
        .filter(|p| match p.rating {
            Some(r) => min.map_or(true, |m| r >= m) && max.map_or(true, |m| r <= m),
            None => false,
        })
        .collect()
}

/// Keeps problems carrying every tag in `tags` (case-insensitive).
pub fn by_tags(problems: Vec<Problem>, tags: &[String]) -> Vec<Problem> {
    if tags.is_empty() {
        return problems;
    }
    problems
        .into_iter()
        .filter(|p| {
            tags.iter()
                .all(|want| p.tags.iter().any(|have| have.eq_ignore_ascii_case(want)))
        })
        .collect()
}

pub fn solved_set(submissions: &[Submission]) -> HashSet<ProblemKey> {
    submissions
        .iter()
        .filter(|s| s.verdict.as_deref() == Some("OK"))
        .filter_map(|s| s.problem.key())
        .collect()
}

pub fn excluding_solved(problems: Vec<Problem>, solved: &HashSet<ProblemKey>) -> Vec<Problem> {
    problems
        .into_iter()
        .filter(|p| p.key().map_or(true, |k| !solved.contains(&k)))
        .collect()
}
