//! Problem pages. Selectors live in a swappable table, extraction in
//! `problem`, and the text helpers in `text` are shared with the submission
//! status pages.

pub mod problem;
pub mod selectors;
pub mod text;

pub use problem::{PageParser, ParsedProblem, ProblemSummary, Sample, StructureReport};
pub use selectors::{CodeforcesSelectors, Region, SelectorSet};
