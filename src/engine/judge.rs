pub mod challenge;
pub mod csrf;
pub mod listing;
pub mod problem;
pub mod session;
pub mod submit;
pub mod verdict;

pub use problem::{ContestKind, ProblemRef};
pub use session::{AuthSession, BypassCookie};
pub use submit::SubmissionEngine;
pub use verdict::{JudgeState, SubmissionResult, Verdict};
