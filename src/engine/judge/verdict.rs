use crate::api::types::Submission;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

static ON_TEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)on (?:pre)?test\s+(\d+)").expect("invalid test number regex"));

/// Outcome of judging. Text the judge invents that we do not know about is
/// kept as is in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Ok,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    CompilationError,
    PresentationError,
    IdlenessLimitExceeded,
    Challenged,
    Other(String),
}

impl Verdict {
    /// Canonical api code, `OK`, `WRONG_ANSWER`...
    pub fn code(&self) -> &str {
        match self {
            Verdict::Ok => "OK",
            Verdict::WrongAnswer => "WRONG_ANSWER",
            Verdict::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            Verdict::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            Verdict::RuntimeError => "RUNTIME_ERROR",
            Verdict::CompilationError => "COMPILATION_ERROR",
            Verdict::PresentationError => "PRESENTATION_ERROR",
            Verdict::IdlenessLimitExceeded => "IDLENESS_LIMIT_EXCEEDED",
            Verdict::Challenged => "CHALLENGED",
            Verdict::Other(s) => s.as_str(),
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "OK" => Verdict::Ok,
            "WRONG_ANSWER" => Verdict::WrongAnswer,
            "TIME_LIMIT_EXCEEDED" => Verdict::TimeLimitExceeded,
            "MEMORY_LIMIT_EXCEEDED" => Verdict::MemoryLimitExceeded,
            "RUNTIME_ERROR" => Verdict::RuntimeError,
            "COMPILATION_ERROR" => Verdict::CompilationError,
            "PRESENTATION_ERROR" => Verdict::PresentationError,
            "IDLENESS_LIMIT_EXCEEDED" => Verdict::IdlenessLimitExceeded,
            "CHALLENGED" => Verdict::Challenged,
            other => Verdict::Other(other.to_string()),
        }
    }

    /// Maps what the status pages print, e.g. `Wrong answer on test 3`.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        let lower = text.to_lowercase();
        let starts = |p: &str| lower.starts_with(p);
        if starts("accepted") || starts("pretests passed") || starts("perfect result") {
            Verdict::Ok
        } else if starts("wrong answer") {
            Verdict::WrongAnswer
        } else if starts("time limit exceeded") {
            Verdict::TimeLimitExceeded
        } else if starts("memory limit exceeded") {
            Verdict::MemoryLimitExceeded
        } else if starts("runtime error") {
            Verdict::RuntimeError
        } else if starts("compilation error") {
            Verdict::CompilationError
        } else if starts("presentation error") {
            Verdict::PresentationError
        } else if starts("idleness limit exceeded") {
            Verdict::IdlenessLimitExceeded
        } else if starts("hacked") || starts("challenged") {
            Verdict::Challenged
        } else {
            Verdict::Other(text.to_string())
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Ok => "Accepted",
            Verdict::WrongAnswer => "Wrong answer",
            Verdict::TimeLimitExceeded => "Time limit exceeded",
            Verdict::MemoryLimitExceeded => "Memory limit exceeded",
            Verdict::RuntimeError => "Runtime error",
            Verdict::CompilationError => "Compilation error",
            Verdict::PresentationError => "Presentation error",
            Verdict::IdlenessLimitExceeded => "Idleness limit exceeded",
            Verdict::Challenged => "Hacked",
            Verdict::Other(s) => s.as_str(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeState {
    Queued,
    Running,
    Terminal(Verdict),
}

impl JudgeState {
    /// Status cell text to state. Pure, so the polling loop can be tested
    /// without a network.
    pub fn classify(status: &str) -> Self {
        let lower = status.trim().to_lowercase();
        if lower.is_empty()
            || lower.starts_with("in queue")
            || lower.starts_with("waiting")
            || lower.starts_with("pending")
        {
            JudgeState::Queued
        } else if lower.starts_with("running")
            || lower.starts_with("testing")
            || lower.starts_with("compiling")
            || lower.starts_with("judging")
        {
            JudgeState::Running
        } else {
            JudgeState::Terminal(Verdict::from_text(status))
        }
    }
    pub fn is_terminal(&self) -> bool {
        matches!(self, JudgeState::Terminal(_))
    }
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            JudgeState::Terminal(v) => Some(v),
            _ => None,
        }
    }
}

/// `... on test N` means N - 1 tests passed.
pub fn passed_tests_from_text(status: &str) -> Option<u32> {
    ON_TEST
        .captures(status)
        .and_then(|c| c[1].parse::<u32>().ok())
        .map(|n| n.saturating_sub(1))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub id: u64,
    pub contest_id: u64,
    pub problem_index: String,
    pub verdict: Option<Verdict>,
    pub time: Duration,
    pub memory_bytes: u64,
    pub passed_test_count: u32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub status: String,
}

impl SubmissionResult {
    pub fn state(&self) -> JudgeState {
        match &self.verdict {
            Some(v) => JudgeState::Terminal(v.clone()),
            None => JudgeState::classify(&self.status),
        }
    }
    pub fn is_accepted(&self) -> bool {
        self.verdict == Some(Verdict::Ok)
    }
}

impl From<&Submission> for SubmissionResult {
    fn from(s: &Submission) -> Self {
        let (verdict, status) = match s.verdict.as_deref() {
            None => (None, "In queue".to_string()),
            Some("TESTING") => (None, "Running".to_string()),
            Some(code) => {
                let v = Verdict::from_code(code);
                let status = v.to_string();
                (Some(v), status)
            }
        };
        Self {
            id: s.id,
            contest_id: s.contest_id.or(s.problem.contest_id).unwrap_or_default(),
            problem_index: s.problem.index.clone(),
            verdict,
            time: Duration::from_millis(s.time_consumed_millis),
            memory_bytes: s.memory_consumed_bytes,
            passed_test_count: s.passed_test_count,
            submitted_at: Utc.timestamp_opt(s.creation_time_seconds, 0).single(),
            status,
        }
    }
}
