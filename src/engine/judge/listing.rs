//! Submission status pages: the `my` listing of a contest and the page of a
//! single submission.

use super::verdict::{passed_tests_from_text, JudgeState, SubmissionResult, Verdict};
use crate::parser::text::{collapse_whitespace, parse_memory_bytes, parse_time_ms};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("invalid listing selector")
}

static ROW: Lazy<Selector> = Lazy::new(|| selector("tr[data-submission-id]"));
static STATUS: Lazy<Selector> = Lazy::new(|| selector("td.status-cell"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("td.time-consumed-cell"));
static MEMORY: Lazy<Selector> = Lazy::new(|| selector("td.memory-consumed-cell"));
static PROBLEM: Lazy<Selector> = Lazy::new(|| selector(r#"a[href*="/problem/"]"#));
static SENT: Lazy<Selector> = Lazy::new(|| selector("span.format-time"));
static PASSED: Lazy<Selector> = Lazy::new(|| selector("td.passed-test-count-cell"));
static BANNER: Lazy<Selector> = Lazy::new(|| selector(r#"span[class*="verdict-"]"#));
static TABLE_ROW: Lazy<Selector> = Lazy::new(|| selector("table tr"));
static CELL: Lazy<Selector> = Lazy::new(|| selector("td"));
static HEADER_CELL: Lazy<Selector> = Lazy::new(|| selector("th"));

/// Site times are printed in Moscow time unless the account picked another
/// zone.
const SITE_OFFSET_SECS: i32 = 3 * 3600;

fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn cell(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector).next().map(text_of)
}

/// `Oct/19/2026 12:34` in site time.
pub fn parse_site_time(text: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), "%b/%d/%Y %H:%M").ok()?;
    let offset = FixedOffset::east_opt(SITE_OFFSET_SECS)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|t| t.with_timezone(&Utc))
}

fn problem_index(row: ElementRef<'_>) -> String {
    row.select(&PROBLEM)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| href.rsplit('/').next())
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn result_from_status(status: &str) -> (Option<Verdict>, u32) {
    match JudgeState::classify(status) {
        JudgeState::Terminal(v) => {
            let passed = passed_tests_from_text(status).unwrap_or(0);
            (Some(v), passed)
        }
        _ => (None, 0),
    }
}

/// Rows of a submission listing, newest first as the site orders them.
pub fn parse_listing(html: &str, contest_id: u64) -> Vec<SubmissionResult> {
    let document = Html::parse_document(html);
    document
        .select(&ROW)
        .filter_map(|row| {
            let id = row.value().attr("data-submission-id")?.trim().parse::<u64>().ok()?;
            let status = cell(row, &STATUS).unwrap_or_default();
            let (verdict, mut passed) = result_from_status(&status);
            if let Some(n) = cell(row, &PASSED).and_then(|t| t.parse::<u32>().ok()) {
                passed = n;
            }
            Some(SubmissionResult {
                id,
                contest_id,
                problem_index: problem_index(row),
                verdict,
                time: Duration::from_millis(cell(row, &TIME).map_or(0, |t| parse_time_ms(&t))),
                memory_bytes: cell(row, &MEMORY).map_or(0, |t| parse_memory_bytes(&t)),
                passed_test_count: passed,
                submitted_at: cell(row, &SENT).and_then(|t| parse_site_time(&t)),
                status,
            })
        })
        .collect()
}

fn banner_state(class: &str, text: &str) -> JudgeState {
    if class.contains("verdict-waiting") {
        match JudgeState::classify(text) {
            JudgeState::Terminal(_) => JudgeState::Running,
            state => state,
        }
    } else if class.contains("verdict-accepted") {
        JudgeState::Terminal(Verdict::Ok)
    } else {
        JudgeState::Terminal(Verdict::from_text(text))
    }
}

/// The page of one submission. `None` when it has no verdict banner at all.
pub fn parse_submission_page(html: &str, id: u64, contest_id: u64) -> Option<SubmissionResult> {
    let document = Html::parse_document(html);
    let banner = document.select(&BANNER).next()?;
    let status = text_of(banner);
    let state = banner_state(banner.value().attr("class").unwrap_or_default(), &status);

    let mut result = SubmissionResult {
        id,
        contest_id,
        problem_index: String::new(),
        verdict: state.verdict().cloned(),
        time: Duration::ZERO,
        memory_bytes: 0,
        passed_test_count: if state.is_terminal() {
            passed_tests_from_text(&status).unwrap_or(0)
        } else {
            0
        },
        submitted_at: None,
        status,
    };
    // Row of the results table that holds the banner, and the header row
    // above it.
    let rows: Vec<ElementRef<'_>> = document.select(&TABLE_ROW).collect();
    let at = rows.iter().position(|row| {
        row.select(&BANNER).next().is_some() && row.select(&CELL).next().is_some()
    });
    if let Some(at) = at {
        let row = rows[at];
        result.problem_index = problem_index(row);
        result.submitted_at = cell(row, &SENT).and_then(|t| parse_site_time(&t));
        let columns: Vec<String> = rows[..at]
            .iter()
            .rev()
            .find(|r| r.select(&HEADER_CELL).next().is_some())
            .map(|h| h.select(&HEADER_CELL).map(|c| text_of(c).to_lowercase()).collect())
            .unwrap_or_default();
        let cells: Vec<String> = row.select(&CELL).map(text_of).collect();
        let time = column_or_unit(&columns, &cells, "time", &["ms"]);
        let memory = column_or_unit(&columns, &cells, "memory", &["kb", "mb"]);
        result.time = Duration::from_millis(time.map_or(0, parse_time_ms));
        result.memory_bytes = memory.map_or(0, parse_memory_bytes);
    }
    Some(result)
}

/// The cell under the header starting with `header`. Without a header row,
/// the first cell that is a number followed by one of `units`.
fn column_or_unit<'a>(
    columns: &[String],
    cells: &'a [String],
    header: &str,
    units: &[&str],
) -> Option<&'a str> {
    if let Some(i) = columns.iter().position(|c| c.starts_with(header)) {
        return cells.get(i).map(String::as_str);
    }
    cells
        .iter()
        .find(|text| {
            let lower = text.to_lowercase();
            lower.starts_with(|c: char| c.is_ascii_digit())
                && units.iter().any(|u| lower.ends_with(u))
        })
        .map(String::as_str)
}
