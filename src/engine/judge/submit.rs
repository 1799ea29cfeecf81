use super::{
    csrf::extract_csrf,
    listing::{parse_listing, parse_submission_page},
    problem::{my_submissions_path, submission_path, submit_path, ContestKind},
    session::AuthSession,
    verdict::SubmissionResult,
};
use crate::{
    config::{
        session::BFAA,
        submit::TAB_SIZE,
        ClientConfig,
    },
    error::{parse_error, AuthFailure, Error, Kind, Result, SubmitRejection},
    transport::{sleep_until, HttpRequest},
};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

static FTAA: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"input[name="ftaa"]"#).expect("invalid ftaa selector"));
static BFAA_INPUT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"input[name="bfaa"]"#).expect("invalid bfaa selector"));

static ERROR_SPAN: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.error").expect("invalid error span selector"));

const DUPLICATE: &[&str] = &["you have submitted exactly the same code before"];
const TOO_LONG: &[&str] = &["source code is too long", "source is too long"];
const NOT_PERMITTED: &[&str] = &["you are not allowed to submit", "submission is not allowed"];
const CONTEST_OVER: &[&str] = &["contest is over", "contest has finished", "contest has ended"];

/// Looks for a rejection message in the `span.error` elements of the page,
/// or in the whole body when the page has none.
fn rejection_in(body: &str) -> Option<SubmitRejection> {
    let document = Html::parse_document(body);
    let mut spans = document.select(&ERROR_SPAN).peekable();
    let lower = if spans.peek().is_some() {
        spans
            .map(|e| e.text().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase()
    } else {
        body.to_lowercase()
    };
    let has = |phrases: &[&str]| phrases.iter().any(|p| lower.contains(p));
    if has(DUPLICATE) {
        Some(SubmitRejection::Duplicate)
    } else if has(TOO_LONG) {
        Some(SubmitRejection::TooLong)
    } else if has(NOT_PERMITTED) {
        Some(SubmitRejection::NotPermitted)
    } else if has(CONTEST_OVER) {
        Some(SubmitRejection::ContestOver)
    } else {
        None
    }
}

/// Hidden fields of the submit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitForm {
    pub csrf_token: String,
    pub ftaa: Option<String>,
    pub bfaa: Option<String>,
}

pub fn parse_submit_form(html: &str) -> Result<SubmitForm> {
    let csrf_token = extract_csrf(html)?;
    let document = Html::parse_document(html);
    let value = |selector: &Selector| {
        document
            .select(selector)
            .filter_map(|e| e.value().attr("value"))
            .find(|v| !v.is_empty())
            .map(str::to_owned)
    };
    Ok(SubmitForm {
        csrf_token,
        ftaa: value(&FTAA),
        bfaa: value(&BFAA_INPUT),
    })
}

/// Decides what the answer to the submit POST means. A redirect is success;
/// so is a plain 200 unless it carries one of the known rejection messages.
pub fn classify_submit_response(status: u16, location: Option<&str>, body: &str) -> Result<()> {
    if (300..400).contains(&status) && location.is_some() {
        return Ok(());
    }
    if status == 200 {
        return match rejection_in(body) {
            Some(rejection) => Err(rejection.into()),
            None => Ok(()),
        };
    }
    Err(SubmitRejection::Failed {
        status,
        body: body.to_string(),
    }
    .into())
}

/// Submits solutions through an authenticated session and follows them until
/// judged. One submission at a time: the new submission is recognised as the
/// newest row of the caller's own listing.
pub struct SubmissionEngine {
    session: AuthSession,
    poll_interval: Duration,
    readback_delay: Duration,
}

impl SubmissionEngine {
    pub fn new(session: AuthSession, config: &ClientConfig) -> Result<Self> {
        if session.handle().is_none() {
            return Err(AuthFailure::MissingHandle.into());
        }
        if !session.is_authenticated() {
            return Err(AuthFailure::NotAuthenticated.into());
        }
        Ok(Self {
            session,
            poll_interval: config.poll_interval,
            readback_delay: config.readback_delay,
        })
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }
    pub fn session_mut(&mut self) -> &mut AuthSession {
        &mut self.session
    }
    pub fn into_session(self) -> AuthSession {
        self.session
    }

    pub async fn submit(
        &mut self,
        contest_id: u64,
        index: &str,
        language: &str,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult> {
        self.submit_to(ContestKind::Contest, contest_id, index, language, source, cancel)
            .await
    }

    pub async fn submit_gym(
        &mut self,
        contest_id: u64,
        index: &str,
        language: &str,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult> {
        self.submit_to(ContestKind::Gym, contest_id, index, language, source, cancel)
            .await
    }

    pub async fn submit_to(
        &mut self,
        kind: ContestKind,
        contest_id: u64,
        index: &str,
        language: &str,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult> {
        let path = submit_path(kind, contest_id);
        let form = parse_submit_form(&self.session.get_page(&path, cancel).await?)?;
        self.session.remember_csrf(&form.csrf_token);

        let ftaa = form
            .ftaa
            .unwrap_or_else(|| self.session.ftaa().to_string());
        let bfaa = form.bfaa.unwrap_or_else(|| BFAA.to_string());
        log::trace!(
            "submit form for {}: index={} language={} ftaa={} bfaa={}",
            path,
            index,
            language,
            ftaa,
            bfaa
        );
        let contest = contest_id.to_string();
        let fields: Vec<(String, String)> = vec![
            ("csrf_token", form.csrf_token.as_str()),
            ("ftaa", ftaa.as_str()),
            ("bfaa", bfaa.as_str()),
            ("action", "submitSolutionFormSubmitted"),
            ("submittedProblemIndex", index),
            ("programTypeId", language),
            ("contestId", contest.as_str()),
            ("source", source),
            ("tabSize", TAB_SIZE),
            ("sourceCodeConfirmed", "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut url = self.session.url(&path)?;
        url.query_pairs_mut()
            .append_pair("csrf_token", &form.csrf_token);
        let request = HttpRequest::post_form(url, fields).without_redirects();
        let response = self.session.send(request, cancel).await?;
        log::debug!("submit {} answered {}", path, response.status);
        classify_submit_response(response.status, response.location(), &response.text())?;

        sleep_until(Instant::now() + self.readback_delay, cancel).await?;
        self.newest(kind, contest_id, cancel).await
    }

    async fn listing(
        &self,
        kind: ContestKind,
        contest_id: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<SubmissionResult>> {
        let html = self
            .session
            .get_page(&my_submissions_path(kind, contest_id), cancel)
            .await?;
        Ok(parse_listing(&html, contest_id))
    }

    async fn newest(
        &self,
        kind: ContestKind,
        contest_id: u64,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult> {
        self.listing(kind, contest_id, cancel)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| parse_error("submission listing has no rows"))
    }

    /// Polls the listing until the submission reaches a verdict. The gym
    /// namespace is picked from the contest id.
    pub async fn wait_for_verdict(
        &self,
        submission_id: u64,
        contest_id: u64,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult> {
        self.wait_for_verdict_in(
            ContestKind::guess(contest_id),
            submission_id,
            contest_id,
            timeout,
            cancel,
        )
        .await
    }

    pub async fn wait_for_verdict_in(
        &self,
        kind: ContestKind,
        submission_id: u64,
        contest_id: u64,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult> {
        let deadline = Instant::now() + timeout;
        let mut next = Instant::now();
        let mut polls = 0u32;
        loop {
            sleep_until(next, cancel).await?;
            polls += 1;
            let row = self
                .listing(kind, contest_id, cancel)
                .await?
                .into_iter()
                .find(|r| r.id == submission_id);
            match row {
                Some(row) if row.state().is_terminal() => {
                    log::debug!("submission {} judged after {} polls", submission_id, polls);
                    return Ok(row);
                }
                Some(row) => log::debug!("submission {}: {}", submission_id, row.status),
                None => log::debug!("submission {} not listed yet", submission_id),
            }
            if Instant::now() >= deadline {
                return Err(Error::with_description(
                    Kind::Timeout(timeout),
                    format!("submission {} after {} polls", submission_id, polls),
                ));
            }
            next = (next + self.poll_interval).min(deadline);
        }
    }

    pub async fn get_submission(
        &self,
        submission_id: u64,
        contest_id: u64,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult> {
        let path = submission_path(ContestKind::guess(contest_id), contest_id, submission_id);
        let html = self.session.get_page(&path, cancel).await?;
        parse_submission_page(&html, submission_id, contest_id)
            .ok_or_else(|| parse_error(format!("no verdict on {}", path)))
    }
}
