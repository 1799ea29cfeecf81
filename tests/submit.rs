mod common;

use cf_engine::{
    config::Credentials,
    error::{AuthFailure, Category, Kind, SubmitRejection},
    judge::{AuthSession, SubmissionEngine, Verdict},
    transport::HttpTransport,
};
use common::{config, ok, redirect, status, Script, StubTransport};
use reqwest::Method;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const FORM: &str = r#"<html><head><meta name="X-Csrf-Token" content="abc123"/></head><body>
<form class="submit-form" method="post" action="?csrf_token=abc123">
<input type="hidden" name="csrf_token" value="abc123"/>
<select name="submittedProblemIndex"><option value="A">A - Watermelon</option></select>
<textarea name="source"></textarea></form></body></html>"#;

fn listing(rows: &[(u64, &str)]) -> String {
    let mut html = String::from(
        r#"<table class="status-frame-datatable"><tr><th>#</th><th>Problem</th><th>Verdict</th><th>Time</th><th>Memory</th></tr>"#,
    );
    for (id, verdict) in rows {
        html.push_str(&format!(
            r#"<tr data-submission-id="{id}"><td><a href="/contest/4/submission/{id}">{id}</a></td>
<td><a href="/contest/4/problem/A">A - Watermelon</a></td>
<td class="status-cell">{verdict}</td>
<td class="time-consumed-cell">30&nbsp;ms</td><td class="memory-consumed-cell">4&nbsp;KB</td></tr>"#,
            id = id,
            verdict = verdict
        ));
    }
    html.push_str("</table>");
    html
}

fn engine(stub: Arc<StubTransport>) -> SubmissionEngine {
    let credentials = Credentials {
        handle: Some("tourist".into()),
        cookies: Some("JSESSIONID=0DDBA11".into()),
        ..Default::default()
    };
    let transport: Arc<dyn HttpTransport> = stub;
    let session = AuthSession::from_credentials(&config(), &credentials, transport).unwrap();
    SubmissionEngine::new(session, &config()).unwrap()
}

#[test]
fn construction_fails_fast() {
    let stub = StubTransport::new(|r| ok(r, ""));
    let mut session = AuthSession::with_transport(&config(), stub).unwrap();
    session.set_cookie("JSESSIONID=1");
    let err = SubmissionEngine::new(session, &config()).err().unwrap();
    assert_eq!(err.auth_failure(), Some(&AuthFailure::MissingHandle));

    let stub = StubTransport::new(|r| ok(r, ""));
    let mut session = AuthSession::with_transport(&config(), stub).unwrap();
    session.set_handle("tourist");
    let err = SubmissionEngine::new(session, &config()).err().unwrap();
    assert_eq!(err.auth_failure(), Some(&AuthFailure::NotAuthenticated));
}

#[tokio::test(start_paused = true)]
async fn duplicate_source_is_a_typed_rejection() {
    let stub = StubTransport::new(|r| {
        if r.method == Method::POST {
            ok(
                r,
                r#"<span class="error for__source">You have submitted exactly the same code before</span>"#,
            )
        } else {
            ok(r, FORM)
        }
    });
    let mut engine = engine(stub.clone());
    let err = engine
        .submit(4, "A", "54", "int main(){}", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.submit_rejection(), Some(&SubmitRejection::Duplicate));
    assert_eq!(err.category(), Category::Submission);
    assert_eq!(stub.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn redirect_is_success_and_reads_back_newest_row() {
    let stub = StubTransport::new(|r| match r.url.path() {
        _ if r.method == Method::POST => redirect(r, "/contest/4/my"),
        "/contest/4/my" => ok(r, &listing(&[(1002, "In queue"), (1001, "Accepted")])),
        _ => ok(r, FORM),
    });
    let mut engine = engine(stub.clone());
    let result = engine
        .submit(4, "A", "54", "int main(){}", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.id, 1002);
    assert_eq!(result.problem_index, "A");
    assert_eq!(result.verdict, None);
    assert_eq!(result.status, "In queue");
    assert_eq!(
        stub.paths(),
        vec!["/contest/4/submit", "/contest/4/submit", "/contest/4/my"]
    );

    let post = &stub.requests()[1];
    assert!(!post.follow_redirects);
    assert_eq!(post.url.query(), Some("csrf_token=abc123"));
    assert_eq!(post.form_value("csrf_token"), Some("abc123"));
    assert_eq!(post.form_value("submittedProblemIndex"), Some("A"));
    assert_eq!(post.form_value("programTypeId"), Some("54"));
    assert_eq!(post.form_value("contestId"), Some("4"));
    assert_eq!(post.form_value("source"), Some("int main(){}"));
    assert_eq!(post.form_value("ftaa").map(str::len), Some(18));
    assert!(post.form_value("bfaa").is_some());
    assert_eq!(engine.session().csrf_token(), Some("abc123"));
}

#[tokio::test(start_paused = true)]
async fn plain_ok_without_rejection_is_success() {
    let stub = StubTransport::new(|r| match r.url.path() {
        _ if r.method == Method::POST => ok(r, "<html><body>Status</body></html>"),
        "/gym/100001/my" => ok(r, &listing(&[(77, "Running on test 1")])),
        _ => ok(r, FORM),
    });
    let mut engine = engine(stub.clone());
    let result = engine
        .submit_gym(100_001, "A", "54", "print(1)", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.id, 77);
    assert_eq!(stub.paths()[0], "/gym/100001/submit");
}

#[tokio::test(start_paused = true)]
async fn polling_stops_at_the_first_terminal_status() {
    let statuses = Script::new(["Running on test 1", "Running on test 5", "Accepted"]);
    let stub = StubTransport::new(move |r| ok(r, &listing(&[(1002, statuses.next())])));
    let engine = engine(stub.clone());
    let started = Instant::now();
    let result = engine
        .wait_for_verdict(1002, 4, Duration::from_secs(60), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.verdict, Some(Verdict::Ok));
    assert_eq!(result.time, Duration::from_millis(30));
    assert_eq!(result.memory_bytes, 4096);
    assert_eq!(stub.calls(), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn polling_times_out_at_the_deadline() {
    let stub = StubTransport::new(|r| ok(r, &listing(&[(1002, "In queue")])));
    let engine = engine(stub.clone());
    let started = Instant::now();
    let err = engine
        .wait_for_verdict(1002, 4, Duration::from_secs(5), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), Kind::Timeout(d) if *d == Duration::from_secs(5)));
    assert_eq!(err.category(), Category::Timeout);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
    // at 0s, 2s, 4s and once more at the deadline
    assert_eq!(stub.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn polling_aborts_on_http_failure() {
    let replies = Script::new([200u16, 500]);
    let stub = StubTransport::new(move |r| match replies.next() {
        200 => ok(r, &listing(&[(1002, "Running on test 3")])),
        code => status(r, code, "oops"),
    });
    let engine = engine(stub.clone());
    let err = engine
        .wait_for_verdict(1002, 4, Duration::from_secs(60), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.category(), Category::Http);
    assert_eq!(stub.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn polling_honours_cancellation() {
    let stub = StubTransport::new(|r| ok(r, &listing(&[(1002, "In queue")])));
    let engine = engine(stub.clone());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        trigger.cancel();
    });
    let err = engine
        .wait_for_verdict(1002, 4, Duration::from_secs(60), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn single_submission_page() {
    let stub = StubTransport::new(|r| {
        ok(
            r,
            r#"<div class="datatable"><table>
<tr><th>#</th><th>Problem</th><th>Verdict</th><th>Time</th><th>Memory</th></tr>
<tr><td>1002</td><td><a href="/contest/4/problem/A">4A - Watermelon</a></td>
<td><span class="verdict-rejected">Time limit exceeded on test 9</span></td>
<td>1000 ms</td><td>256 KB</td></tr></table></div>"#,
        )
    });
    let engine = engine(stub.clone());
    let result = engine
        .get_submission(1002, 4, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stub.paths(), vec!["/contest/4/submission/1002"]);
    assert_eq!(result.verdict, Some(Verdict::TimeLimitExceeded));
    assert_eq!(result.passed_test_count, 8);
    assert_eq!(result.time, Duration::from_millis(1000));
    assert_eq!(result.memory_bytes, 262_144);
}
