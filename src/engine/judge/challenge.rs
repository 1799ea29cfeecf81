use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .expect("invalid challenge pattern")
        })
        .collect()
}

/// Markers only an interstitial carries.
static INTERSTITIAL: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"<title>\s*Just a moment\.\.\.\s*</title>"#,
        r#"window\._cf_chl_opt\s*="#,
        r#"<form[^>]*id="challenge-form""#,
    ])
});

/// Challenge platform assets. Proxied pages embed `scripts/jsd` on ordinary
/// content too, so these only count on a blocking status.
static PLATFORM: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r#"/cdn-cgi/challenge-platform/h/"#,
        r#"class="cf-turnstile""#,
        r#"id="cf-turnstile""#,
    ])
});

/// True when the body is a bot-mitigation interstitial rather than site
/// content.
pub fn is_bot_challenge(status: u16, body: &str) -> bool {
    let any = |set: &[Regex]| set.iter().any(|re| re.is_match(body));
    match status {
        403 | 429 | 503 => any(&INTERSTITIAL) || any(&PLATFORM),
        200 => any(&INTERSTITIAL),
        _ => false,
    }
}
