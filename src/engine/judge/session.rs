use super::{challenge::is_bot_challenge, csrf::extract_csrf};
use crate::{
    config::{
        session::{BYPASS_COOKIE, FTAA_LEN, SESSION_COOKIES},
        BypassCredentials, ClientConfig, Credentials,
    },
    error::{parse_error, status_error, AuthFailure, Error, Kind, Result},
    random::random_string,
    transport::{guarded, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport},
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{
    cookie::{CookieStore, Jar},
    header::{HeaderValue, COOKIE, SET_COOKIE, USER_AGENT},
};
use scraper::{Html, Selector};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

static HANDLE_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"handle\s*=\s*"([[:word:].\-]+)""#).expect("invalid handle regex"));
static PROFILE_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div.lang-chooser a[href^="/profile/"]"#).expect("invalid profile selector")
});

/// Proof of passing the bot challenge. Only good together with the user agent
/// that solved it, and only until it expires.
#[derive(Debug, Clone, PartialEq)]
pub struct BypassCookie {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub user_agent: String,
}

impl BypassCookie {
    pub fn new(
        value: impl Into<String>,
        expires_at: DateTime<Utc>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            value: value.into(),
            expires_at,
            user_agent: user_agent.into(),
        }
    }
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && self.expires_at > now
    }
}

impl From<BypassCredentials> for BypassCookie {
    fn from(c: BypassCredentials) -> Self {
        Self::new(c.value, c.expires_at, c.user_agent)
    }
}

/// Cookie jar, handle, csrf token and bypass cookie of one logged-in browser
/// identity. Single owner: mutating calls take `&mut self`.
pub struct AuthSession {
    transport: Arc<dyn HttpTransport>,
    base: Url,
    jar: Jar,
    handle: Option<String>,
    csrf_token: Option<String>,
    bypass: Option<BypassCookie>,
    user_agent: String,
    ftaa: String,
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| parse_error(format!("{} is not a valid header", what)))
}

impl AuthSession {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout)
            .map_err(|e| Error::with_kind(Kind::Builder(e)))?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        Ok(Self {
            transport,
            base: Url::parse(&config.site_base)?,
            jar: Jar::default(),
            handle: None,
            csrf_token: None,
            bypass: None,
            user_agent: config.user_agent.clone(),
            ftaa: random_string(FTAA_LEN),
        })
    }

    pub fn from_credentials(
        config: &ClientConfig,
        credentials: &Credentials,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let mut session = Self::with_transport(config, transport)?;
        session.handle = credentials.handle.clone();
        if let Some(raw) = &credentials.cookies {
            session.set_cookie(raw);
        }
        if let Some(bypass) = &credentials.bypass {
            session.set_bypass_cookie(bypass.clone().into());
        }
        Ok(session)
    }

    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }
    pub fn set_handle(&mut self, handle: impl Into<String>) {
        self.handle = Some(handle.into());
    }
    pub fn base_url(&self) -> &Url {
        &self.base
    }
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }
    pub(crate) fn ftaa(&self) -> &str {
        &self.ftaa
    }

    /// Stores a `k=v; k2=v2` string as copied out of a browser. Returns how
    /// many cookies were taken. The bypass cookie is skipped: it needs its
    /// user agent and expiry, see [`AuthSession::set_bypass_cookie`].
    pub fn set_cookie(&mut self, raw: &str) -> usize {
        let mut stored = 0;
        for pair in raw.split(';') {
            let (name, value) = match pair.split_once('=') {
                Some((n, v)) => (n.trim(), v.trim()),
                None => continue,
            };
            if name.is_empty() {
                continue;
            }
            if name == BYPASS_COOKIE {
                log::debug!("skipping {} without user agent", BYPASS_COOKIE);
                continue;
            }
            self.jar
                .add_cookie_str(&format!("{}={}; Path=/", name, value), &self.base);
            stored += 1;
        }
        stored
    }

    fn jar_pairs(&self, url: &Url) -> Vec<String> {
        self.jar
            .cookies(url)
            .and_then(|v| v.to_str().ok().map(str::to_owned))
            .map(|s| {
                s.split("; ")
                    .filter(|p| !p.is_empty() && !p.starts_with(&format!("{}=", BYPASS_COOKIE)))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.jar_pairs(&self.base)
            .iter()
            .any(|p| p.split_once('=').map_or(false, |(n, _)| n == name))
    }

    /// Whether a session-identifying cookie is present. Says nothing about
    /// whether the server still honours it, see [`AuthSession::validate`].
    pub fn is_authenticated(&self) -> bool {
        SESSION_COOKIES.iter().any(|name| self.has_cookie(name))
    }

    pub fn set_bypass_cookie(&mut self, cookie: BypassCookie) {
        self.bypass = Some(cookie);
    }
    pub fn clear_bypass_cookie(&mut self) {
        self.bypass = None;
    }
    pub fn bypass_cookie(&self) -> Option<&BypassCookie> {
        self.bypass.as_ref()
    }

    /// The agent every request goes out with.
    pub fn user_agent(&self) -> &str {
        match &self.bypass {
            Some(b) => &b.user_agent,
            None => &self.user_agent,
        }
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    fn prepare(&self, mut request: HttpRequest) -> Result<HttpRequest> {
        if let Some(bypass) = &self.bypass {
            if !bypass.is_valid() {
                return Err(AuthFailure::BypassExpired.into());
            }
        }
        request
            .headers
            .insert(USER_AGENT, header_value(self.user_agent(), "user agent")?);
        let mut cookies = self.jar_pairs(&request.url);
        if let Some(bypass) = &self.bypass {
            cookies.push(format!("{}={}", BYPASS_COOKIE, bypass.value));
        }
        if !cookies.is_empty() {
            request
                .headers
                .insert(COOKIE, header_value(&cookies.join("; "), "cookie")?);
        }
        Ok(request)
    }

    async fn dispatch(
        &self,
        request: HttpRequest,
        keep_cookies: bool,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let request = self.prepare(request)?;
        let response = guarded(cancel, async {
            self.transport.execute(request).await.map_err(Error::from)
        })
        .await?;
        if keep_cookies {
            let mut set_cookies = response.headers.get_all(SET_COOKIE).iter();
            self.jar.set_cookies(&mut set_cookies, &response.url);
        }
        if is_bot_challenge(response.status, &String::from_utf8_lossy(&response.body)) {
            return Err(AuthFailure::BotChallenge.into());
        }
        Ok(response)
    }

    /// Sends a request with session headers attached and response cookies
    /// kept. Status is not checked.
    pub async fn send(&self, request: HttpRequest, cancel: &CancellationToken) -> Result<HttpResponse> {
        self.dispatch(request, true, cancel).await
    }

    /// GET `path` relative to the site root; anything but 2xx is an error.
    pub async fn get_page(&self, path: &str, cancel: &CancellationToken) -> Result<String> {
        let response = self.send(HttpRequest::get(self.url(path)?), cancel).await?;
        if !response.is_success() {
            return Err(status_error(response.status, response.text()));
        }
        Ok(response.text())
    }

    pub async fn refresh_csrf_token(&mut self, cancel: &CancellationToken) -> Result<String> {
        let body = self.get_page("", cancel).await?;
        let token = extract_csrf(&body)?;
        self.csrf_token = Some(token.clone());
        Ok(token)
    }

    pub(crate) fn remember_csrf(&mut self, token: &str) {
        self.csrf_token = Some(token.to_owned());
    }

    /// Probes whether the server still treats us as the configured handle.
    /// Does not touch session state.
    pub async fn validate(&self, cancel: &CancellationToken) -> Result<()> {
        let expected = self.handle.as_deref().ok_or(AuthFailure::MissingHandle)?;
        if !self.is_authenticated() {
            return Err(AuthFailure::NotAuthenticated.into());
        }
        let response = self
            .dispatch(HttpRequest::get(self.url("")?), false, cancel)
            .await?;
        if !response.is_success() {
            return Err(status_error(response.status, response.text()));
        }
        match rendered_handle(&response.text()) {
            Some(found) if found.eq_ignore_ascii_case(expected) => Ok(()),
            found => Err(AuthFailure::HandleMismatch {
                expected: expected.to_owned(),
                found,
            }
            .into()),
        }
    }
}

/// Handle of the logged-in user as the page renders it: the `handle = "..."`
/// script variable, or the profile link in the header.
pub fn rendered_handle(html: &str) -> Option<String> {
    if let Some(c) = HANDLE_VAR.captures(html) {
        return c.get(1).map(|m| m.as_str().to_owned());
    }
    let document = Html::parse_document(html);
    let found = document
        .select(&PROFILE_LINK)
        .map(|a| a.text().collect::<String>().trim().to_owned())
        .find(|t| !t.is_empty());
    found
}
