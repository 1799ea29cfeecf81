use crate::transport::TransportError;
use std::{error::Error as StdError, fmt, result::Result as StdResult, time::Duration};
use thiserror::Error;

#[derive(Debug)]
pub struct Error(Box<Inner>);

#[derive(Debug)]
pub enum Kind {
    Builder(reqwest::Error),
    Network(TransportError),
    Status { status: u16, body: String },
    Api(String),
    Decode(Option<serde_json::Error>),
    Parse,
    Structure(Vec<String>),
    Csrf,
    Auth(AuthFailure),
    Submit(SubmitRejection),
    Url(url::ParseError),
    Cancelled,
    Timeout(Duration),
}

/// Coarse grouping callers branch on: retry, re-authenticate, report drift...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Transport,
    Http,
    Api,
    Parse,
    Auth,
    Submission,
    Cancelled,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("no session cookie present")]
    NotAuthenticated,
    #[error("no handle configured")]
    MissingHandle,
    #[error("bypass cookie is empty or expired")]
    BypassExpired,
    #[error("bot challenge page returned instead of content")]
    BotChallenge,
    #[error("expected handle {expected} on page, found {}", found.as_deref().unwrap_or("none"))]
    HandleMismatch {
        expected: String,
        found: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("exactly the same source was submitted before")]
    Duplicate,
    #[error("source is too long")]
    TooLong,
    #[error("submitting is not permitted")]
    NotPermitted,
    #[error("contest is over")]
    ContestOver,
    #[error("submit failed with status {status}")]
    Failed { status: u16, body: String },
}

struct Inner {
    kind: Kind,
    description: Option<String>,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("Error");
        builder.field("kind", &self.kind);
        if let Some(d) = &self.description {
            builder.field("description", d);
        }
        builder.finish()
    }
}

pub type Result<T> = StdResult<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            Kind::Builder(err) => write!(f, "Error building client: {}", err)?,
            Kind::Network(err) => write!(f, "Error sending request: {}", err)?,
            Kind::Status { status, body } => {
                write!(f, "Server responded with status {}", status)?;
                if !body.is_empty() {
                    write!(f, " ({})", truncate(body))?;
                }
            }
            Kind::Api(comment) => write!(f, "API request failed: {}", comment)?,
            Kind::Decode(Some(err)) => write!(f, "Error decoding response: {}", err)?,
            Kind::Decode(None) => write!(f, "Error decoding response")?,
            Kind::Parse => write!(f, "Page structure not matched")?,
            Kind::Structure(missing) => {
                write!(f, "Selectors matched nothing: {}", missing.join(", "))?
            }
            Kind::Csrf => write!(f, "Can't find csrf token")?,
            Kind::Auth(failure) => write!(f, "Authentication failed: {}", failure)?,
            Kind::Submit(rejection) => write!(f, "Submission rejected: {}", rejection)?,
            Kind::Url(err) => write!(f, "Invalid url: {}", err)?,
            Kind::Cancelled => write!(f, "Operation cancelled")?,
            Kind::Timeout(d) => write!(f, "Timed out after {:.1}s", d.as_secs_f32())?,
        }
        self.write_description(f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.0.kind {
            Kind::Builder(x) => Some(x),
            Kind::Network(x) => Some(x),
            Kind::Decode(Some(x)) => Some(x),
            Kind::Url(x) => Some(x),
            Kind::Auth(x) => Some(x),
            Kind::Submit(x) => Some(x),
            _ => None,
        }
    }
}

impl Error {
    fn new(inner: Inner) -> Self {
        Self(Box::new(inner))
    }
    pub(crate) fn with_kind(kind: Kind) -> Self {
        Self::new(Inner {
            kind,
            description: None,
        })
    }
    pub(crate) fn with_description<T: Into<String>>(kind: Kind, description: T) -> Self {
        Self::new(Inner {
            kind,
            description: Some(description.into()),
        })
    }
    fn write_description(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(d) = &self.0.description {
            write!(f, ": {}", d)
        } else {
            Ok(())
        }
    }

    pub fn kind(&self) -> &Kind {
        &self.0.kind
    }
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }
    pub fn category(&self) -> Category {
        match self.0.kind {
            Kind::Builder(_) | Kind::Network(_) => Category::Transport,
            Kind::Status { .. } => Category::Http,
            Kind::Api(_) => Category::Api,
            Kind::Decode(_) | Kind::Parse | Kind::Structure(_) | Kind::Url(_) => Category::Parse,
            Kind::Csrf | Kind::Auth(_) => Category::Auth,
            Kind::Submit(_) => Category::Submission,
            Kind::Cancelled => Category::Cancelled,
            Kind::Timeout(_) => Category::Timeout,
        }
    }
    pub fn is_cancelled(&self) -> bool {
        matches!(self.0.kind, Kind::Cancelled)
    }
    pub fn auth_failure(&self) -> Option<&AuthFailure> {
        match &self.0.kind {
            Kind::Auth(x) => Some(x),
            _ => None,
        }
    }
    pub fn submit_rejection(&self) -> Option<&SubmitRejection> {
        match &self.0.kind {
            Kind::Submit(x) => Some(x),
            _ => None,
        }
    }
}

fn truncate(body: &str) -> &str {
    const SHOWN: usize = 200;
    match body.char_indices().nth(SHOWN) {
        Some((pos, _)) => &body[..pos],
        None => body,
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::with_kind(Kind::Network(err))
    }
}
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_kind(Kind::Url(err))
    }
}
impl From<AuthFailure> for Error {
    fn from(failure: AuthFailure) -> Self {
        Error::with_kind(Kind::Auth(failure))
    }
}
impl From<SubmitRejection> for Error {
    fn from(rejection: SubmitRejection) -> Self {
        Error::with_kind(Kind::Submit(rejection))
    }
}

pub(crate) fn status_error(status: u16, body: String) -> Error {
    Error::with_kind(Kind::Status { status, body })
}
pub(crate) fn parse_error<T: Into<String>>(description: T) -> Error {
    Error::with_description(Kind::Parse, description)
}
pub(crate) fn decode_error(err: serde_json::Error) -> Error {
    Error::with_kind(Kind::Decode(Some(err)))
}
pub(crate) fn cancelled() -> Error {
    Error::with_kind(Kind::Cancelled)
}
