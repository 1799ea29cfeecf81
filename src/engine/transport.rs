//! HTTP plumbing shared by the api client and the html session.
//!
//! Everything goes through [`HttpTransport`] so that suites can swap the
//! network for a scripted stub. The reqwest implementation keeps two clients:
//! one following redirects and one with redirects disabled, because the submit
//! flow has to observe the intermediate 30x.

use crate::error::{cancelled, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, LOCATION},
    redirect::Policy,
    Client, Method,
};
use std::{future::Future, time::Duration};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub form: Option<Vec<(String, String)>>,
    pub follow_redirects: bool,
    /// Stop reading the body once it grows past this many bytes.
    pub body_limit: Option<usize>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            form: None,
            follow_redirects: true,
            body_limit: None,
        }
    }
    pub fn post_form(url: Url, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            form: Some(form),
            ..Self::get(url)
        }
    }
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = Some(limit);
        self
    }
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .as_ref()?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub url: Url,
}

impl HttpResponse {
    pub fn new(status: u16, url: Url, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            url,
        }
    }
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    follow: Client,
    manual: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        Ok(Self {
            follow: Client::builder().timeout(timeout).build()?,
            manual: Client::builder()
                .timeout(timeout)
                .redirect(Policy::none())
                .build()?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            form,
            follow_redirects,
            body_limit,
        } = request;
        let client = if follow_redirects {
            &self.follow
        } else {
            &self.manual
        };
        log::debug!("-> {} {}", method, url);
        let mut builder = client.request(method, url).headers(headers);
        if let Some(form) = &form {
            builder = builder.form(form);
        }
        let mut response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body_limit.map_or(false, |limit| body.len() > limit) {
                break;
            }
        }
        log::debug!("<- {} {} ({} bytes)", status, url, body.len());
        Ok(HttpResponse {
            status,
            headers,
            body,
            url,
        })
    }
}

/// Runs `fut` unless `cancel` fires first.
pub(crate) async fn guarded<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled()),
        out = fut => out,
    }
}

pub(crate) async fn sleep_until(deadline: Instant, cancel: &CancellationToken) -> Result<()> {
    guarded(cancel, async {
        tokio::time::sleep_until(deadline).await;
        Ok(())
    })
    .await
}
