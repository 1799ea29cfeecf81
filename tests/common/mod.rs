#![allow(dead_code)]

use async_trait::async_trait;
use cf_engine::{
    config::ClientConfig,
    transport::{HttpRequest, HttpResponse, HttpTransport, TransportError},
};
use reqwest::header::{HeaderValue, LOCATION, SET_COOKIE};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// Transport answering from a closure. Counts calls and keeps every request.
pub struct StubTransport {
    handler: Handler,
    calls: AtomicUsize,
    seen: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new(handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = (self.handler)(&request);
        self.seen.lock().unwrap().push(request);
        Ok(response)
    }
}

/// Hands out `items` one per call, repeating the last one forever.
pub struct Script<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T: Clone> Script<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
        }
    }
    pub fn next(&self) -> T {
        let mut items = self.items.lock().unwrap();
        if items.len() > 1 {
            items.pop_front().unwrap()
        } else {
            items.front().cloned().expect("empty script")
        }
    }
}

pub fn config() -> ClientConfig {
    ClientConfig::default()
        .with_rate(1000.0)
        .with_poll_interval(Duration::from_secs(2))
        .with_readback_delay(Duration::from_millis(500))
}

pub fn ok(request: &HttpRequest, body: &str) -> HttpResponse {
    HttpResponse::new(200, request.url.clone(), body)
}

pub fn status(request: &HttpRequest, status: u16, body: &str) -> HttpResponse {
    HttpResponse::new(status, request.url.clone(), body)
}

pub fn redirect(request: &HttpRequest, location: &'static str) -> HttpResponse {
    HttpResponse::new(302, request.url.clone(), "")
        .with_header(LOCATION, HeaderValue::from_static(location))
}

pub fn with_cookie(response: HttpResponse, cookie: &'static str) -> HttpResponse {
    response.with_header(SET_COOKIE, HeaderValue::from_static(cookie))
}

pub fn envelope(result: serde_json::Value) -> String {
    serde_json::json!({ "status": "OK", "result": result }).to_string()
}

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {}", path, e))
}

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}
