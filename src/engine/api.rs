//! Client for the documented json api.
//!
//! Every call goes through one token bucket owned by the client, and decoded
//! results are kept in a TTL cache keyed by method and sorted parameters.
//! Nothing is retried here: failures go straight back to the caller.

pub mod cache;
pub mod filter;
pub mod limiter;
pub mod sign;
pub mod types;

use self::{
    cache::{cache_key, ResponseCache},
    filter::ProblemFilter,
    limiter::RateLimiter,
    sign::SignedRequestBuilder,
    types::{Contest, Problem, ProblemKey, ProblemSet, RatingChange, Standings, Submission, User},
};
use crate::{
    config::{api::BURST, ClientConfig},
    error::{decode_error, status_error, Error, Kind, Result},
    transport::{guarded, HttpRequest, HttpTransport, ReqwestTransport},
};
use reqwest::header::{HeaderValue, USER_AGENT};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

type Params = Vec<(String, String)>;

#[derive(Deserialize)]
struct Envelope {
    status: String,
    comment: Option<String>,
    result: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandingsQuery {
    pub from: Option<u32>,
    pub count: Option<u32>,
    pub handles: Vec<String>,
    pub show_unofficial: bool,
}

pub struct ApiClient {
    base: Url,
    user_agent: HeaderValue,
    max_response_bytes: usize,
    transport: Arc<dyn HttpTransport>,
    limiter: RateLimiter,
    cache: ResponseCache,
    signer: Option<SignedRequestBuilder>,
}

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout)
            .map_err(|e| Error::with_kind(Kind::Builder(e)))?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let mut base = Url::parse(&config.api_base)?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            base,
            user_agent: HeaderValue::from_str(&config.user_agent)
                .map_err(|_| Error::with_description(Kind::Parse, "user agent is not a valid header"))?,
            max_response_bytes: config.max_response_bytes,
            transport,
            limiter: RateLimiter::new(config.rate_per_sec, BURST),
            cache: ResponseCache::new(config.cache_ttl),
            signer: None,
        })
    }

    /// Sign every subsequent call with this key pair.
    pub fn with_api_key(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.signer = Some(SignedRequestBuilder::new(key, secret));
        self
    }

    pub fn is_signed(&self) -> bool {
        self.signer.is_some()
    }
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Params,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let key = cache_key(method, &params);
        if let Some(value) = self.cache.get(&key) {
            log::debug!("cache hit: {}", key);
            return serde_json::from_value(value).map_err(decode_error);
        }
        log::debug!("cache miss: {}", key);
        let purged = self.cache.purge_expired();
        if purged > 0 {
            log::trace!("dropped {} expired cache entries", purged);
        }
        let value = self.fetch(method, params, cancel).await?;
        let decoded = serde_json::from_value(value.clone()).map_err(decode_error)?;
        self.cache.insert(key, value);
        Ok(decoded)
    }

    async fn fetch(&self, method: &str, params: Params, cancel: &CancellationToken) -> Result<Value> {
        self.limiter.acquire(cancel).await?;
        let params = match &self.signer {
            Some(signer) => signer.sign(method, &params),
            None => params,
        };
        let mut url = self.base.join(method)?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        let request = HttpRequest::get(url)
            .header(USER_AGENT, self.user_agent.clone())
            .with_body_limit(self.max_response_bytes);
        let response = guarded(cancel, async {
            self.transport.execute(request).await.map_err(Error::from)
        })
        .await?;

        if !response.is_success() {
            return Err(status_error(response.status, response.text()));
        }
        if response.body.len() > self.max_response_bytes {
            return Err(Error::with_description(
                Kind::Decode(None),
                format!("response body exceeds {} bytes", self.max_response_bytes),
            ));
        }
        let envelope: Envelope = serde_json::from_slice(&response.body).map_err(decode_error)?;
        if envelope.status != "OK" {
            return Err(Error::with_kind(Kind::Api(
                envelope.comment.unwrap_or(envelope.status),
            )));
        }
        envelope
            .result
            .ok_or_else(|| Error::with_description(Kind::Decode(None), "envelope carries no result"))
    }

    pub async fn problems(&self, tags: &[String], cancel: &CancellationToken) -> Result<ProblemSet> {
        let mut params = Vec::new();
        if !tags.is_empty() {
            params.push(param("tags", tags.join(";")));
        }
        self.call("problemset.problems", params, cancel).await
    }

    pub async fn filter_problems(
        &self,
        filter: &ProblemFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Problem>> {
        let set = self.problems(&filter.tags, cancel).await?;
        let problems = filter::by_tags(set.problems, &filter.tags);
        let problems = filter::by_rating(problems, filter.min_rating, filter.max_rating);
        match &filter.exclude_solved_by {
            Some(handle) => {
                let solved = self.solved_problems(handle, cancel).await?;
                Ok(filter::excluding_solved(problems, &solved))
            }
            None => Ok(problems),
        }
    }

    pub async fn solved_problems(
        &self,
        handle: &str,
        cancel: &CancellationToken,
    ) -> Result<HashSet<ProblemKey>> {
        let submissions = self.user_status(handle, None, None, cancel).await?;
        Ok(filter::solved_set(&submissions))
    }

    pub async fn user_info(&self, handles: &[String], cancel: &CancellationToken) -> Result<Vec<User>> {
        self.call("user.info", vec![param("handles", handles.join(";"))], cancel)
            .await
    }

    pub async fn user_status(
        &self,
        handle: &str,
        from: Option<u32>,
        count: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Submission>> {
        let mut params = vec![param("handle", handle)];
        if let Some(from) = from {
            params.push(param("from", from));
        }
        if let Some(count) = count {
            params.push(param("count", count));
        }
        self.call("user.status", params, cancel).await
    }

    pub async fn user_rating(
        &self,
        handle: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RatingChange>> {
        self.call("user.rating", vec![param("handle", handle)], cancel)
            .await
    }

    pub async fn contest_list(&self, gym: bool, cancel: &CancellationToken) -> Result<Vec<Contest>> {
        self.call("contest.list", vec![param("gym", gym)], cancel).await
    }

    pub async fn contest(&self, contest_id: u64, cancel: &CancellationToken) -> Result<Contest> {
        let query = StandingsQuery {
            from: Some(1),
            count: Some(1),
            ..Default::default()
        };
        Ok(self.contest_standings(contest_id, &query, cancel).await?.contest)
    }

    pub async fn contest_standings(
        &self,
        contest_id: u64,
        query: &StandingsQuery,
        cancel: &CancellationToken,
    ) -> Result<Standings> {
        let mut params = vec![param("contestId", contest_id)];
        if let Some(from) = query.from {
            params.push(param("from", from));
        }
        if let Some(count) = query.count {
            params.push(param("count", count));
        }
        if !query.handles.is_empty() {
            params.push(param("handles", query.handles.join(";")));
        }
        if query.show_unofficial {
            params.push(param("showUnofficial", true));
        }
        self.call("contest.standings", params, cancel).await
    }

    /// Round trip to the api, bypassing the cache. Still waits for the limiter.
    pub async fn ping(&self, cancel: &CancellationToken) -> Result<Duration> {
        let started = Instant::now();
        self.fetch("problemset.recentStatus", vec![param("count", 1)], cancel)
            .await?;
        Ok(started.elapsed())
    }
}
