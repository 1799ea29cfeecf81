use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod api {
    use std::time::Duration;
    pub const DEFAULT_BASE_URL: &str = "https://codeforces.com/api/";
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
    /// Requests per second. The api allows one call every two seconds.
    pub const DEFAULT_RATE: f64 = 0.5;
    pub const BURST: u32 = 1;
    pub const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;
    pub const RAND_LEN: usize = 6;
}
pub mod session {
    pub const DEFAULT_SITE_URL: &str = "https://codeforces.com/";
    pub const FIREFOX_UA: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
    pub const BFAA: &str = "f1b3f18c715565b589b7823cda7448ce";
    pub const FTAA_LEN: usize = 18;
    pub const BYPASS_COOKIE: &str = "cf_clearance";
    pub const SESSION_COOKIES: [&str; 3] = ["JSESSIONID", "X-User", "X-User-Sha1"];
}
pub mod submit {
    use std::time::Duration;
    pub const CHECK_DELAY: Duration = Duration::from_secs(2);
    pub const READBACK_DELAY: Duration = Duration::from_secs(1);
    pub const TAB_SIZE: &str = "4";
}
pub mod parser {
    pub const REFERENCE_CONTEST: u64 = 158;
    pub const REFERENCE_INDEX: &str = "A";
}
pub mod transport {
    use std::time::Duration;
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Tunables shared by every client built from it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub site_base: String,
    pub rate_per_sec: f64,
    pub cache_ttl: Duration,
    pub max_response_bytes: usize,
    pub user_agent: String,
    pub poll_interval: Duration,
    pub readback_delay: Duration,
    pub request_timeout: Duration,
    pub reference_problem: (u64, String),
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: api::DEFAULT_BASE_URL.to_string(),
            site_base: session::DEFAULT_SITE_URL.to_string(),
            rate_per_sec: api::DEFAULT_RATE,
            cache_ttl: api::DEFAULT_CACHE_TTL,
            max_response_bytes: api::MAX_RESPONSE_BYTES,
            user_agent: session::FIREFOX_UA.to_string(),
            poll_interval: submit::CHECK_DELAY,
            readback_delay: submit::READBACK_DELAY,
            request_timeout: transport::REQUEST_TIMEOUT,
            reference_problem: (
                parser::REFERENCE_CONTEST,
                parser::REFERENCE_INDEX.to_string(),
            ),
        }
    }
}

impl ClientConfig {
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
    pub fn with_site_base(mut self, base: impl Into<String>) -> Self {
        self.site_base = base.into();
        self
    }
    pub fn with_rate(mut self, per_sec: f64) -> Self {
        self.rate_per_sec = per_sec;
        self
    }
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
    pub fn with_max_response_bytes(mut self, bytes: usize) -> Self {
        self.max_response_bytes = bytes;
        self
    }
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
    pub fn with_readback_delay(mut self, delay: Duration) -> Self {
        self.readback_delay = delay;
        self
    }
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
    pub fn with_reference_problem(mut self, contest: u64, index: impl Into<String>) -> Self {
        self.reference_problem = (contest, index.into());
        self
    }
}

/// Bypass cookie as handed over by whoever solved the bot challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BypassCredentials {
    pub value: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub user_agent: String,
}

/// Everything a collaborator supplies about the account. How it is stored is
/// not this crate's business.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub handle: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub cookies: Option<String>,
    pub bypass: Option<BypassCredentials>,
}
