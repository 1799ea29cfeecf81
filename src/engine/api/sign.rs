use crate::{config::api::RAND_LEN, random::random_digits};
use sha2::{Digest, Sha512};

/// Adds `apiKey`, `time` and `apiSig` to a parameter list.
#[derive(Clone)]
pub struct SignedRequestBuilder {
    key: String,
    secret: String,
}

impl std::fmt::Debug for SignedRequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedRequestBuilder")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl SignedRequestBuilder {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn sign(&self, method: &str, params: &[(String, String)]) -> Vec<(String, String)> {
        let time = chrono::Utc::now().timestamp();
        self.sign_with(method, params, time, &random_digits(RAND_LEN))
    }

    pub fn sign_with(
        &self,
        method: &str,
        params: &[(String, String)],
        time: i64,
        rand: &str,
    ) -> Vec<(String, String)> {
        let mut signed = params.to_vec();
        signed.push(("apiKey".to_string(), self.key.clone()));
        signed.push(("time".to_string(), time.to_string()));
        let sig = signature(method, &signed, &self.secret, rand);
        signed.push(("apiSig".to_string(), sig));
        signed
    }
}

/// `rand + hex(sha512("{rand}/{method}?{sorted params}#{secret}"))`
pub fn signature(method: &str, params: &[(String, String)], secret: &str, rand: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort();
    let query: Vec<String> = sorted.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    let text = format!("{}/{}?{}#{}", rand, method, query.join("&"), secret);
    let digest = Sha512::digest(text.as_bytes());
    format!("{}{}", rand, hex::encode(digest))
}
