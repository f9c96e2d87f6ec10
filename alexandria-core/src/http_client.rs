//! Every outbound provider call goes through this client; providers never
//! issue raw `reqwest` calls directly. Wraps rate limiting, caching, retry
//! with jittered backoff, per-attempt timeouts, and quota-callback hooks
//! around a plain GET/POST.

use std::time::Duration;

use rand::Rng;
use redis::{aio::ConnectionManager, AsyncCommands};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use alexandria_contracts::providers::{CacheStrategy, RateLimitStrategy, ServiceContext};

use crate::error::{CoreError, Result};

const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const MAX_RETRIES: u32 = 2;
const BASE_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF_MS: u64 = 5_000;
const CACHE_KEY_MAX_LEN: usize = 512;

/// Retryable HTTP statuses per the retry policy: transient server errors and
/// explicit throttling responses.
const RETRYABLE_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    CacheHit,
    Error,
    Timeout,
}

/// Invoked after a successful *network* call (never on a cache hit); the
/// paid-provider quota wrapper uses this to advance its daily counter.
/// Failures in the callback are logged and never fail the request.
pub type OnCallHook<'a> = dyn Fn(&str, &str) + Send + Sync + 'a;

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    cache: ConnectionManager,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").field("cache", &"ConnectionManager").finish()
    }
}

pub struct FetchOptions<'a> {
    pub provider: &'a str,
    pub purpose: &'a str,
    pub method: reqwest::Method,
    pub body: Option<serde_json::Value>,
    pub cache_ttl: Option<Duration>,
    pub rate_limit_ms: u64,
    pub headers: Vec<(String, String)>,
    pub on_call: Option<&'a OnCallHook<'a>>,
}

impl<'a> FetchOptions<'a> {
    pub fn get(provider: &'a str, purpose: &'a str) -> Self {
        Self {
            provider,
            purpose,
            method: reqwest::Method::GET,
            body: None,
            cache_ttl: Some(Duration::from_secs(3600)),
            rate_limit_ms: 0,
            headers: Vec::new(),
            on_call: None,
        }
    }

    /// Cache keys are derived from the URL alone, so callers that vary the
    /// response by header (an API key granting a higher rate tier, say)
    /// should keep that header out of anything cache-sensitive.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl HttpClient {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("alexandria/enrichment-core")
            .build()
            .map_err(CoreError::Http)?;
        let redis_client = redis::Client::open(redis_url).map_err(CoreError::Cache)?;
        let cache = ConnectionManager::new(redis_client).await.map_err(CoreError::Cache)?;
        Ok(Self { client, cache })
    }

    /// Core single-URL fetch. Returns `Ok(None)` on any classified failure
    /// (HTTP error, parse error, timeout, cancellation) — the client never
    /// propagates a hard error to the caller for those cases; it only
    /// returns `Err` for cache-backend failures, which the caller may choose
    /// to treat as a cache miss upstream.
    pub async fn fetch<T: DeserializeOwned>(
        &mut self,
        url: &str,
        opts: FetchOptions<'_>,
        ctx: &ServiceContext,
    ) -> Result<Option<T>> {
        if ctx.rate_limit_strategy == RateLimitStrategy::Enforce && opts.rate_limit_ms > 0 {
            self.enforce_rate_limit(opts.provider, opts.rate_limit_ms).await?;
        }

        let cache_key = cache_key_for(opts.provider, url);
        let use_cache_read = matches!(
            ctx.cache_strategy,
            CacheStrategy::ReadWrite | CacheStrategy::ReadOnly
        );
        let use_cache_write = matches!(
            ctx.cache_strategy,
            CacheStrategy::ReadWrite | CacheStrategy::WriteOnly
        );

        if use_cache_read {
            if let Some(value) = self.cache_get::<T>(&cache_key).await? {
                debug!(provider = opts.provider, %cache_key, "cache hit");
                return Ok(Some(value));
            }
        }

        let timeout = Duration::from_millis(ctx.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS));

        for attempt in 0..=MAX_RETRIES {
            let result = tokio::time::timeout(timeout, self.attempt_once::<T>(url, &opts)).await;

            match result {
                Ok(Ok(Some(value))) => {
                    if let Some(hook) = opts.on_call {
                        hook(opts.provider, url);
                    }
                    if use_cache_write {
                        if let Err(err) = self.cache_set(&cache_key, &value, opts.cache_ttl).await {
                            warn!(%err, "failed to populate cache after successful fetch");
                        }
                    }
                    return Ok(Some(value));
                }
                Ok(Ok(None)) => return Ok(None),
                Ok(Err(retryable)) if retryable && attempt < MAX_RETRIES => {
                    let delay = backoff_with_jitter(attempt);
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Ok(Err(_)) => return Ok(None),
                Err(_elapsed) => {
                    warn!(provider = opts.provider, url, "provider request timed out");
                    return Ok(None);
                }
            }
        }

        Ok(None)
    }

    /// Issues every URL concurrently without caching; failures are silently
    /// omitted from the returned map.
    pub async fn batch_fetch<T: DeserializeOwned + Send + 'static>(
        &self,
        urls: Vec<String>,
        provider: &str,
    ) -> std::collections::HashMap<String, T> {
        use futures::future::join_all;

        let client = self.client.clone();
        let futures = urls.into_iter().map(|url| {
            let client = client.clone();
            let provider = provider.to_string();
            async move {
                let resp = client
                    .get(&url)
                    .header("User-Agent", format!("{provider}/batch"))
                    .header("Accept", "application/json")
                    .send()
                    .await
                    .ok()?;
                if !resp.status().is_success() {
                    return None;
                }
                let value = resp.json::<T>().await.ok()?;
                Some((url, value))
            }
        });

        join_all(futures)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Downloads raw bytes with no JSON parsing and no cache (cover images
    /// are stored in object storage, not Redis). Retries transient statuses
    /// the same way `fetch` does.
    pub async fn download_bytes(&self, url: &str, provider: &str) -> Result<Option<Vec<u8>>> {
        for attempt in 0..=MAX_RETRIES {
            let response = self
                .client
                .get(url)
                .header("User-Agent", format!("{provider}/cover-download"))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(resp.bytes().await.ok().map(|b| b.to_vec()));
                }
                Ok(resp) if RETRYABLE_STATUSES.contains(&resp.status().as_u16()) && attempt < MAX_RETRIES => {
                    tokio::time::sleep(backoff_with_jitter(attempt)).await;
                    continue;
                }
                Ok(_) => return Ok(None),
                Err(e) if is_retryable_transport(&e) && attempt < MAX_RETRIES => {
                    tokio::time::sleep(backoff_with_jitter(attempt)).await;
                    continue;
                }
                Err(_) => return Ok(None),
            }
        }
        Ok(None)
    }

    pub async fn invalidate_cache(&mut self, provider: &str, url: &str) -> Result<()> {
        let key = cache_key_for(provider, url);
        self.cache.del::<_, ()>(&key).await.map_err(CoreError::Cache)?;
        Ok(())
    }

    async fn attempt_once<T: DeserializeOwned>(
        &self,
        url: &str,
        opts: &FetchOptions<'_>,
    ) -> std::result::Result<Option<T>, bool> {
        let mut request = self
            .client
            .request(opts.method.clone(), url)
            .header("User-Agent", format!("{}/{}", opts.provider, opts.purpose))
            .header("Accept", "application/json");

        for (name, value) in &opts.headers {
            request = request.header(name, value);
        }

        if let Some(body) = &opts.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| is_retryable_transport(&e))?;
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|_parse_err| false)
        } else if RETRYABLE_STATUSES.contains(&status.as_u16()) {
            Err(true)
        } else {
            Err(false)
        }
    }

    async fn enforce_rate_limit(&mut self, provider: &str, rate_limit_ms: u64) -> Result<()> {
        let key = format!("ratelimit:last:{provider}");
        let now_ms = chrono::Utc::now().timestamp_millis();

        let last: Option<i64> = self.cache.get(&key).await.map_err(CoreError::Cache)?;
        if let Some(last) = last {
            let elapsed = (now_ms - last).max(0) as u64;
            if elapsed < rate_limit_ms {
                tokio::time::sleep(Duration::from_millis(rate_limit_ms - elapsed)).await;
            }
        }

        let now_ms = chrono::Utc::now().timestamp_millis();
        self.cache
            .set_ex::<_, _, ()>(&key, now_ms, 86_400)
            .await
            .map_err(CoreError::Cache)?;
        Ok(())
    }

    async fn cache_get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        let data: Option<String> = self.cache.get(key).await.map_err(CoreError::Cache)?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json).map_err(CoreError::Serialization)?)),
            None => Ok(None),
        }
    }

    async fn cache_set<T: Serialize>(&mut self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let json = serde_json::to_string(value).map_err(CoreError::Serialization)?;
        match ttl {
            Some(ttl) if ttl.as_secs() > 0 => {
                self.cache
                    .set_ex::<_, _, ()>(key, json, ttl.as_secs())
                    .await
                    .map_err(CoreError::Cache)?;
            }
            _ => {
                self.cache.set::<_, _, ()>(key, json).await.map_err(CoreError::Cache)?;
            }
        }
        Ok(())
    }
}

fn is_retryable_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// `<provider>:http:<url>`, or `sha256:<hex>` once that exceeds 512 bytes.
fn cache_key_for(provider: &str, url: &str) -> String {
    let raw = format!("{provider}:http:{url}");
    if raw.len() <= CACHE_KEY_MAX_LEN {
        raw
    } else {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("sha256:{:x}", hasher.finalize())
    }
}

fn backoff_with_jitter(attempt: u32) -> Duration {
    let base = BASE_BACKOFF_MS.saturating_mul(1u64 << attempt);
    let jitter_max = (base as f64 * 0.3) as u64;
    let jitter = if jitter_max > 0 {
        rand::thread_rng().gen_range(0..=jitter_max)
    } else {
        0
    };
    Duration::from_millis((base + jitter).min(MAX_BACKOFF_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_cache_key_is_passed_through() {
        let key = cache_key_for("isbndb", "https://api.isbndb.com/book/9780439064873");
        assert_eq!(key, "isbndb:http:https://api.isbndb.com/book/9780439064873");
    }

    #[test]
    fn long_cache_key_is_hashed() {
        let long_url = format!("https://api.isbndb.com/search?q={}", "x".repeat(600));
        let key = cache_key_for("isbndb", &long_url);
        assert!(key.starts_with("sha256:"));
        assert_eq!(key.len(), "sha256:".len() + 64);
    }

    #[test]
    fn backoff_grows_and_stays_under_cap() {
        let d0 = backoff_with_jitter(0);
        let d5 = backoff_with_jitter(5);
        assert!(d0.as_millis() >= BASE_BACKOFF_MS as u128);
        assert!(d5.as_millis() as u64 <= MAX_BACKOFF_MS);
    }
}
