use crate::prelude::*;
use ckanmcp_core::cache::{cache_key, ResponseCache, DEFAULT_CACHE_TTL};
use ckanmcp_core::query::{action_endpoint, QueryParams};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// User agent sent with every portal request
pub const CLIENT_USER_AGENT: &str = "MCP-CKAN-Server/1.0";

/// Connection settings for a CKAN portal
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub cache_ttl: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }
}

/// The portal's own response wrapper
#[derive(Debug, Deserialize)]
struct PortalResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Client for the CKAN action API
///
/// Owns one HTTP session for its whole lifetime and an in-memory cache for
/// GET requests. The cache lock is only held for lookups and inserts, never
/// across a network call, so two concurrent misses on the same key both fetch
/// and the last write wins.
#[derive(Debug)]
pub struct CkanClient {
    config: ClientConfig,
    http: reqwest::Client,
    cache: Mutex<ResponseCache>,
}

impl CkanClient {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        if let Some(api_key) = &config.api_key {
            let value = HeaderValue::from_str(api_key).map_err(|e| {
                Error::InvalidParameters(format!("API key is not a valid header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        // rustls with the bundled webpki roots
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {e}")))?;

        debug!("Opened CKAN session for {}", config.base_url);

        Ok(Self {
            cache: Mutex::new(ResponseCache::new(config.cache_ttl)),
            config,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn api_key_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.config.cache_ttl
    }

    /// Number of cached entries, stale ones included
    pub fn cached_entries(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Issue an action call and unwrap the portal's `result`
    ///
    /// GET requests with `use_cache` are answered from the cache while the
    /// entry is fresh and stored after every successful fetch.
    pub async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        use_cache: bool,
    ) -> Result<Value, Error> {
        let cacheable = use_cache && method == Method::GET;
        let key = cache_key(method.as_str(), endpoint, body);

        if cacheable {
            let cached = self.lock_cache().get_valid(&key, Instant::now()).cloned();
            if let Some(payload) = cached {
                info!("Cache hit for {endpoint}");
                return Ok(payload);
            }
        }

        let url = format!("{}/api/3/action/{endpoint}", self.config.base_url);
        debug!("{method} {url}");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let portal: PortalResponse = serde_json::from_slice(&bytes)
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;

        if !portal.success {
            return Err(Error::CkanApi(portal.error.unwrap_or(Value::Null)));
        }

        let result = portal
            .result
            .unwrap_or_else(|| Value::Object(Default::default()));

        if cacheable {
            self.lock_cache().put(key, result.clone(), Instant::now());
        }

        Ok(result)
    }

    /// Cached GET of an action with query parameters
    pub async fn get_action(&self, action: &str, params: &QueryParams) -> Result<Value, Error> {
        self.execute(Method::GET, &action_endpoint(action, params), None, true)
            .await
    }

    /// Release the HTTP session
    pub fn shutdown(self) {
        debug!(
            "Closing CKAN session for {} ({} cached entries)",
            self.config.base_url,
            self.cached_entries()
        );
    }
}

/// Read a typed view out of a portal result
pub fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    T::deserialize(value).map_err(|e| Error::MalformedResponse(e.to_string()))
}
