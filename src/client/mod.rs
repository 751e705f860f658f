//! HTTP client for the proposal API.
//!
//! [`ApiClient::api_call`] is the single place requests are sent from: it
//! attaches the JSON and bearer headers, applies the timeout and retries
//! server errors with linear backoff. The typed wrappers live in [`api`].

pub mod api;
pub mod session;

pub use api::{AuthData, AuthResponse, LoginResult, RegisterRequest};
pub use session::{Session, SessionStore};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{ClientError, ClientResult};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// Method, query and body of one API request.
#[derive(Clone, Debug)]
pub struct CallOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl CallOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn post(body: Value) -> Self {
        Self::new(Method::POST).body(body)
    }

    pub fn put(body: Value) -> Self {
        Self::new(Method::PUT).body(body)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: SessionStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, endpoint: &str, query: &[(String, String)]) -> ClientResult<Url> {
        let raw = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut url = Url::parse(&raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Send one request, retrying 5xx responses and network failures.
    ///
    /// `retry_count` is the number of attempts already spent. Each retry waits
    /// `retry_delay * attempt`. Once retries run out a 5xx response is handed
    /// back as-is and a network failure is returned as the error. Timeouts
    /// and 4xx responses are never retried.
    pub async fn api_call(
        &self,
        endpoint: &str,
        options: &CallOptions,
        retry_count: u32,
    ) -> ClientResult<Response> {
        let url = self.url(endpoint, &options.query)?;
        let mut attempt = retry_count;

        loop {
            let mut request = self
                .http
                .request(options.method.clone(), url.clone())
                .header(CONTENT_TYPE, "application/json")
                .timeout(self.config.timeout);
            if let Some(token) = self.session.token() {
                request = request.bearer_auth(token);
            }
            if let Some(body) = &options.body {
                request = request.json(body);
            }

            debug!("{} {} (attempt {})", options.method, url, attempt + 1);
            let outcome = match request.send().await {
                Ok(response) => Ok(response),
                Err(err) if err.is_timeout() => {
                    return Err(ClientError::Timeout(self.config.timeout.as_secs()))
                }
                Err(err) => Err(ClientError::Network(err)),
            };

            let retry = match &outcome {
                Ok(response) => response.status().is_server_error(),
                Err(err) => err.is_retryable(),
            };
            if !retry || attempt >= self.config.max_retries {
                return outcome;
            }

            attempt += 1;
            match &outcome {
                Ok(response) => warn!(
                    "{} {} returned {}, retry {}/{}",
                    options.method,
                    endpoint,
                    response.status(),
                    attempt,
                    self.config.max_retries
                ),
                Err(err) => warn!(
                    "{} {} failed: {}, retry {}/{}",
                    options.method, endpoint, err, attempt, self.config.max_retries
                ),
            }
            tokio::time::sleep(self.config.retry_delay * attempt).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_query() {
        let client = ApiClient::new(
            ClientConfig::with_base_url("http://localhost:3000/"),
            SessionStore::in_memory(),
        );
        let url = client
            .url("/api/main-modules", &[("q".to_string(), "user account".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/main-modules?q=user+account"
        );
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let client = ApiClient::new(
            ClientConfig::with_base_url("http://example.com/backend"),
            SessionStore::in_memory(),
        );
        let url = client.url("/api/clients", &[]).unwrap();
        assert_eq!(url.as_str(), "http://example.com/backend/api/clients");
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let client = ApiClient::new(
            ClientConfig::with_base_url("not a url"),
            SessionStore::in_memory(),
        );
        assert!(matches!(
            client.url("/api/clients", &[]),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
