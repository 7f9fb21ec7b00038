//! The shared Resource Manager HTTP client.
//!
//! Every typed service client wraps a [`Client`]; the client owns URL construction,
//! authorization headers, retries and turning unexpected responses into [`Error`]s.

use std::{sync::Arc, time::Duration};

use bon::Builder;
use reqwest::{
    header::{HeaderMap, ACCEPT, RETRY_AFTER, USER_AGENT},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::auth::Authorizer;
use crate::error::{Error, ErrorEnvelope, Result};

const DEFAULT_USER_AGENT: &str = concat!("azurerm-rs/", env!("CARGO_PKG_VERSION"));
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Retry behaviour for throttled and transient failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOptions {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryOptions {
    /// No retries at all
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Exponential backoff for the given (1-based) attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// A single Resource Manager request
#[derive(Debug, Clone, Builder)]
pub struct RequestOptions {
    pub method: Method,
    /// Path below the endpoint, usually a resource ID
    #[builder(into)]
    pub path: String,
    #[builder(into)]
    pub api_version: String,
    #[builder(default)]
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    #[builder(default = vec![StatusCode::OK])]
    pub expected_status: Vec<StatusCode>,
}

/// A buffered response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub url: Url,
}

impl Response {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|source| Error::Decode {
            url: self.url.to_string(),
            source,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Retry-After` in its delay-seconds form
    pub fn retry_after(&self) -> Option<Duration> {
        retry_after(&self.headers)
    }

    fn into_unexpected(self, method: &Method) -> Error {
        let body = String::from_utf8_lossy(&self.body).into_owned();
        let error = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        Error::UnexpectedStatus {
            status: self.status,
            method: method.to_string(),
            url: self.url.to_string(),
            error,
            body,
        }
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn is_idempotent(method: &Method) -> bool {
    matches!(method.as_str(), "GET" | "HEAD" | "PUT" | "DELETE")
}

fn is_retryable(method: &Method, status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || (is_idempotent(method) && status.is_server_error())
}

/// Resource Manager client bound to one endpoint and authorizer
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
    authorizer: Arc<dyn Authorizer>,
    retry: RetryOptions,
    user_agent: String,
    poll_interval: Duration,
}

impl Client {
    pub fn new(endpoint: Url, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            authorizer,
            retry: RetryOptions::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// Append a product token to the default user agent, e.g. a partner ID
    pub fn with_user_agent_suffix(mut self, suffix: &str) -> Self {
        if !suffix.is_empty() {
            self.user_agent = format!("{} {}", self.user_agent, suffix);
        }
        self
    }

    /// Delay between polls of a long running operation when the service gives no `Retry-After`
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Build the request URL for a path, api-version and extra query parameters
    pub fn url_for(&self, path: &str, api_version: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/{}", path.trim_start_matches('/')));
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", api_version);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Resolve a link returned by the service (`nextLink`, `Location`, ...) against the endpoint
    pub fn resolve(&self, link: &str) -> Result<Url> {
        Ok(self.endpoint.join(link)?)
    }

    #[instrument(skip(self, options), fields(method = %options.method, path = %options.path), err)]
    pub async fn execute(&self, options: &RequestOptions) -> Result<Response> {
        let url = self.url_for(&options.path, &options.api_version, &options.query)?;
        self.send(
            options.method.clone(),
            url,
            options.body.as_ref(),
            &options.expected_status,
        )
        .await
    }

    /// Send a request to a fully built URL, retrying throttled and transient failures
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
        expected_status: &[StatusCode],
    ) -> Result<Response> {
        let mut attempt = 1;

        loop {
            let token = self.authorizer.token().await?;

            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(&token.token)
                .header(USER_AGENT, &self.user_agent)
                .header(ACCEPT, "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(%method, %url, attempt, "sending request");
            let response = match request.send().await {
                Ok(response) => response,
                Err(source) if is_idempotent(&method) && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(%method, %url, attempt, error = %source, ?delay, "transport error, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(source) => {
                    return Err(Error::Transport {
                        method: method.to_string(),
                        url: url.to_string(),
                        source,
                    })
                }
            };

            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.bytes().await.map_err(|source| Error::Transport {
                method: method.to_string(),
                url: url.to_string(),
                source,
            })?;

            let response = Response {
                status,
                headers,
                body: bytes.to_vec(),
                url: url.clone(),
            };

            if expected_status.contains(&status) {
                debug!(%method, %url, %status, "received expected response");
                return Ok(response);
            }

            if is_retryable(&method, status) && attempt < self.retry.max_attempts {
                let delay = response
                    .retry_after()
                    .unwrap_or_else(|| self.retry.backoff(attempt))
                    .min(self.retry.max_delay);
                warn!(%method, %url, %status, attempt, ?delay, "retryable response, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return Err(response.into_unexpected(&method));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenAuthorizer;
    use rstest::rstest;
    use tracing_test::traced_test;

    fn client(endpoint: &str) -> Client {
        Client::new(
            Url::parse(endpoint).unwrap(),
            Arc::new(StaticTokenAuthorizer::new("token")),
        )
    }

    #[test]
    fn url_for_appends_api_version_and_query() {
        let url = client("https://management.azure.com/")
            .url_for(
                "/subscriptions/sub/resourceGroups/rg",
                "2022-09-01",
                &[("$top".to_string(), "10".to_string())],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg?api-version=2022-09-01&%24top=10"
        );
    }

    #[test]
    fn url_for_keeps_endpoint_base_path() {
        let url = client("http://localhost:8080/arm/")
            .url_for("/subscriptions/sub", "2022-09-01", &[])
            .unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:8080/arm/subscriptions/sub?api-version=2022-09-01"
        );
    }

    #[test]
    fn resolve_accepts_absolute_and_relative_links() {
        let client = client("https://management.azure.com/");

        assert_eq!(
            client.resolve("https://other.example/next?x=1").unwrap().as_str(),
            "https://other.example/next?x=1"
        );
        assert_eq!(
            client.resolve("/subscriptions/sub?page=2").unwrap().as_str(),
            "https://management.azure.com/subscriptions/sub?page=2"
        );
    }

    #[rstest]
    #[case(1, Duration::from_millis(500))]
    #[case(2, Duration::from_secs(1))]
    #[case(3, Duration::from_secs(2))]
    #[case(20, Duration::from_secs(60))]
    fn backoff_doubles_until_capped(#[case] attempt: u32, #[case] expected: Duration) {
        assert_eq!(RetryOptions::default().backoff(attempt), expected);
    }

    #[rstest]
    #[case(Method::GET, StatusCode::SERVICE_UNAVAILABLE, true)]
    #[case(Method::PUT, StatusCode::INTERNAL_SERVER_ERROR, true)]
    #[case(Method::POST, StatusCode::INTERNAL_SERVER_ERROR, false)]
    #[case(Method::POST, StatusCode::TOO_MANY_REQUESTS, true)]
    #[case(Method::PATCH, StatusCode::TOO_MANY_REQUESTS, true)]
    #[case(Method::GET, StatusCode::NOT_FOUND, false)]
    fn retry_policy(#[case] method: Method, #[case] status: StatusCode, #[case] expected: bool) {
        assert_eq!(is_retryable(&method, status), expected);
    }

    #[tokio::test]
    #[traced_test]
    async fn throttling_is_logged_and_retried() {
        let arm = azurerm_mock::MockArm::start().await.unwrap();
        arm.insert(
            "/subscriptions/sub/resourceGroups/rg",
            serde_json::json!({"location": "westeurope"}),
        );
        arm.throttle_next(1);

        let client = Client::new(arm.endpoint(), Arc::new(StaticTokenAuthorizer::new(arm.token())))
            .with_retry(RetryOptions {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
            });
        let options = RequestOptions::builder()
            .method(Method::GET)
            .path("/subscriptions/sub/resourceGroups/rg")
            .api_version("2022-09-01")
            .build();

        let response = client.execute(&options).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert!(logs_contain("retryable response, retrying"));
    }

    #[test]
    fn request_options_default_to_ok() {
        let options = RequestOptions::builder()
            .method(Method::GET)
            .path("/subscriptions/sub")
            .api_version("2022-09-01")
            .build();

        assert_eq!(options.expected_status, vec![StatusCode::OK]);
        assert!(options.query.is_empty());
        assert!(options.body.is_none());
    }
}
