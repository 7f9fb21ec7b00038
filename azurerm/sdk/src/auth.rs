//! Bearer token acquisition for Resource Manager requests

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;

use crate::environment::Environment;
use crate::error::{Error, ErrorEnvelope, Result};

/// Tokens are refreshed when they expire within this window
const REFRESH_WINDOW_MINUTES: i64 = 5;

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    pub fn expires_within(&self, window: Duration) -> bool {
        self.expires_on - window <= Utc::now()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Supplies bearer tokens to the [`Client`](crate::Client)
#[async_trait]
pub trait Authorizer: Send + Sync + fmt::Debug {
    async fn token(&self) -> Result<AccessToken>;
}

/// A pre-acquired token, used as-is for every request
#[derive(Debug, Clone)]
pub struct StaticTokenAuthorizer {
    token: AccessToken,
}

impl StaticTokenAuthorizer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, DateTime::<Utc>::MAX_UTC),
        }
    }
}

#[async_trait]
impl Authorizer for StaticTokenAuthorizer {
    async fn token(&self) -> Result<AccessToken> {
        Ok(self.token.clone())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: serde_json::Value,
}

/// OAuth2 client credentials flow against the environment's login endpoint
pub struct ClientSecretAuthorizer {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for ClientSecretAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretAuthorizer")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ClientSecretAuthorizer {
    pub fn new(
        environment: &Environment,
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let token_url = environment
            .login_endpoint
            .join(&format!("{tenant_id}/oauth2/v2.0/token"))?;

        Ok(Self {
            http: reqwest::Client::new(),
            token_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: format!("{}/.default", environment.token_audience),
            cached: Mutex::new(None),
        })
    }

    #[instrument(skip(self), fields(token_url = %self.token_url), err)]
    async fn acquire(&self) -> Result<AccessToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Authorization(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Authorization(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.to_string())
                .unwrap_or(body);
            return Err(Error::Authorization(format!(
                "token endpoint returned {status}: {detail}"
            )));
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Authorization(e.to_string()))?;

        let expires_in = match &token.expires_in {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| Error::Authorization("token response had no valid expires_in".to_string()))?;

        debug!(expires_in, "acquired access token");
        Ok(AccessToken::new(
            token.access_token,
            Utc::now() + Duration::seconds(expires_in),
        ))
    }
}

#[async_trait]
impl Authorizer for ClientSecretAuthorizer {
    async fn token(&self) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.expires_within(Duration::minutes(REFRESH_WINDOW_MINUTES)) {
                return Ok(token.clone());
            }
        }

        let token = self.acquire().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
