//! Provider configuration: credentials, target subscription and feature toggles.

use std::sync::Arc;
use std::time::Duration;

use azurerm_sdk::{Authorizer, Client, ClientSecretAuthorizer, Environment, RetryOptions, StaticTokenAuthorizer};
use bon::Builder;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::timeouts::option_duration_str;

/// Errors that can occur during configuration validation
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("a subscription ID is required")]
    #[diagnostic(
        code(azurerm::config::missing_subscription),
        help("set `subscription_id` or the ARM_SUBSCRIPTION_ID environment variable")
    )]
    MissingSubscription,

    #[error("no credentials were configured, missing {missing:?}")]
    #[diagnostic(
        code(azurerm::config::missing_credentials),
        help(
            "either provide an access token (ARM_ACCESS_TOKEN) or a service principal \
             (ARM_TENANT_ID, ARM_CLIENT_ID and ARM_CLIENT_SECRET)"
        )
    )]
    MissingCredentials { missing: Vec<&'static str> },

    #[error("the environment {0:?} is not known")]
    #[diagnostic(
        code(azurerm::config::unknown_environment),
        help("use one of `public`, `china` or `usgovernment`, or set `resource_manager_endpoint`")
    )]
    UnknownEnvironment(String),

    #[error("retry.max_attempts must be at least 1")]
    InvalidRetryAttempts,

    #[error("the poll interval must be greater than zero")]
    InvalidPollInterval,

    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{name}: {message}")]
    InvalidValue { name: &'static str, message: String },

    #[error("building the authorizer: {0}")]
    Authorizer(#[source] azurerm_sdk::Error),
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    RetryOptions::default().max_attempts
}

/// Behaviour of the resource group resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceGroupFeatures {
    /// Refuse to delete a resource group that still contains resources
    #[builder(default = default_true())]
    pub prevent_deletion_if_contains_resources: bool,
}

impl Default for ResourceGroupFeatures {
    fn default() -> Self {
        Self {
            prevent_deletion_if_contains_resources: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(default, deny_unknown_fields)]
pub struct Features {
    #[builder(default)]
    pub resource_group: ResourceGroupFeatures,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    #[builder(default = default_max_attempts())]
    pub max_attempts: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Provider configuration as written in a manifest or read from the environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    #[builder(into)]
    pub subscription_id: Option<String>,
    #[builder(into)]
    pub tenant_id: Option<String>,
    #[builder(into)]
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    #[builder(into)]
    pub client_secret: Option<String>,
    /// `public`, `china` or `usgovernment`, defaults to `public`
    #[builder(into)]
    pub environment: Option<String>,
    /// Overrides the Resource Manager endpoint of the environment
    pub resource_manager_endpoint: Option<Url>,
    /// A pre-acquired bearer token, used instead of a service principal
    #[serde(skip_serializing)]
    #[builder(into)]
    pub access_token: Option<String>,
    #[builder(default)]
    pub skip_provider_registration: bool,
    #[builder(default)]
    pub features: Features,
    #[builder(default)]
    pub retry: RetrySettings,
    #[serde(with = "option_duration_str", skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<Duration>,
}

impl ProviderConfig {
    /// Read the `ARM_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps variable names to values
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let resource_manager_endpoint = var("ARM_ENDPOINT")
            .map(|raw| Url::parse(&raw))
            .transpose()
            .map_err(|source| ConfigError::InvalidUrl {
                name: "ARM_ENDPOINT",
                source,
            })?;

        let skip_provider_registration = match var("ARM_SKIP_PROVIDER_REGISTRATION") {
            Some(raw) => raw.parse::<bool>().map_err(|e| ConfigError::InvalidValue {
                name: "ARM_SKIP_PROVIDER_REGISTRATION",
                message: e.to_string(),
            })?,
            None => false,
        };

        let poll_interval = var("ARM_POLL_INTERVAL")
            .map(|raw| crate::timeouts::parse_duration(&raw))
            .transpose()
            .map_err(|message| ConfigError::InvalidValue {
                name: "ARM_POLL_INTERVAL",
                message,
            })?;

        Ok(Self {
            subscription_id: var("ARM_SUBSCRIPTION_ID"),
            tenant_id: var("ARM_TENANT_ID"),
            client_id: var("ARM_CLIENT_ID"),
            client_secret: var("ARM_CLIENT_SECRET"),
            environment: var("ARM_ENVIRONMENT"),
            resource_manager_endpoint,
            access_token: var("ARM_ACCESS_TOKEN"),
            skip_provider_registration,
            poll_interval,
            ..Self::default()
        })
    }

    /// Fill every unset field from `other`
    pub fn merge(self, other: ProviderConfig) -> Self {
        Self {
            subscription_id: self.subscription_id.or(other.subscription_id),
            tenant_id: self.tenant_id.or(other.tenant_id),
            client_id: self.client_id.or(other.client_id),
            client_secret: self.client_secret.or(other.client_secret),
            environment: self.environment.or(other.environment),
            resource_manager_endpoint: self.resource_manager_endpoint.or(other.resource_manager_endpoint),
            access_token: self.access_token.or(other.access_token),
            skip_provider_registration: self.skip_provider_registration || other.skip_provider_registration,
            poll_interval: self.poll_interval.or(other.poll_interval),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if blank(self.subscription_id.as_deref()) {
            return Err(ConfigError::MissingSubscription);
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryAttempts);
        }

        if self.poll_interval == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidPollInterval);
        }

        self.environment()?;

        if self.access_token.is_some() {
            return Ok(());
        }

        let missing: Vec<&'static str> = [
            ("tenant_id", &self.tenant_id),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ]
        .into_iter()
        .filter(|(_, value)| blank(value.as_deref()))
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingCredentials { missing })
        }
    }

    pub fn subscription(&self) -> Result<&str, ConfigError> {
        self.subscription_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSubscription)
    }

    /// The cloud to talk to, with the endpoint override applied
    pub fn environment(&self) -> Result<Environment, ConfigError> {
        let name = self.environment.as_deref().unwrap_or("public");
        let mut environment = Environment::from_name(name)
            .map_err(|_| ConfigError::UnknownEnvironment(name.to_string()))?;

        if let Some(endpoint) = &self.resource_manager_endpoint {
            environment.resource_manager = endpoint.clone();
        }
        Ok(environment)
    }

    pub fn authorizer(&self, environment: &Environment) -> Result<Arc<dyn Authorizer>, ConfigError> {
        if let Some(token) = &self.access_token {
            return Ok(Arc::new(StaticTokenAuthorizer::new(token.clone())));
        }

        match (&self.tenant_id, &self.client_id, &self.client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                let authorizer =
                    ClientSecretAuthorizer::new(environment, tenant_id, client_id, client_secret)
                        .map_err(ConfigError::Authorizer)?;
                Ok(Arc::new(authorizer))
            }
            _ => Err(ConfigError::MissingCredentials {
                missing: vec!["access_token"],
            }),
        }
    }

    /// Validate the configuration and build an authorized Resource Manager client
    pub fn client(&self) -> Result<Client, ConfigError> {
        self.validate()?;

        let environment = self.environment()?;
        let authorizer = self.authorizer(&environment)?;

        let mut client = Client::new(environment.resource_manager.clone(), authorizer)
            .with_retry(RetryOptions {
                max_attempts: self.retry.max_attempts,
                ..RetryOptions::default()
            })
            .with_user_agent_suffix(concat!("azurerm-provider/", env!("CARGO_PKG_VERSION")));

        if let Some(interval) = self.poll_interval {
            client = client.with_poll_interval(interval);
        }
        Ok(client)
    }
}

fn blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}
