//! Resource provider registration, api-version `2022-09-01`

use azurerm_ids::{resource_id, ResourceId, Segment};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::resource_groups::API_VERSION;
use crate::client::Client;
use crate::error::{Error, Result};
use crate::services::Operations;
use crate::string_enum;

resource_id! {
    /// A resource provider namespace within a subscription
    pub struct ResourceProviderId("Resource Provider") {
        subscription_id => "subscriptionId", "Subscription",
        provider_name => "providerName", "Provider Name",
    }
    segments = [
        Segment::static_segment("staticSubscriptions", "subscriptions"),
        Segment::subscription_id("subscriptionId"),
        Segment::static_segment("staticProviders", "providers"),
        Segment::user_specified("providerName", "Microsoft.Example"),
    ];
}

string_enum! {
    pub enum RegistrationState {
        Registered => "Registered",
        NotRegistered => "NotRegistered",
        Registering => "Registering",
        Unregistering => "Unregistering",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_state: Option<RegistrationState>,
}

impl ResourceProvider {
    pub fn is_registered(&self) -> bool {
        self.registration_state == Some(RegistrationState::Registered)
    }
}

#[derive(Debug, Clone)]
pub struct ProvidersClient {
    operations: Operations,
}

impl ProvidersClient {
    pub fn new(client: Client) -> Self {
        Self {
            operations: Operations::new(client, API_VERSION),
        }
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn get(&self, id: &ResourceProviderId) -> Result<ResourceProvider> {
        self.operations.get(&id.id()).await
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn register(&self, id: &ResourceProviderId) -> Result<ResourceProvider> {
        self.operations
            .action(&format!("{}/register", id.id()))
            .await
    }

    /// Register the namespace unless it already is, then wait for `Registered`
    pub async fn ensure_registered(&self, id: &ResourceProviderId, cancel: &CancellationToken) -> Result<()> {
        if self.get(id).await?.is_registered() {
            debug!(provider = %id.provider_name, "resource provider already registered");
            return Ok(());
        }

        info!(provider = %id.provider_name, "registering resource provider");
        let mut provider = self.register(id).await?;
        while !provider.is_registered() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::PollingCancelled),
                _ = tokio::time::sleep(self.operations.poll_interval()) => {}
            }
            provider = self.get(id).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_format() {
        let id = ResourceProviderId::new("sub", "Microsoft.Relay");
        assert_eq!(id.id(), "/subscriptions/sub/providers/Microsoft.Relay");
    }

    #[test]
    fn decodes_registration_state() {
        let provider: ResourceProvider =
            serde_json::from_str(r#"{"namespace":"Microsoft.Relay","registrationState":"registering"}"#).unwrap();
        assert_eq!(provider.registration_state, Some(RegistrationState::Registering));
        assert!(!provider.is_registered());
    }
}
