use std::collections::BTreeMap;

use azurerm_ids::{resource_id, ResourceGroupId, ResourceId, Segment};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::API_VERSION;
use crate::client::Client;
use crate::enums::ProvisioningState;
use crate::error::Result;
use crate::poller::Poller;
use crate::services::{complete, complete_delete, Operations};
use crate::string_enum;

resource_id! {
    /// A Relay namespace
    pub struct NamespaceId("Namespace") {
        subscription_id => "subscriptionId", "Subscription",
        resource_group_name => "resourceGroupName", "Resource Group Name",
        namespace_name => "namespaceName", "Namespace Name",
    }
    segments = [
        Segment::static_segment("staticSubscriptions", "subscriptions"),
        Segment::subscription_id("subscriptionId"),
        Segment::static_segment("staticResourceGroups", "resourceGroups"),
        Segment::resource_group("resourceGroupName"),
        Segment::static_segment("staticProviders", "providers"),
        Segment::resource_provider("staticMicrosoftRelay", "Microsoft.Relay"),
        Segment::static_segment("staticNamespaces", "namespaces"),
        Segment::user_specified("namespaceName", "namespaceValue"),
    ];
}

impl NamespaceId {
    pub fn resource_group(&self) -> ResourceGroupId {
        ResourceGroupId::new(&self.subscription_id, &self.resource_group_name)
    }
}

string_enum! {
    pub enum SkuName {
        Standard => "Standard",
    }
}

string_enum! {
    pub enum SkuTier {
        Standard => "Standard",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    pub name: SkuName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<SkuTier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayNamespace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<RelayNamespaceProperties>,
}

/// Read-only properties reported by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayNamespaceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_bus_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayUpdateParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct NamespacesClient {
    operations: Operations,
}

impl NamespacesClient {
    pub fn new(client: Client) -> Self {
        Self {
            operations: Operations::new(client, API_VERSION),
        }
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn get(&self, id: &NamespaceId) -> Result<RelayNamespace> {
        self.operations.get(&id.id()).await
    }

    #[instrument(skip(self, namespace), fields(id = %id), err)]
    pub async fn create_or_update(&self, id: &NamespaceId, namespace: &RelayNamespace) -> Result<Poller> {
        self.operations.put(&id.id(), namespace).await
    }

    pub async fn create_or_update_then_poll(
        &self,
        id: &NamespaceId,
        namespace: &RelayNamespace,
        cancel: &CancellationToken,
    ) -> Result<RelayNamespace> {
        complete(self.create_or_update(id, namespace).await?, cancel).await
    }

    #[instrument(skip(self, parameters), fields(id = %id), err)]
    pub async fn update(&self, id: &NamespaceId, parameters: &RelayUpdateParameters) -> Result<RelayNamespace> {
        complete(
            self.operations.patch(&id.id(), parameters).await?,
            &CancellationToken::new(),
        )
        .await
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn delete(&self, id: &NamespaceId) -> Result<Poller> {
        self.operations.delete(&id.id()).await
    }

    pub async fn delete_then_poll(&self, id: &NamespaceId, cancel: &CancellationToken) -> Result<()> {
        complete_delete(self.delete(id).await?, cancel).await
    }

    #[instrument(skip(self), fields(resource_group = %resource_group), err)]
    pub async fn list_by_resource_group(&self, resource_group: &ResourceGroupId) -> Result<Vec<RelayNamespace>> {
        self.operations
            .list(&format!(
                "{}/providers/Microsoft.Relay/namespaces",
                resource_group.id()
            ))
            .await
    }
}
