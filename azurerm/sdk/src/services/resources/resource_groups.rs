//! Resource groups, api-version `2022-09-01`

use std::collections::BTreeMap;

use azurerm_ids::{ResourceGroupId, ResourceId, SubscriptionId};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::client::Client;
use crate::enums::ProvisioningState;
use crate::error::Result;
use crate::poller::Poller;
use crate::services::{complete_delete, Operations};

pub const API_VERSION: &str = "2022-09-01";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

/// Body of a PATCH on a resource group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupPatchable {
    /// `Some(None)` clears the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

/// A resource contained in a resource group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericResource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResourceGroupsClient {
    operations: Operations,
}

impl ResourceGroupsClient {
    pub fn new(client: Client) -> Self {
        Self {
            operations: Operations::new(client, API_VERSION),
        }
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn get(&self, id: &ResourceGroupId) -> Result<ResourceGroup> {
        self.operations.get(&id.id()).await
    }

    /// Resource group writes are synchronous, the returned group is final
    #[instrument(skip(self, group), fields(id = %id), err)]
    pub async fn create_or_update(&self, id: &ResourceGroupId, group: &ResourceGroup) -> Result<ResourceGroup> {
        let poller = self.operations.put(&id.id(), group).await?;
        poller.poll_until_done(&CancellationToken::new()).await?.json()
    }

    #[instrument(skip(self, patch), fields(id = %id), err)]
    pub async fn update(&self, id: &ResourceGroupId, patch: &ResourceGroupPatchable) -> Result<ResourceGroup> {
        let poller = self.operations.patch(&id.id(), patch).await?;
        poller.poll_until_done(&CancellationToken::new()).await?.json()
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn delete(&self, id: &ResourceGroupId) -> Result<Poller> {
        self.operations.delete(&id.id()).await
    }

    pub async fn delete_then_poll(&self, id: &ResourceGroupId, cancel: &CancellationToken) -> Result<()> {
        complete_delete(self.delete(id).await?, cancel).await
    }

    #[instrument(skip(self), fields(subscription = %subscription), err)]
    pub async fn list_by_subscription(&self, subscription: &SubscriptionId) -> Result<Vec<ResourceGroup>> {
        self.operations
            .list(&format!("{}/resourceGroups", subscription.id()))
            .await
    }

    /// Every resource inside the group
    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn list_resources(&self, id: &ResourceGroupId) -> Result<Vec<GenericResource>> {
        self.operations.list(&format!("{}/resources", id.id())).await
    }
}
