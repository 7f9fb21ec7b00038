use azurerm_ids::{resource_id, ResourceId, Segment};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::virtual_networks::VirtualNetworkId;
use super::API_VERSION;
use crate::client::Client;
use crate::enums::ProvisioningState;
use crate::error::Result;
use crate::poller::Poller;
use crate::services::{complete, complete_delete, Operations};

resource_id! {
    /// A subnet of a virtual network
    pub struct SubnetId("Subnet") {
        subscription_id => "subscriptionId", "Subscription",
        resource_group_name => "resourceGroupName", "Resource Group Name",
        virtual_network_name => "virtualNetworkName", "Virtual Network Name",
        subnet_name => "subnetName", "Subnet Name",
    }
    segments = [
        Segment::static_segment("staticSubscriptions", "subscriptions"),
        Segment::subscription_id("subscriptionId"),
        Segment::static_segment("staticResourceGroups", "resourceGroups"),
        Segment::resource_group("resourceGroupName"),
        Segment::static_segment("staticProviders", "providers"),
        Segment::resource_provider("staticMicrosoftNetwork", "Microsoft.Network"),
        Segment::static_segment("staticVirtualNetworks", "virtualNetworks"),
        Segment::user_specified("virtualNetworkName", "virtualNetworkValue"),
        Segment::static_segment("staticSubnets", "subnets"),
        Segment::user_specified("subnetName", "subnetValue"),
    ];
}

impl SubnetId {
    pub fn virtual_network(&self) -> VirtualNetworkId {
        VirtualNetworkId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.virtual_network_name,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<SubnetProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    /// Older API responses only carry the single prefix form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefixes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

impl SubnetProperties {
    /// All prefixes regardless of which of the two fields the service filled
    pub fn prefixes(&self) -> Vec<String> {
        match (&self.address_prefixes, &self.address_prefix) {
            (Some(prefixes), _) if !prefixes.is_empty() => prefixes.clone(),
            (_, Some(prefix)) => vec![prefix.clone()],
            _ => vec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubnetsClient {
    operations: Operations,
}

impl SubnetsClient {
    pub fn new(client: Client) -> Self {
        Self {
            operations: Operations::new(client, API_VERSION),
        }
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn get(&self, id: &SubnetId) -> Result<Subnet> {
        self.operations.get(&id.id()).await
    }

    #[instrument(skip(self, subnet), fields(id = %id), err)]
    pub async fn create_or_update(&self, id: &SubnetId, subnet: &Subnet) -> Result<Poller> {
        self.operations.put(&id.id(), subnet).await
    }

    pub async fn create_or_update_then_poll(
        &self,
        id: &SubnetId,
        subnet: &Subnet,
        cancel: &CancellationToken,
    ) -> Result<Subnet> {
        complete(self.create_or_update(id, subnet).await?, cancel).await
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn delete(&self, id: &SubnetId) -> Result<Poller> {
        self.operations.delete(&id.id()).await
    }

    pub async fn delete_then_poll(&self, id: &SubnetId, cancel: &CancellationToken) -> Result<()> {
        complete_delete(self.delete(id).await?, cancel).await
    }

    #[instrument(skip(self), fields(virtual_network = %virtual_network), err)]
    pub async fn list(&self, virtual_network: &VirtualNetworkId) -> Result<Vec<Subnet>> {
        self.operations
            .list(&format!("{}/subnets", virtual_network.id()))
            .await
    }
}
