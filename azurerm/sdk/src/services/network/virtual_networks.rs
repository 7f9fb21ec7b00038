use std::collections::BTreeMap;

use azurerm_ids::{resource_id, ResourceGroupId, ResourceId, Segment};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::subnets::Subnet;
use super::API_VERSION;
use crate::client::Client;
use crate::enums::ProvisioningState;
use crate::error::Result;
use crate::poller::Poller;
use crate::services::{complete, complete_delete, Operations};

resource_id! {
    /// A virtual network
    pub struct VirtualNetworkId("Virtual Network") {
        subscription_id => "subscriptionId", "Subscription",
        resource_group_name => "resourceGroupName", "Resource Group Name",
        virtual_network_name => "virtualNetworkName", "Virtual Network Name",
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
    ];
}

impl VirtualNetworkId {
    pub fn resource_group(&self) -> ResourceGroupId {
        ResourceGroupId::new(&self.subscription_id, &self.resource_group_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<VirtualNetworkProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_space: Option<AddressSpace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_options: Option<DhcpOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnets: Option<Vec<Subnet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhcpOptions {
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

/// PATCH body for tag-only updates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagsObject {
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct VirtualNetworksClient {
    operations: Operations,
}

impl VirtualNetworksClient {
    pub fn new(client: Client) -> Self {
        Self {
            operations: Operations::new(client, API_VERSION),
        }
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn get(&self, id: &VirtualNetworkId) -> Result<VirtualNetwork> {
        self.operations.get(&id.id()).await
    }

    #[instrument(skip(self, network), fields(id = %id), err)]
    pub async fn create_or_update(&self, id: &VirtualNetworkId, network: &VirtualNetwork) -> Result<Poller> {
        self.operations.put(&id.id(), network).await
    }

    pub async fn create_or_update_then_poll(
        &self,
        id: &VirtualNetworkId,
        network: &VirtualNetwork,
        cancel: &CancellationToken,
    ) -> Result<VirtualNetwork> {
        complete(self.create_or_update(id, network).await?, cancel).await
    }

    #[instrument(skip(self, tags), fields(id = %id), err)]
    pub async fn update_tags(&self, id: &VirtualNetworkId, tags: &TagsObject) -> Result<VirtualNetwork> {
        complete(
            self.operations.patch(&id.id(), tags).await?,
            &CancellationToken::new(),
        )
        .await
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn delete(&self, id: &VirtualNetworkId) -> Result<Poller> {
        self.operations.delete(&id.id()).await
    }

    pub async fn delete_then_poll(&self, id: &VirtualNetworkId, cancel: &CancellationToken) -> Result<()> {
        complete_delete(self.delete(id).await?, cancel).await
    }

    #[instrument(skip(self), fields(resource_group = %resource_group), err)]
    pub async fn list(&self, resource_group: &ResourceGroupId) -> Result<Vec<VirtualNetwork>> {
        self.operations
            .list(&format!(
                "{}/providers/Microsoft.Network/virtualNetworks",
                resource_group.id()
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_embedded_subnets() {
        let body = r#"{
            "name": "vnet",
            "location": "westeurope",
            "properties": {
                "addressSpace": {"addressPrefixes": ["10.0.0.0/16"]},
                "dhcpOptions": {"dnsServers": ["10.0.0.4"]},
                "subnets": [{"name": "internal", "properties": {"addressPrefix": "10.0.1.0/24"}}],
                "resourceGuid": "5b3c0b0e-0000-0000-0000-000000000000",
                "provisioningState": "Succeeded"
            }
        }"#;
        let network: VirtualNetwork = serde_json::from_str(body).unwrap();
        let properties = network.properties.unwrap();

        assert_eq!(properties.address_space.unwrap().address_prefixes, vec!["10.0.0.0/16"]);
        assert_eq!(properties.dhcp_options.unwrap().dns_servers, vec!["10.0.0.4"]);
        assert_eq!(properties.subnets.unwrap()[0].name.as_deref(), Some("internal"));
    }
}
