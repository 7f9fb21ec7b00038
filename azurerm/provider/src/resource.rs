//! The contract every managed resource type implements.

use std::sync::Arc;

use async_trait::async_trait;
use azurerm_sdk::services::network::{subnets::SubnetsClient, virtual_networks::VirtualNetworksClient};
use azurerm_sdk::services::relay::{hybrid_connections::HybridConnectionsClient, namespaces::NamespacesClient};
use azurerm_sdk::services::resources::{providers::ProvidersClient, resource_groups::ResourceGroupsClient};
use azurerm_sdk::Client;
use tokio_util::sync::CancellationToken;

use crate::config::Features;
use crate::data::ResourceData;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::timeouts::Timeouts;

/// The typed service clients and provider-wide settings handed to every handler
#[derive(Debug, Clone)]
pub struct ProviderClients {
    pub subscription_id: String,
    pub features: Features,
    pub providers: ProvidersClient,
    pub resource_groups: ResourceGroupsClient,
    pub relay_namespaces: NamespacesClient,
    pub hybrid_connections: HybridConnectionsClient,
    pub virtual_networks: VirtualNetworksClient,
    pub subnets: SubnetsClient,
}

impl ProviderClients {
    pub fn new(client: Client, subscription_id: impl Into<String>, features: Features) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            features,
            providers: ProvidersClient::new(client.clone()),
            resource_groups: ResourceGroupsClient::new(client.clone()),
            relay_namespaces: NamespacesClient::new(client.clone()),
            hybrid_connections: HybridConnectionsClient::new(client.clone()),
            virtual_networks: VirtualNetworksClient::new(client.clone()),
            subnets: SubnetsClient::new(client),
        }
    }
}

/// What a handler needs besides the resource data
#[derive(Debug, Clone)]
pub struct Context {
    pub clients: Arc<ProviderClients>,
    /// Cancelled when the operation's deadline passes or the caller gives up
    pub cancel: CancellationToken,
}

impl Context {
    pub fn new(clients: Arc<ProviderClients>, cancel: CancellationToken) -> Self {
        Self { clients, cancel }
    }

    pub fn subscription_id(&self) -> &str {
        &self.clients.subscription_id
    }
}

/// A managed resource type, e.g. `azurerm_resource_group`.
///
/// `create` and `update` finish by reading the resource back so that computed
/// attributes land in state. `read` clears the ID when the resource is gone rather
/// than failing, and `delete` treats a missing resource as already deleted.
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Reject an import ID that does not parse as this resource's ID type
    fn validate_import_id(&self, id: &str) -> Result<()>;

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()>;

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()>;

    /// Resources without in-place updates mark every configurable attribute `force_new`
    fn supports_update(&self) -> bool {
        false
    }

    async fn update(&self, _ctx: &Context, _data: &mut ResourceData) -> Result<()> {
        Err(Error::RequiresReplacement {
            resource_type: self.type_name().to_string(),
            attributes: vec![],
        })
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()>;
}

/// A required string from the data bag
pub(crate) fn required_str<'a>(data: &'a ResourceData, attribute: &str) -> Result<&'a str> {
    data.get_str(attribute).ok_or_else(|| Error::MissingAttribute {
        id: data.id().unwrap_or("(new resource)").to_string(),
        attribute: attribute.to_string(),
    })
}

/// The ID recorded in state, for read, update and delete
pub(crate) fn state_id(data: &ResourceData) -> Result<&str> {
    data.id().ok_or_else(|| Error::MissingAttribute {
        id: "(unknown)".to_string(),
        attribute: "id".to_string(),
    })
}
