use azurerm_ids::{resource_id, ResourceId, Segment};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::namespaces::NamespaceId;
use super::API_VERSION;
use crate::client::Client;
use crate::error::Result;
use crate::poller::Poller;
use crate::services::{complete, complete_delete, Operations};

resource_id! {
    /// A Relay hybrid connection
    pub struct HybridConnectionId("Hybrid Connection") {
        subscription_id => "subscriptionId", "Subscription",
        resource_group_name => "resourceGroupName", "Resource Group Name",
        namespace_name => "namespaceName", "Namespace Name",
        hybrid_connection_name => "hybridConnectionName", "Hybrid Connection Name",
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
        Segment::static_segment("staticHybridConnections", "hybridConnections"),
        Segment::user_specified("hybridConnectionName", "hybridConnectionValue"),
    ];
}

impl HybridConnectionId {
    pub fn namespace(&self) -> NamespaceId {
        NamespaceId::new(
            &self.subscription_id,
            &self.resource_group_name,
            &self.namespace_name,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridConnection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<HybridConnectionProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridConnectionProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_client_authorization: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listener_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HybridConnectionsClient {
    operations: Operations,
}

impl HybridConnectionsClient {
    pub fn new(client: Client) -> Self {
        Self {
            operations: Operations::new(client, API_VERSION),
        }
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn get(&self, id: &HybridConnectionId) -> Result<HybridConnection> {
        self.operations.get(&id.id()).await
    }

    #[instrument(skip(self, connection), fields(id = %id), err)]
    pub async fn create_or_update(&self, id: &HybridConnectionId, connection: &HybridConnection) -> Result<Poller> {
        self.operations.put(&id.id(), connection).await
    }

    pub async fn create_or_update_then_poll(
        &self,
        id: &HybridConnectionId,
        connection: &HybridConnection,
        cancel: &CancellationToken,
    ) -> Result<HybridConnection> {
        complete(self.create_or_update(id, connection).await?, cancel).await
    }

    #[instrument(skip(self), fields(id = %id), err)]
    pub async fn delete(&self, id: &HybridConnectionId) -> Result<Poller> {
        self.operations.delete(&id.id()).await
    }

    pub async fn delete_then_poll(&self, id: &HybridConnectionId, cancel: &CancellationToken) -> Result<()> {
        complete_delete(self.delete(id).await?, cancel).await
    }

    #[instrument(skip(self), fields(namespace = %namespace), err)]
    pub async fn list_by_namespace(&self, namespace: &NamespaceId) -> Result<Vec<HybridConnection>> {
        self.operations
            .list(&format!("{}/hybridConnections", namespace.id()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_namespace() {
        let id = HybridConnectionId::new("sub", "rg", "relay1", "conn1");
        assert_eq!(id.namespace(), NamespaceId::new("sub", "rg", "relay1"));
    }

    #[test]
    fn body_uses_camel_case() {
        let connection = HybridConnection {
            properties: Some(HybridConnectionProperties {
                requires_client_authorization: Some(true),
                user_metadata: Some("meta".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&connection).unwrap(),
            serde_json::json!({
                "properties": {"requiresClientAuthorization": true, "userMetadata": "meta"}
            })
        );
    }
}
