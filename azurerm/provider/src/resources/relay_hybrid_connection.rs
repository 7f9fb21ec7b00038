use async_trait::async_trait;
use azurerm_ids::ResourceId;
use azurerm_sdk::services::relay::hybrid_connections::{HybridConnection, HybridConnectionId, HybridConnectionProperties};
use serde_json::Value;

use super::{deleted, ensure_absent, found_or_gone};
use crate::data::ResourceData;
use crate::error::{Error, Result};
use crate::resource::{required_str, state_id, Context, Resource};
use crate::schema::{Attribute, Schema, ValueType};
use crate::validation;

pub const TYPE_NAME: &str = "azurerm_relay_hybrid_connection";

/// `azurerm_relay_hybrid_connection`
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayHybridConnection;

impl RelayHybridConnection {
    fn body(data: &ResourceData) -> HybridConnection {
        HybridConnection {
            properties: Some(HybridConnectionProperties {
                requires_client_authorization: Some(data.get_bool("requires_client_authorization").unwrap_or(true)),
                user_metadata: data.get_str("user_metadata").map(str::to_string),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Resource for RelayHybridConnection {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute(
                "name",
                Attribute::new(ValueType::String)
                    .required()
                    .force_new()
                    .validate(validation::string_is_not_empty()),
            )
            .attribute(
                "resource_group_name",
                Attribute::new(ValueType::String)
                    .required()
                    .force_new()
                    .validate(validation::resource_group_name()),
            )
            .attribute(
                "relay_namespace_name",
                Attribute::new(ValueType::String)
                    .required()
                    .force_new()
                    .validate(validation::string_is_not_empty()),
            )
            .attribute(
                "requires_client_authorization",
                Attribute::new(ValueType::Bool).default(true).force_new(),
            )
            .attribute("user_metadata", Attribute::new(ValueType::String).optional())
            .attribute("id", Attribute::new(ValueType::String).computed())
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        HybridConnectionId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let clients = &ctx.clients;
        let id = HybridConnectionId::new(
            ctx.subscription_id(),
            required_str(data, "resource_group_name")?,
            required_str(data, "relay_namespace_name")?,
            required_str(data, "name")?,
        );

        ensure_absent(TYPE_NAME, &id, clients.hybrid_connections.get(&id).await)?;

        clients
            .hybrid_connections
            .create_or_update_then_poll(&id, &Self::body(data), &ctx.cancel)
            .await
            .map_err(Error::request("creating", &id))?;

        data.set_id(id.id());
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = HybridConnectionId::parse(state_id(data)?)?;

        let Some(connection) = found_or_gone(data, &id, ctx.clients.hybrid_connections.get(&id).await)? else {
            return Ok(());
        };

        data.set("name", id.hybrid_connection_name.as_str());
        data.set("resource_group_name", id.resource_group_name.as_str());
        data.set("relay_namespace_name", id.namespace_name.as_str());

        let properties = connection.properties.unwrap_or_default();
        data.set(
            "requires_client_authorization",
            properties.requires_client_authorization.unwrap_or(true),
        );
        data.set(
            "user_metadata",
            properties.user_metadata.map(Value::String).unwrap_or(Value::Null),
        );
        Ok(())
    }

    fn supports_update(&self) -> bool {
        true
    }

    /// Only `user_metadata` can change in place and the service takes a full PUT for it
    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = HybridConnectionId::parse(state_id(data)?)?;

        if data.has_change("user_metadata") {
            ctx.clients
                .hybrid_connections
                .create_or_update_then_poll(&id, &Self::body(data), &ctx.cancel)
                .await
                .map_err(Error::request("updating", &id))?;
        }

        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = HybridConnectionId::parse(state_id(data)?)?;
        deleted(&id, ctx.clients.hybrid_connections.delete_then_poll(&id, &ctx.cancel).await)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;

    #[test]
    fn client_authorization_defaults_to_required() {
        let schema = RelayHybridConnection.schema();
        let mut config: Map<String, Value> = json!({
            "name": "hc",
            "resource_group_name": "rg",
            "relay_namespace_name": "relay",
        })
        .as_object()
        .cloned()
        .unwrap();

        assert!(schema.validate_config(&config).is_empty());
        schema.apply_defaults(&mut config);

        let body = RelayHybridConnection::body(&ResourceData::new(config));
        let properties = body.properties.unwrap();
        assert_eq!(properties.requires_client_authorization, Some(true));
        assert_eq!(properties.user_metadata, None);
    }

    #[test]
    fn client_authorization_forces_replacement() {
        let schema = RelayHybridConnection.schema();
        let forced: Vec<_> = schema.force_new_attributes().collect();
        assert!(forced.contains(&"requires_client_authorization"));
        assert!(!forced.contains(&"user_metadata"));
    }
}
