use async_trait::async_trait;
use azurerm_ids::ResourceId;
use azurerm_sdk::services::relay::namespaces::{self, NamespaceId, RelayUpdateParameters, Sku, SkuName, SkuTier};
use serde_json::Value;

use super::{deleted, ensure_absent, found_or_gone};
use crate::data::ResourceData;
use crate::error::{Error, Result};
use crate::resource::{required_str, state_id, Context, Resource};
use crate::schema::{Attribute, Schema, ValueType};
use crate::{location, tags, validation};

pub const TYPE_NAME: &str = "azurerm_relay_namespace";

/// `azurerm_relay_namespace`
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayNamespace;

fn sku(name: &str) -> Sku {
    let name = SkuName::parse_value(name);
    let tier = match name {
        SkuName::Standard => Some(SkuTier::Standard),
        SkuName::Other(_) => None,
    };
    Sku { name, tier }
}

#[async_trait]
impl Resource for RelayNamespace {
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
            .attribute("location", location::schema())
            .attribute(
                "sku_name",
                Attribute::new(ValueType::String)
                    .required()
                    .validate(validation::string_in_slice(SkuName::possible_values(), false)),
            )
            .attribute("tags", tags::schema())
            .attribute("metric_id", Attribute::new(ValueType::String).computed())
            .attribute("id", Attribute::new(ValueType::String).computed())
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        NamespaceId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let clients = &ctx.clients;
        let id = NamespaceId::new(
            ctx.subscription_id(),
            required_str(data, "resource_group_name")?,
            required_str(data, "name")?,
        );

        ensure_absent(TYPE_NAME, &id, clients.relay_namespaces.get(&id).await)?;

        let namespace = namespaces::RelayNamespace {
            location: location::normalize(required_str(data, "location")?),
            sku: Some(sku(required_str(data, "sku_name")?)),
            tags: tags::expand(data),
            ..Default::default()
        };
        clients
            .relay_namespaces
            .create_or_update_then_poll(&id, &namespace, &ctx.cancel)
            .await
            .map_err(Error::request("creating", &id))?;

        data.set_id(id.id());
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = NamespaceId::parse(state_id(data)?)?;

        let Some(namespace) = found_or_gone(data, &id, ctx.clients.relay_namespaces.get(&id).await)? else {
            return Ok(());
        };

        data.set("name", id.namespace_name.as_str());
        data.set("resource_group_name", id.resource_group_name.as_str());
        data.set("location", location::flatten(Some(&namespace.location)));
        if let Some(sku) = &namespace.sku {
            data.set("sku_name", sku.name.as_str());
        }
        data.set(
            "metric_id",
            namespace
                .properties
                .and_then(|p| p.metric_id)
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        data.set("tags", tags::flatten(namespace.tags.as_ref()));
        Ok(())
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = NamespaceId::parse(state_id(data)?)?;

        let mut parameters = RelayUpdateParameters::default();
        if data.has_change("sku_name") {
            parameters.sku = Some(sku(required_str(data, "sku_name")?));
        }
        if data.has_change("tags") {
            parameters.tags = Some(tags::expand(data).unwrap_or_default());
        }

        if parameters != RelayUpdateParameters::default() {
            ctx.clients
                .relay_namespaces
                .update(&id, &parameters)
                .await
                .map_err(Error::request("updating", &id))?;
        }

        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = NamespaceId::parse(state_id(data)?)?;
        deleted(&id, ctx.clients.relay_namespaces.delete_then_poll(&id, &ctx.cancel).await)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn sku_tier_follows_name() {
        assert_eq!(sku("standard").tier, Some(SkuTier::Standard));
        assert_eq!(sku("Premium").tier, None);
    }

    #[test]
    fn only_known_skus_are_accepted() {
        let diagnostics = RelayNamespace.schema().validate_config(&config(json!({
            "name": "relay",
            "resource_group_name": "rg",
            "location": "westeurope",
            "sku_name": "Basic",
        })));
        assert_eq!(diagnostics.errors().count(), 1, "{diagnostics}");
        assert!(diagnostics.to_string().contains("sku_name"));
    }

    #[test]
    fn metric_id_cannot_be_configured() {
        let diagnostics = RelayNamespace.schema().validate_config(&config(json!({
            "name": "relay",
            "resource_group_name": "rg",
            "location": "westeurope",
            "sku_name": "Standard",
            "metric_id": "x",
        })));
        assert!(diagnostics.has_errors());
    }
}
