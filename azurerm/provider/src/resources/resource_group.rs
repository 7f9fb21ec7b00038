use std::time::Duration;

use async_trait::async_trait;
use azurerm_ids::{ResourceGroupId, ResourceId};
use azurerm_sdk::services::resources::resource_groups::{self, ResourceGroupPatchable};
use serde_json::Value;
use tracing::{debug, info};

use super::{deleted, ensure_absent, found_or_gone};
use crate::data::ResourceData;
use crate::error::{Error, Result};
use crate::resource::{required_str, state_id, Context, Resource};
use crate::schema::{Attribute, Schema, ValueType};
use crate::timeouts::Timeouts;
use crate::{location, tags, validation};

pub const TYPE_NAME: &str = "azurerm_resource_group";

/// `azurerm_resource_group`
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceGroup;

#[async_trait]
impl Resource for ResourceGroup {
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
                    .validate(validation::resource_group_name())
                    .description("The name of the Resource Group"),
            )
            .attribute("location", location::schema())
            .attribute(
                "managed_by",
                Attribute::new(ValueType::String)
                    .optional()
                    .validate(validation::string_is_not_empty())
                    .description("The ID of the resource or application that manages this Resource Group"),
            )
            .attribute("tags", tags::schema())
            .attribute("id", Attribute::new(ValueType::String).computed())
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            create: Duration::from_secs(90 * 60),
            update: Duration::from_secs(90 * 60),
            delete: Duration::from_secs(90 * 60),
            ..Timeouts::default()
        }
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        ResourceGroupId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let clients = &ctx.clients;
        let id = ResourceGroupId::new(ctx.subscription_id(), required_str(data, "name")?);

        ensure_absent(TYPE_NAME, &id, clients.resource_groups.get(&id).await)?;

        let group = resource_groups::ResourceGroup {
            location: location::normalize(required_str(data, "location")?),
            managed_by: data.get_str("managed_by").map(str::to_string),
            tags: tags::expand(data),
            ..Default::default()
        };
        clients
            .resource_groups
            .create_or_update(&id, &group)
            .await
            .map_err(Error::request("creating", &id))?;

        data.set_id(id.id());
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = ResourceGroupId::parse(state_id(data)?)?;

        let Some(group) = found_or_gone(data, &id, ctx.clients.resource_groups.get(&id).await)? else {
            return Ok(());
        };

        data.set("name", id.resource_group_name.as_str());
        data.set("location", location::flatten(Some(&group.location)));
        data.set(
            "managed_by",
            group.managed_by.map(Value::String).unwrap_or(Value::Null),
        );
        data.set("tags", tags::flatten(group.tags.as_ref()));
        Ok(())
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = ResourceGroupId::parse(state_id(data)?)?;

        let mut patch = ResourceGroupPatchable::default();
        if data.has_change("managed_by") {
            patch.managed_by = Some(data.get_str("managed_by").map(str::to_string));
        }
        if data.has_change("tags") {
            patch.tags = Some(tags::expand(data).unwrap_or_default());
        }

        if patch != ResourceGroupPatchable::default() {
            ctx.clients
                .resource_groups
                .update(&id, &patch)
                .await
                .map_err(Error::request("updating", &id))?;
        }

        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let clients = &ctx.clients;
        let id = ResourceGroupId::parse(state_id(data)?)?;

        if clients.features.resource_group.prevent_deletion_if_contains_resources {
            let resources = match clients.resource_groups.list_resources(&id).await {
                Ok(resources) => resources,
                Err(e) if e.was_not_found() => return Ok(()),
                Err(e) => return Err(Error::request("listing resources in", &id)(e)),
            };

            if !resources.is_empty() {
                return Err(Error::ResourceGroupNotEmpty {
                    id: id.id(),
                    resources: resources.into_iter().map(|r| r.id).collect(),
                });
            }
            debug!(%id, "resource group is empty");
        }

        deleted(&id, clients.resource_groups.delete_then_poll(&id, &ctx.cancel).await)?;
        info!(%id, "resource group deleted");
        Ok(())
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
    fn schema_accepts_minimal_config() {
        let diagnostics = ResourceGroup
            .schema()
            .validate_config(&config(json!({"name": "rg", "location": "West Europe"})));
        assert!(diagnostics.is_empty(), "{diagnostics}");
    }

    #[test]
    fn schema_rejects_bad_names_and_computed_id() {
        let diagnostics = ResourceGroup.schema().validate_config(&config(json!({
            "name": "rg.",
            "location": "westeurope",
            "id": "/subscriptions/s/resourceGroups/rg",
        })));
        assert_eq!(diagnostics.errors().count(), 2, "{diagnostics}");
    }

    #[test]
    fn import_ids_are_parsed_strictly() {
        assert!(ResourceGroup
            .validate_import_id("/subscriptions/s/resourceGroups/rg")
            .is_ok());
        assert!(ResourceGroup
            .validate_import_id("/subscriptions/s/resourcegroups/rg")
            .is_err());
    }
}
