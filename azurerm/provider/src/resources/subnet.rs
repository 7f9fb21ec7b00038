use async_trait::async_trait;
use azurerm_ids::ResourceId;
use azurerm_sdk::services::network::subnets::{self, SubnetId, SubnetProperties};

use super::{deleted, ensure_absent, found_or_gone};
use crate::data::ResourceData;
use crate::error::{Error, Result};
use crate::resource::{required_str, state_id, Context, Resource};
use crate::schema::{Attribute, Schema, ValueType};
use crate::validation;

pub const TYPE_NAME: &str = "azurerm_subnet";

/// `azurerm_subnet`
#[derive(Debug, Clone, Copy, Default)]
pub struct Subnet;

#[async_trait]
impl Resource for Subnet {
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
                "virtual_network_name",
                Attribute::new(ValueType::String)
                    .required()
                    .force_new()
                    .validate(validation::string_is_not_empty()),
            )
            .attribute(
                "address_prefixes",
                Attribute::new(ValueType::list_of(ValueType::String))
                    .required()
                    .validate(validation::each(validation::cidr())),
            )
            .attribute("id", Attribute::new(ValueType::String).computed())
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        SubnetId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let clients = &ctx.clients;
        let id = SubnetId::new(
            ctx.subscription_id(),
            required_str(data, "resource_group_name")?,
            required_str(data, "virtual_network_name")?,
            required_str(data, "name")?,
        );

        ensure_absent(TYPE_NAME, &id, clients.subnets.get(&id).await)?;

        let subnet = subnets::Subnet {
            properties: Some(SubnetProperties {
                address_prefixes: Some(data.get_string_list("address_prefixes")),
                ..Default::default()
            }),
            ..Default::default()
        };
        clients
            .subnets
            .create_or_update_then_poll(&id, &subnet, &ctx.cancel)
            .await
            .map_err(Error::request("creating", &id))?;

        data.set_id(id.id());
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = SubnetId::parse(state_id(data)?)?;

        let Some(subnet) = found_or_gone(data, &id, ctx.clients.subnets.get(&id).await)? else {
            return Ok(());
        };

        data.set("name", id.subnet_name.as_str());
        data.set("resource_group_name", id.resource_group_name.as_str());
        data.set("virtual_network_name", id.virtual_network_name.as_str());
        data.set(
            "address_prefixes",
            subnet.properties.map(|p| p.prefixes()).unwrap_or_default(),
        );
        Ok(())
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let clients = &ctx.clients;
        let id = SubnetId::parse(state_id(data)?)?;

        if data.has_change("address_prefixes") {
            let mut existing = clients
                .subnets
                .get(&id)
                .await
                .map_err(Error::request("retrieving", &id))?;

            let properties = existing.properties.get_or_insert_with(Default::default);
            properties.address_prefix = None;
            properties.address_prefixes = Some(data.get_string_list("address_prefixes"));
            properties.provisioning_state = None;

            clients
                .subnets
                .create_or_update_then_poll(&id, &existing, &ctx.cancel)
                .await
                .map_err(Error::request("updating", &id))?;
        }

        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = SubnetId::parse(state_id(data)?)?;
        deleted(&id, ctx.clients.subnets.delete_then_poll(&id, &ctx.cancel).await)
    }
}
