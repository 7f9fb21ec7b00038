use async_trait::async_trait;
use azurerm_ids::ResourceId;
use azurerm_sdk::services::network::virtual_networks::{
    self, AddressSpace, DhcpOptions, TagsObject, VirtualNetworkId, VirtualNetworkProperties,
};
use serde_json::Value;
use tracing::debug;

use super::{deleted, ensure_absent, found_or_gone};
use crate::data::ResourceData;
use crate::error::{Error, Result};
use crate::resource::{required_str, state_id, Context, Resource};
use crate::schema::{Attribute, Schema, ValueType};
use crate::{location, tags, validation};

pub const TYPE_NAME: &str = "azurerm_virtual_network";

/// `azurerm_virtual_network`
///
/// Subnets are managed with `azurerm_subnet`, so a full update keeps whatever
/// subnets the service reports instead of sending an empty list.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualNetwork;

fn apply_properties(data: &ResourceData, properties: &mut VirtualNetworkProperties) {
    properties.address_space = Some(AddressSpace {
        address_prefixes: data.get_string_list("address_space"),
    });
    properties.dhcp_options = Some(DhcpOptions {
        dns_servers: data.get_string_list("dns_servers"),
    });
}

#[async_trait]
impl Resource for VirtualNetwork {
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
                "address_space",
                Attribute::new(ValueType::list_of(ValueType::String))
                    .required()
                    .validate(validation::each(validation::cidr()))
                    .description("The address spaces used by the virtual network"),
            )
            .attribute(
                "dns_servers",
                Attribute::new(ValueType::list_of(ValueType::String))
                    .optional()
                    .validate(validation::each(validation::string_is_not_empty())),
            )
            .attribute("tags", tags::schema())
            .attribute(
                "guid",
                Attribute::new(ValueType::String)
                    .computed()
                    .description("The GUID of the virtual network"),
            )
            .attribute("id", Attribute::new(ValueType::String).computed())
    }

    fn validate_import_id(&self, id: &str) -> Result<()> {
        VirtualNetworkId::parse(id)?;
        Ok(())
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let clients = &ctx.clients;
        let id = VirtualNetworkId::new(
            ctx.subscription_id(),
            required_str(data, "resource_group_name")?,
            required_str(data, "name")?,
        );

        ensure_absent(TYPE_NAME, &id, clients.virtual_networks.get(&id).await)?;

        let mut properties = VirtualNetworkProperties::default();
        apply_properties(data, &mut properties);
        let network = virtual_networks::VirtualNetwork {
            location: Some(location::normalize(required_str(data, "location")?)),
            tags: tags::expand(data),
            properties: Some(properties),
            ..Default::default()
        };

        clients
            .virtual_networks
            .create_or_update_then_poll(&id, &network, &ctx.cancel)
            .await
            .map_err(Error::request("creating", &id))?;

        data.set_id(id.id());
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = VirtualNetworkId::parse(state_id(data)?)?;

        let Some(network) = found_or_gone(data, &id, ctx.clients.virtual_networks.get(&id).await)? else {
            return Ok(());
        };

        data.set("name", id.virtual_network_name.as_str());
        data.set("resource_group_name", id.resource_group_name.as_str());
        data.set("location", location::flatten(network.location.as_deref()));

        let properties = network.properties.unwrap_or_default();
        data.set(
            "address_space",
            properties
                .address_space
                .map(|space| space.address_prefixes)
                .unwrap_or_default(),
        );
        data.set(
            "dns_servers",
            properties
                .dhcp_options
                .map(|options| options.dns_servers)
                .unwrap_or_default(),
        );
        data.set(
            "guid",
            properties.resource_guid.map(Value::String).unwrap_or(Value::Null),
        );
        data.set("tags", tags::flatten(network.tags.as_ref()));
        Ok(())
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let clients = &ctx.clients;
        let id = VirtualNetworkId::parse(state_id(data)?)?;

        if data.has_change("address_space") || data.has_change("dns_servers") {
            let mut existing = clients
                .virtual_networks
                .get(&id)
                .await
                .map_err(Error::request("retrieving", &id))?;

            let properties = existing.properties.get_or_insert_with(Default::default);
            apply_properties(data, properties);
            properties.provisioning_state = None;
            if data.has_change("tags") {
                existing.tags = Some(tags::expand(data).unwrap_or_default());
            }

            clients
                .virtual_networks
                .create_or_update_then_poll(&id, &existing, &ctx.cancel)
                .await
                .map_err(Error::request("updating", &id))?;
        } else if data.has_change("tags") {
            debug!(%id, "only tags changed");
            let tags = TagsObject {
                tags: tags::expand(data).unwrap_or_default(),
            };
            clients
                .virtual_networks
                .update_tags(&id, &tags)
                .await
                .map_err(Error::request("updating tags for", &id))?;
        }

        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = VirtualNetworkId::parse(state_id(data)?)?;
        deleted(&id, ctx.clients.virtual_networks.delete_then_poll(&id, &ctx.cancel).await)
    }
}
