use azurerm::ids::{example_id, ParseError, ResourceGroupId, ResourceId, ScopeId, SubscriptionId};
use azurerm::sdk::services::network::{subnets::SubnetId, virtual_networks::VirtualNetworkId};
use azurerm::sdk::services::relay::{hybrid_connections::HybridConnectionId, namespaces::NamespaceId};
use azurerm::sdk::services::resources::providers::ResourceProviderId;
use serde_json::{Map, Value};

type ParseFn = fn(&str, bool) -> Result<Value, ParseError>;

/// ID kinds accepted by `azurerm id parse --type`
pub const ID_KINDS: &[(&str, ParseFn, fn() -> String)] = &[
    ("subscription", parse_as::<SubscriptionId>, example::<SubscriptionId>),
    ("resource_group", parse_as::<ResourceGroupId>, example::<ResourceGroupId>),
    ("scope", parse_as::<ScopeId>, example::<ScopeId>),
    ("resource_provider", parse_as::<ResourceProviderId>, example::<ResourceProviderId>),
    ("relay_namespace", parse_as::<NamespaceId>, example::<NamespaceId>),
    ("relay_hybrid_connection", parse_as::<HybridConnectionId>, example::<HybridConnectionId>),
    ("virtual_network", parse_as::<VirtualNetworkId>, example::<VirtualNetworkId>),
    ("subnet", parse_as::<SubnetId>, example::<SubnetId>),
];

/// The canonical ID followed by every value segment, in template order
fn parse_as<T: ResourceId>(input: &str, insensitively: bool) -> Result<Value, ParseError> {
    let id = if insensitively {
        T::parse_insensitively(input)?
    } else {
        T::parse(input)?
    };

    let mut parsed = Map::new();
    parsed.insert("id".to_string(), Value::String(id.id()));
    for segment in T::segments().iter().filter(|s| s.is_value()) {
        if let Some(value) = id.segment_value(segment.name()) {
            parsed.insert(segment.name().to_string(), Value::String(value.to_string()));
        }
    }
    Ok(Value::Object(parsed))
}

fn example<T: ResourceId>() -> String {
    example_id(&T::segments())
}

pub fn parse(kind: &str, input: &str, insensitively: bool) -> anyhow::Result<Value> {
    let (_, parse, _) = ID_KINDS
        .iter()
        .find(|(name, _, _)| *name == kind)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "unknown ID type {kind:?}, expected one of: {}",
                ID_KINDS.iter().map(|(name, _, _)| *name).collect::<Vec<_>>().join(", ")
            )
        })?;

    Ok(parse(input, insensitively)?)
}
