//! The managed resource types.

use std::fmt::Display;
use std::sync::Arc;

use tracing::info;

use crate::data::ResourceData;
use crate::error::{Error, Result};
use crate::resource::Resource;

pub mod relay_hybrid_connection;
pub mod relay_namespace;
pub mod resource_group;
pub mod subnet;
pub mod virtual_network;

pub use relay_hybrid_connection::RelayHybridConnection;
pub use relay_namespace::RelayNamespace;
pub use resource_group::ResourceGroup;
pub use subnet::Subnet;
pub use virtual_network::VirtualNetwork;

/// Every resource type this provider manages
pub fn all() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(ResourceGroup),
        Arc::new(RelayNamespace),
        Arc::new(RelayHybridConnection),
        Arc::new(VirtualNetwork),
        Arc::new(Subnet),
    ]
}

/// Fail creation when a resource with the same ID already exists
pub(crate) fn ensure_absent<T>(
    resource_type: &str,
    id: &impl Display,
    existing: azurerm_sdk::Result<T>,
) -> Result<()> {
    match existing {
        Ok(_) => Err(Error::ImportAsExists {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }),
        Err(e) if e.was_not_found() => Ok(()),
        Err(e) => Err(Error::request("checking for presence of existing", id)(e)),
    }
}

/// The resource read from the API, or `None` after removing it from state when it is gone
pub(crate) fn found_or_gone<T>(
    data: &mut ResourceData,
    id: &impl Display,
    result: azurerm_sdk::Result<T>,
) -> Result<Option<T>> {
    match result {
        Ok(resource) => Ok(Some(resource)),
        Err(e) if e.was_not_found() => {
            info!(%id, "resource was not found, removing from state");
            data.clear_id();
            Ok(None)
        }
        Err(e) => Err(Error::request("retrieving", id)(e)),
    }
}

/// Deleting something that no longer exists counts as success
pub(crate) fn deleted(id: &impl Display, result: azurerm_sdk::Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.was_not_found() => Ok(()),
        Err(e) => Err(Error::request("deleting", id)(e)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn type_names_are_unique() {
        let names: BTreeSet<_> = all().iter().map(|r| r.type_name()).collect();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn resources_without_update_replace_on_every_change() {
        for resource in all().iter().filter(|r| !r.supports_update()) {
            for (name, attribute) in resource.schema().iter() {
                assert!(
                    attribute.is_read_only() || attribute.is_force_new(),
                    "{}.{name} must be force_new",
                    resource.type_name()
                );
            }
        }
    }

    #[test]
    fn every_resource_has_a_name() {
        for resource in all() {
            let name = resource.schema().get("name").cloned();
            assert!(
                name.is_some_and(|n| n.is_required() && n.is_force_new()),
                "{}",
                resource.type_name()
            );
        }
    }
}
