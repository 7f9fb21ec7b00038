//! Azure Resource Manager resources, managed declaratively.
//!
//! This crate is a meta-package that re-exports the resource-ID codec, the Resource Manager
//! client and the resource adapters, so a single dependency covers the whole stack.
//!
//! # Features
//!
//! - **provider**: Resource adapters, manifests and the state file (enabled by default)
//! - **yaml**: YAML manifests (enabled by default)
//! - **json**: JSON manifests
//! - **toml**: TOML manifests
//! - **mock**: An in-process Resource Manager for tests
//! - **full**: All features
//!
//! # Examples
//!
//! ```no_run
//! use azurerm::prelude::*;
//!
//! # async fn run() -> azurerm::Result<()> {
//! let config = ProviderConfig::from_env()?;
//! let provider = Provider::new(config)?;
//! provider.configure().await?;
//!
//! let id = ResourceGroupId::new("12345678-1234-9876-4563-123456789012", "example");
//! let state = provider
//!     .import("azurerm_resource_group", &id.to_string(), &TimeoutOverrides::default())
//!     .await?;
//! println!("{}", state.attributes["location"]);
//! # Ok(())
//! # }
//! ```

pub use azurerm_ids::{self as ids};
pub use azurerm_sdk::{self as sdk, prelude as sdk_prelude};

#[cfg(feature = "provider")]
pub use azurerm_provider::{
    self as provider, config, data, error, manifest, resources, schema, state, Error, Result,
};

#[cfg(feature = "mock")]
pub use azurerm_mock as mock;

/// Prelude module that exports commonly used types and functions.
///
/// This module provides a convenient way to import all the necessary
/// components with a single `use azurerm::prelude::*;` statement.
pub mod prelude {
    pub use azurerm_ids::{ResourceGroupId, ResourceId, ScopeId, SubscriptionId};

    pub use azurerm_sdk::prelude::*;

    #[cfg(feature = "provider")]
    pub use azurerm_provider::prelude::*;
}

/// A simpler API for common use cases
#[cfg(feature = "provider")]
pub mod api {
    use std::collections::HashMap;
    use std::path::Path;

    use azurerm_provider::manifest::TemplateError;
    use azurerm_provider::prelude::*;
    use tracing::{info, warn};

    use super::Result;

    /// Apply every resource in `manifest` in order, recording each result in the state file.
    ///
    /// The state is written after every resource, so a failure part way through keeps what
    /// was already applied. Entries in state that the manifest no longer declares are
    /// reported but left alone.
    pub async fn apply_manifest<P: AsRef<Path>>(
        provider: &Provider,
        manifest: &Manifest,
        state_path: P,
    ) -> Result<StateFile> {
        let state_path = state_path.as_ref();
        let mut state = StateFile::load(state_path)?;

        let mut addresses = Vec::with_capacity(manifest.resources.len());
        for (index, resource) in manifest.resources.iter().enumerate() {
            let address = resource
                .address()
                .ok_or(TemplateError::Unaddressable(index))?;

            let prior = state.get(&address).map(|entry| entry.state.clone());
            let applied = provider
                .apply(
                    &resource.resource_type,
                    prior,
                    resource.config.clone(),
                    &resource.timeouts,
                )
                .await?;

            info!(%address, id = %applied.id, "applied");
            state.insert(address.clone(), resource.resource_type.clone(), applied);
            state.save(state_path)?;
            addresses.push(address);
        }

        for orphan in state.orphans(&addresses) {
            warn!(address = orphan, "no longer declared in the manifest, destroy it explicitly to remove it");
        }

        Ok(state)
    }

    /// Load a manifest, merge its provider block with the `ARM_*` environment and apply it.
    ///
    /// The file format is determined by the file extension.
    pub async fn apply_manifest_file<P: AsRef<Path>, S: AsRef<Path>>(
        path: P,
        params: HashMap<String, String>,
        state_path: S,
    ) -> Result<StateFile> {
        let manifest = Manifest::load(path, params)?;
        let config = manifest.provider.clone().merge(ProviderConfig::from_env()?);

        let provider = Provider::new(config)?;
        provider.configure().await?;

        apply_manifest(&provider, &manifest, state_path).await
    }
}
