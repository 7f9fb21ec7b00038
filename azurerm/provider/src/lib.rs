//! # Azure Resource Manager provider
//!
//! Declarative management of Azure resources: every resource type has a [`schema::Schema`]
//! validated at plan time and async create/read/update/delete handlers driven by
//! [`provider::Provider`], which applies per-operation timeouts and registers the
//! required resource providers.
//!
//! Manifests describing the provider configuration and the resources to manage can be
//! written in YAML (default), JSON or TOML with `${param}` substitution, see [`manifest`].
//!
//! # Features
//!
//! - **yaml**: YAML manifests (enabled by default)
//! - **json**: JSON manifests
//! - **toml**: TOML manifests
//! - **full**: all manifest formats

pub mod config;
pub mod data;
pub mod error;
pub mod location;
pub mod manifest;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod state;
pub mod tags;
pub mod timeouts;
pub mod validation;

pub use error::{Error, Result};

/// Prelude to import the provider, its configuration and the resource model
pub mod prelude {
    pub use super::config::{Features, ProviderConfig, ResourceGroupFeatures};
    pub use super::data::{ResourceData, ResourceState};
    pub use super::manifest::{Manifest, ManifestResource, TemplateFormat};
    pub use super::provider::{Plan, Provider};
    pub use super::resource::{Context, ProviderClients, Resource};
    pub use super::schema::{Attribute, Schema, ValueType};
    pub use super::state::StateFile;
    pub use super::timeouts::{TimeoutOverrides, Timeouts};
}
