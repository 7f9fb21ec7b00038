//! # Azure Resource Manager SDK
//!
//! A small REST client for the Resource Manager control plane: bearer token
//! authorization, retries for throttled and transient failures, `nextLink`
//! pagination and long running operation polling, plus typed clients for the
//! services this workspace manages.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use azurerm_sdk::prelude::*;
//! use azurerm_sdk::services::resources::resource_groups::ResourceGroupsClient;
//!
//! # async fn run() -> azurerm_sdk::Result<()> {
//! let environment = Environment::public();
//! let authorizer = Arc::new(StaticTokenAuthorizer::new("token"));
//! let client = Client::new(environment.resource_manager.clone(), authorizer);
//!
//! let groups = ResourceGroupsClient::new(client);
//! let group = groups.get(&ResourceGroupId::new("sub", "rg")).await?;
//! println!("{}", group.location);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod enums;
pub mod environment;
pub mod error;
pub mod pager;
pub mod poller;
pub mod services;

pub use auth::{AccessToken, Authorizer, ClientSecretAuthorizer, StaticTokenAuthorizer};
pub use client::{Client, RequestOptions, Response, RetryOptions};
pub use environment::Environment;
pub use error::{Error, ErrorEnvelope, OdataError, Result};
pub use pager::{list_all, ListResult};
pub use poller::{Poller, PollingStrategy};

#[doc(hidden)]
pub mod __private {
    pub use serde;
}

/// Prelude to import the client plumbing and common IDs
pub mod prelude {
    pub use super::auth::{Authorizer, ClientSecretAuthorizer, StaticTokenAuthorizer};
    pub use super::client::{Client, RequestOptions, RetryOptions};
    pub use super::enums::ProvisioningState;
    pub use super::environment::Environment;
    pub use super::poller::Poller;

    pub use azurerm_ids::{ResourceGroupId, ResourceId, SubscriptionId};
    pub use tokio_util::sync::CancellationToken;
}
