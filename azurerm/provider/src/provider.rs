//! The lifecycle driver tying configuration, schemas and resource handlers together.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use azurerm_sdk::services::resources::providers::ResourceProviderId;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::data::{ResourceData, ResourceState};
use crate::error::{Error, Result};
use crate::resource::{Context, ProviderClients, Resource};
use crate::resources;
use crate::schema::{Diagnostics, Schema};
use crate::timeouts::{TimeoutOverrides, Timeouts};

/// Resource provider namespaces the managed resource types live in
pub const REQUIRED_RESOURCE_PROVIDERS: &[&str] = &["Microsoft.Network", "Microsoft.Relay"];

/// What applying a configuration to an existing resource would do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "attributes", rename_all = "snake_case")]
pub enum Plan {
    Create,
    Update(Vec<String>),
    /// Delete and create again because a `force_new` attribute changed
    Replace(Vec<String>),
    NoOp,
}

/// A configured provider.
///
/// ```no_run
/// use azurerm_provider::prelude::*;
///
/// # async fn run() -> azurerm_provider::Result<()> {
/// let provider = Provider::new(ProviderConfig::from_env()?)?;
/// provider.configure().await?;
///
/// let config = serde_json::json!({"name": "example", "location": "West Europe"});
/// let state = provider
///     .create(
///         "azurerm_resource_group",
///         config.as_object().cloned().unwrap_or_default(),
///         &TimeoutOverrides::default(),
///     )
///     .await?;
/// println!("{}", state.id);
/// # Ok(())
/// # }
/// ```
pub struct Provider {
    config: ProviderConfig,
    clients: Arc<ProviderClients>,
    registry: BTreeMap<&'static str, Arc<dyn Resource>>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("subscription_id", &self.clients.subscription_id)
            .field("resource_types", &self.registry.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Provider {
    /// Validate the configuration and build the API clients
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = config.client()?;
        let subscription_id = config.subscription()?.to_string();
        let clients = ProviderClients::new(client, subscription_id, config.features.clone());

        Ok(Self {
            config,
            clients: Arc::new(clients),
            registry: registry(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn clients(&self) -> &Arc<ProviderClients> {
        &self.clients
    }

    /// Cancelling this token aborts every running operation
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register the resource providers this provider depends on
    #[instrument(skip(self), fields(subscription_id = %self.clients.subscription_id))]
    pub async fn configure(&self) -> Result<()> {
        if self.config.skip_provider_registration {
            debug!("skipping resource provider registration");
            return Ok(());
        }

        let cancel = self.shutdown.child_token();
        for namespace in REQUIRED_RESOURCE_PROVIDERS {
            let id = ResourceProviderId::new(&self.clients.subscription_id, *namespace);
            self.clients
                .providers
                .ensure_registered(&id, &cancel)
                .await
                .map_err(Error::request("registering resource provider", &id))?;
        }

        info!("resource providers registered");
        Ok(())
    }

    pub fn resource(&self, type_name: &str) -> Result<&Arc<dyn Resource>> {
        self.registry
            .get(type_name)
            .ok_or_else(|| Error::UnknownResourceType(type_name.to_string()))
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registry.keys().copied()
    }

    pub fn schema(&self, type_name: &str) -> Result<Schema> {
        Ok(self.resource(type_name)?.schema())
    }

    /// Plan-time validation: fill in defaults, then check the configuration against the schema.
    /// Warnings are logged and returned, errors fail.
    pub fn validate(&self, type_name: &str, config: &mut Map<String, Value>) -> Result<Diagnostics> {
        let schema = self.schema(type_name)?;
        schema.apply_defaults(config);

        let diagnostics = schema.validate_config(config);
        if diagnostics.has_errors() {
            return Err(Error::InvalidConfig {
                resource_type: type_name.to_string(),
                diagnostics,
            });
        }
        for warning in diagnostics.warnings() {
            warn!(resource_type = type_name, attribute = ?warning.attribute, "{}", warning.summary);
        }
        schema.normalize(config);
        Ok(diagnostics)
    }

    /// Compare a configuration with the recorded state
    pub fn plan(
        &self,
        type_name: &str,
        prior: Option<&ResourceState>,
        mut config: Map<String, Value>,
    ) -> Result<Plan> {
        let resource = self.resource(type_name)?;
        self.validate(type_name, &mut config)?;

        let Some(prior) = prior else {
            return Ok(Plan::Create);
        };

        let schema = resource.schema();
        schema.clear_removed(&mut config, &prior.attributes);
        let data = ResourceData::planned(prior.clone(), config);
        let changed: Vec<String> = schema
            .iter()
            .filter(|(name, attribute)| !attribute.is_read_only() && data.has_change(name))
            .map(|(name, _)| name.to_string())
            .collect();

        if changed.is_empty() {
            return Ok(Plan::NoOp);
        }

        let replace = !resource.supports_update()
            || changed
                .iter()
                .any(|name| schema.get(name).is_some_and(|a| a.is_force_new()));
        Ok(if replace {
            Plan::Replace(changed)
        } else {
            Plan::Update(changed)
        })
    }

    #[instrument(skip(self, config, overrides), fields(resource_type = type_name))]
    pub async fn create(
        &self,
        type_name: &str,
        mut config: Map<String, Value>,
        overrides: &TimeoutOverrides,
    ) -> Result<ResourceState> {
        let resource = self.resource(type_name)?;
        self.validate(type_name, &mut config)?;

        let label = config
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("(new resource)")
            .to_string();
        let mut data = ResourceData::new(config);
        let timeout = timeouts(resource, overrides).create;

        let data = self
            .run("create", type_name, &label, timeout, |ctx| async move {
                resource.create(&ctx, &mut data).await?;
                Ok(data)
            })
            .await?;

        let state = data.state().ok_or(Error::Gone { id: label })?;
        info!(id = %state.id, "created");
        Ok(state)
    }

    /// Refresh the state, `None` when the resource no longer exists
    #[instrument(skip(self, state, overrides), fields(resource_type = type_name, id = %state.id))]
    pub async fn read(
        &self,
        type_name: &str,
        state: ResourceState,
        overrides: &TimeoutOverrides,
    ) -> Result<Option<ResourceState>> {
        let resource = self.resource(type_name)?;
        let id = state.id.clone();
        let mut data = ResourceData::from_state(state);
        let timeout = timeouts(resource, overrides).read;

        let data = self
            .run("read", type_name, &id, timeout, |ctx| async move {
                resource.read(&ctx, &mut data).await?;
                Ok(data)
            })
            .await?;

        let state = data.state();
        if state.is_none() {
            info!("resource is gone");
        }
        Ok(state)
    }

    /// Update in place, failing when a `force_new` attribute changed
    #[instrument(skip(self, prior, config, overrides), fields(resource_type = type_name, id = %prior.id))]
    pub async fn update(
        &self,
        type_name: &str,
        prior: ResourceState,
        mut config: Map<String, Value>,
        overrides: &TimeoutOverrides,
    ) -> Result<ResourceState> {
        let resource = self.resource(type_name)?;
        self.validate(type_name, &mut config)?;

        if let Plan::Replace(attributes) = self.plan(type_name, Some(&prior), config.clone())? {
            return Err(Error::RequiresReplacement {
                resource_type: type_name.to_string(),
                attributes,
            });
        }

        resource.schema().clear_removed(&mut config, &prior.attributes);
        let id = prior.id.clone();
        let mut data = ResourceData::planned(prior, config);
        let timeout = timeouts(resource, overrides).update;

        let data = self
            .run("update", type_name, &id, timeout, |ctx| async move {
                resource.update(&ctx, &mut data).await?;
                Ok(data)
            })
            .await?;

        let state = data.state().ok_or(Error::Gone { id })?;
        info!("updated");
        Ok(state)
    }

    #[instrument(skip(self, state, overrides), fields(resource_type = type_name, id = %state.id))]
    pub async fn delete(&self, type_name: &str, state: ResourceState, overrides: &TimeoutOverrides) -> Result<()> {
        let resource = self.resource(type_name)?;
        let id = state.id.clone();
        let mut data = ResourceData::from_state(state);
        let timeout = timeouts(resource, overrides).delete;

        self.run("delete", type_name, &id, timeout, |ctx| async move {
            resource.delete(&ctx, &mut data).await
        })
        .await?;

        info!("deleted");
        Ok(())
    }

    /// Adopt an existing resource by its ID
    #[instrument(skip(self, overrides), fields(resource_type = type_name))]
    pub async fn import(&self, type_name: &str, id: &str, overrides: &TimeoutOverrides) -> Result<ResourceState> {
        let resource = self.resource(type_name)?;
        resource.validate_import_id(id)?;

        let mut data = ResourceData::import(id);
        let timeout = timeouts(resource, overrides).read;

        let data = self
            .run("import", type_name, id, timeout, |ctx| async move {
                resource.read(&ctx, &mut data).await?;
                Ok(data)
            })
            .await?;

        let state = data.state().ok_or_else(|| Error::Gone { id: id.to_string() })?;
        info!(id, "imported");
        Ok(state)
    }

    /// Create, update or replace so that the resource matches `config`
    #[instrument(skip(self, prior, config, overrides), fields(resource_type = type_name))]
    pub async fn apply(
        &self,
        type_name: &str,
        prior: Option<ResourceState>,
        config: Map<String, Value>,
        overrides: &TimeoutOverrides,
    ) -> Result<ResourceState> {
        let plan = self.plan(type_name, prior.as_ref(), config.clone())?;
        debug!(?plan, "planned");

        match (plan, prior) {
            (Plan::Create, _) | (_, None) => self.create(type_name, config, overrides).await,
            (Plan::NoOp, Some(prior)) => match self.read(type_name, prior, overrides).await? {
                Some(state) => Ok(state),
                None => self.create(type_name, config, overrides).await,
            },
            (Plan::Update(_), Some(prior)) => self.update(type_name, prior, config, overrides).await,
            (Plan::Replace(attributes), Some(prior)) => {
                info!(?attributes, "replacing");
                self.delete(type_name, prior, overrides).await?;
                self.create(type_name, config, overrides).await
            }
        }
    }

    /// Run one handler under its deadline with a fresh cancellation token
    async fn run<F, Fut, T>(
        &self,
        operation: &'static str,
        type_name: &str,
        id: &str,
        timeout: Duration,
        handler: F,
    ) -> Result<T>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cancel = self.shutdown.child_token();
        let ctx = Context::new(Arc::clone(&self.clients), cancel.clone());

        match tokio::time::timeout(timeout, handler(ctx)).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                Err(Error::Timeout {
                    operation,
                    resource_type: type_name.to_string(),
                    id: id.to_string(),
                    after: timeout,
                })
            }
        }
    }
}

fn registry() -> BTreeMap<&'static str, Arc<dyn Resource>> {
    resources::all()
        .into_iter()
        .map(|resource| (resource.type_name(), resource))
        .collect()
}

fn timeouts(resource: &Arc<dyn Resource>, overrides: &TimeoutOverrides) -> Timeouts {
    resource.timeouts().with_overrides(overrides)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;

    fn provider() -> Provider {
        let config = ProviderConfig::builder()
            .subscription_id("00000000-0000-0000-0000-000000000000")
            .access_token("token")
            .skip_provider_registration(true)
            .build();
        Provider::new(config).unwrap()
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn group_state() -> ResourceState {
        ResourceState {
            id: "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg".to_string(),
            attributes: map(json!({"name": "rg", "location": "westeurope", "tags": {}})),
        }
    }

    #[test]
    fn lists_every_resource_type() {
        let types: Vec<_> = provider().resource_types().collect();
        assert_eq!(
            types,
            vec![
                "azurerm_relay_hybrid_connection",
                "azurerm_relay_namespace",
                "azurerm_resource_group",
                "azurerm_subnet",
                "azurerm_virtual_network",
            ]
        );
    }

    #[test]
    fn unknown_types_are_reported() {
        let err = provider().schema("azurerm_storage_account").unwrap_err();
        assert!(matches!(err, Error::UnknownResourceType(t) if t == "azurerm_storage_account"));
    }

    #[test]
    fn invalid_config_fails_before_any_request() {
        let err = provider()
            .plan("azurerm_resource_group", None, map(json!({"name": "rg"})))
            .unwrap_err();
        assert!(err.to_string().contains("location"), "{err}");
    }

    #[test]
    fn plans_follow_changes() {
        let provider = provider();
        let plan = |config: Value| {
            provider
                .plan("azurerm_resource_group", Some(&group_state()), map(config))
                .unwrap()
        };

        assert_eq!(plan(json!({"name": "rg", "location": "westeurope"})), Plan::NoOp);
        assert_eq!(
            plan(json!({"name": "rg", "location": "westeurope", "tags": {"env": "dev"}})),
            Plan::Update(vec!["tags".to_string()])
        );
        assert_eq!(
            plan(json!({"name": "rg", "location": "northeurope"})),
            Plan::Replace(vec!["location".to_string()])
        );

        let mut tagged = group_state();
        tagged.attributes.insert("tags".to_string(), json!({"env": "dev"}));
        tagged.attributes.insert("managed_by".to_string(), json!("owner"));
        let untagged = map(json!({"name": "rg", "location": "westeurope"}));
        assert_eq!(
            provider
                .plan("azurerm_resource_group", Some(&tagged), untagged)
                .unwrap(),
            Plan::Update(vec!["managed_by".to_string(), "tags".to_string()])
        );
    }

    #[tokio::test]
    async fn update_refuses_force_new_changes() {
        let err = provider()
            .update(
                "azurerm_resource_group",
                group_state(),
                map(json!({"name": "rg2", "location": "westeurope"})),
                &TimeoutOverrides::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RequiresReplacement { attributes, .. } if attributes == vec!["name"]));
    }

    #[tokio::test]
    async fn deadlines_become_timeout_errors() {
        let provider = provider();
        let err = provider
            .run("read", "azurerm_resource_group", "rg", Duration::from_millis(10), |ctx| async move {
                ctx.cancel.cancelled().await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { operation: "read", .. }));
    }

    #[traced_test]
    #[tokio::test]
    async fn registration_can_be_skipped() {
        provider().configure().await.unwrap();
        assert!(logs_contain("skipping resource provider registration"));
    }
}
