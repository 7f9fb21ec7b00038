use std::{collections::HashMap, path::PathBuf};

use anyhow::{bail, Context as _};
use azurerm::prelude::*;
use serde_json::{Map, Value};
use tokio::signal::ctrl_c;
use tracing::{debug, info, warn};

/// Build and configure a provider, cancelling its operations on Ctrl+C
async fn connect(config: ProviderConfig) -> azurerm::Result<Provider> {
    let provider = Provider::new(config)?;

    let shutdown = provider.shutdown_token();
    tokio::spawn(async move {
        if ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, cancelling running operations...");
            shutdown.cancel();
        }
    });

    provider.configure().await?;
    Ok(provider)
}

fn existing(id: &str) -> ResourceState {
    ResourceState {
        id: id.to_string(),
        attributes: Map::new(),
    }
}

/// The manifest's provider block wins over flags and environment
pub async fn apply(
    file: PathBuf,
    params: HashMap<String, String>,
    state_path: PathBuf,
    flags: ProviderConfig,
) -> anyhow::Result<StateFile> {
    info!("Applying manifest: {}", file.display());
    let manifest = Manifest::load(&file, params).map_err(azurerm::Error::from)?;
    debug!(resources = manifest.resources.len(), "manifest loaded");

    let provider = connect(manifest.provider.clone().merge(flags)).await?;
    let state = azurerm::api::apply_manifest(&provider, &manifest, &state_path).await?;

    info!("State written to {}", state_path.display());
    Ok(state)
}

pub async fn read(resource_type: &str, id: &str, config: ProviderConfig) -> anyhow::Result<ResourceState> {
    let provider = connect(config).await?;
    provider.resource(resource_type)?.validate_import_id(id)?;

    match provider
        .read(resource_type, existing(id), &TimeoutOverrides::default())
        .await?
    {
        Some(state) => Ok(state),
        None => bail!("{id} does not exist"),
    }
}

pub async fn destroy(
    resource_type: &str,
    id: &str,
    state_path: Option<PathBuf>,
    config: ProviderConfig,
) -> anyhow::Result<()> {
    let provider = connect(config).await?;
    provider.resource(resource_type)?.validate_import_id(id)?;

    provider
        .delete(resource_type, existing(id), &TimeoutOverrides::default())
        .await?;
    info!(id, "destroyed");

    let Some(state_path) = state_path else {
        return Ok(());
    };

    let mut state = StateFile::load(&state_path)?;
    let addresses: Vec<String> = state
        .resources
        .iter()
        .filter(|(_, entry)| entry.state.id.eq_ignore_ascii_case(id))
        .map(|(address, _)| address.clone())
        .collect();

    for address in &addresses {
        state.remove(address);
        info!(%address, "removed from state");
    }
    state.save(&state_path)?;
    Ok(())
}

/// Address an imported resource by its `name`, falling back to the last ID segment
fn import_address(resource_type: &str, state: &ResourceState) -> anyhow::Result<String> {
    let key = state
        .attributes
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| state.id.rsplit('/').next())
        .filter(|key| !key.is_empty())
        .with_context(|| format!("cannot derive a state address for {}", state.id))?;
    Ok(format!("{resource_type}.{key}"))
}

pub async fn import(
    resource_type: &str,
    id: &str,
    state_path: Option<PathBuf>,
    config: ProviderConfig,
) -> anyhow::Result<ResourceState> {
    let provider = connect(config).await?;
    let imported = provider
        .import(resource_type, id, &TimeoutOverrides::default())
        .await?;

    if let Some(state_path) = state_path {
        let address = import_address(resource_type, &imported)?;
        let mut state = StateFile::load(&state_path)?;
        if state.get(&address).is_some() {
            bail!("{address} is already recorded in {}", state_path.display());
        }
        state.insert(address.clone(), resource_type, imported.clone());
        state.save(&state_path)?;
        info!(%address, "recorded in state");
    }

    Ok(imported)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn imports_are_addressed_by_name() {
        let state = ResourceState {
            id: "/subscriptions/s/resourceGroups/platform".to_string(),
            attributes: json!({"name": "platform"}).as_object().cloned().unwrap(),
        };
        assert_eq!(
            import_address("azurerm_resource_group", &state).unwrap(),
            "azurerm_resource_group.platform"
        );
    }

    #[test]
    fn nameless_imports_use_the_last_segment() {
        let state = existing("/subscriptions/s/resourceGroups/platform");
        assert_eq!(
            import_address("azurerm_resource_group", &state).unwrap(),
            "azurerm_resource_group.platform"
        );
    }
}
