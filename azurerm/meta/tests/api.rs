use std::collections::HashMap;
use std::time::Duration;

use azurerm::api::apply_manifest;
use azurerm::mock::{MockArm, MockOptions};
use azurerm::prelude::*;
use azurerm::Error;

const SUBSCRIPTION: &str = "12345678-1234-9876-4563-123456789012";

const MANIFEST: &str = r#"
resources:
  - type: azurerm_resource_group
    config:
      name: platform
      location: westeurope
  - type: azurerm_virtual_network
    key: hub
    config:
      name: hub
      resource_group_name: platform
      location: westeurope
      address_space: ["10.0.0.0/16"]
"#;

async fn provider() -> (MockArm, Provider) {
    let arm = MockArm::start_with(MockOptions::default()).await.unwrap();
    let config = ProviderConfig::builder()
        .subscription_id(SUBSCRIPTION)
        .access_token(arm.token())
        .resource_manager_endpoint(arm.endpoint())
        .poll_interval(Duration::from_millis(10))
        .build();
    let provider = Provider::new(config).unwrap();
    provider.configure().await.unwrap();
    (arm, provider)
}

fn manifest() -> Manifest {
    Manifest::from_str(MANIFEST, TemplateFormat::Yaml, HashMap::new()).unwrap()
}

#[tokio::test]
async fn applied_resources_are_recorded_in_state() {
    let (arm, provider) = provider().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("azurerm.state.json");

    let state = apply_manifest(&provider, &manifest(), &state_path).await.unwrap();

    assert_eq!(StateFile::load(&state_path).unwrap(), state);
    let vnet = state.get("azurerm_virtual_network.hub").unwrap();
    assert_eq!(vnet.resource_type, "azurerm_virtual_network");
    assert!(arm.resource(&vnet.state.id).is_some());
}

#[tokio::test]
async fn orphaned_entries_are_kept() {
    let (_arm, provider) = provider().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("azurerm.state.json");

    let mut seeded = StateFile::default();
    seeded.insert(
        "azurerm_resource_group.retired",
        "azurerm_resource_group",
        ResourceState {
            id: format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/retired"),
            ..Default::default()
        },
    );
    seeded.save(&state_path).unwrap();

    let state = apply_manifest(&provider, &manifest(), &state_path).await.unwrap();

    assert_eq!(state.resources.len(), 3);
    assert!(state.get("azurerm_resource_group.retired").is_some());
}

#[tokio::test]
async fn progress_survives_a_failed_resource() {
    let (arm, provider) = provider().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("azurerm.state.json");
    arm.fail_next_operation("InternalServerError", "the network could not be provisioned");

    let err = apply_manifest(&provider, &manifest(), &state_path)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Request { action: "creating", .. }), "{err}");

    let state = StateFile::load(&state_path).unwrap();
    assert!(state.get("azurerm_resource_group.platform").is_some());
    assert!(state.get("azurerm_virtual_network.hub").is_none());
}
