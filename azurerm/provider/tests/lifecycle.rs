use azurerm_mock::MockOptions;
use azurerm_provider::prelude::*;
use azurerm_provider::Error;
use serde_json::json;

mod common;

use common::{config, group_id, mock_config, mock_provider, SUBSCRIPTION};

fn no_overrides() -> TimeoutOverrides {
    TimeoutOverrides::default()
}

async fn create_group(provider: &Provider, name: &str) -> ResourceState {
    provider
        .create(
            "azurerm_resource_group",
            config(json!({"name": name, "location": "West Europe"})),
            &no_overrides(),
        )
        .await
        .unwrap()
}

async fn create_namespace(provider: &Provider, group: &str, name: &str) -> ResourceState {
    provider
        .create(
            "azurerm_relay_namespace",
            config(json!({
                "name": name,
                "resource_group_name": group,
                "location": "westeurope",
                "sku_name": "Standard",
            })),
            &no_overrides(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn configure_registers_required_resource_providers() {
    let (arm, _provider) = mock_provider(MockOptions::default()).await;

    assert!(arm.is_registered("Microsoft.Relay"));
    assert!(arm.is_registered("Microsoft.Network"));
}

#[tokio::test]
async fn resource_group_lifecycle() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;

    let state = create_group(&provider, "example").await;
    assert_eq!(state.id, group_id("example"));
    assert_eq!(state.attributes["location"], "westeurope");
    assert_eq!(state.attributes["tags"], json!({}));

    let updated = provider
        .update(
            "azurerm_resource_group",
            state.clone(),
            config(json!({"name": "example", "location": "westeurope", "tags": {"env": "dev"}})),
            &no_overrides(),
        )
        .await
        .unwrap();
    assert_eq!(updated.attributes["tags"], json!({"env": "dev"}));
    assert_eq!(arm.resource(&state.id).unwrap()["tags"]["env"], "dev");

    let refreshed = provider
        .read("azurerm_resource_group", updated.clone(), &no_overrides())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed, updated);

    provider
        .delete("azurerm_resource_group", updated.clone(), &no_overrides())
        .await
        .unwrap();
    assert!(arm.resource(&state.id).is_none());

    let gone = provider
        .read("azurerm_resource_group", updated, &no_overrides())
        .await
        .unwrap();
    assert!(gone.is_none());
}

#[tokio::test]
async fn removed_attributes_are_cleared_remotely() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;

    let owner = format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/owner");
    let state = provider
        .create(
            "azurerm_resource_group",
            config(json!({
                "name": "cleared",
                "location": "westeurope",
                "managed_by": owner,
                "tags": {"env": "dev"},
            })),
            &no_overrides(),
        )
        .await
        .unwrap();
    assert_eq!(state.attributes["managed_by"], owner);

    let minimal = config(json!({"name": "cleared", "location": "westeurope"}));
    assert_eq!(
        provider
            .plan("azurerm_resource_group", Some(&state), minimal.clone())
            .unwrap(),
        Plan::Update(vec!["managed_by".to_string(), "tags".to_string()])
    );

    let updated = provider
        .update("azurerm_resource_group", state.clone(), minimal.clone(), &no_overrides())
        .await
        .unwrap();
    assert_eq!(updated.attributes["tags"], json!({}));
    assert!(updated.attributes["managed_by"].is_null());

    let remote = arm.resource(&state.id).unwrap();
    assert_eq!(remote["tags"], json!({}));
    assert!(remote.get("managedBy").map_or(true, |v| v.is_null()));

    assert_eq!(
        provider
            .plan("azurerm_resource_group", Some(&updated), minimal)
            .unwrap(),
        Plan::NoOp
    );
}

#[tokio::test]
async fn existing_resources_must_be_imported() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;
    arm.insert(&group_id("existing"), json!({"location": "westeurope"}));

    let err = provider
        .create(
            "azurerm_resource_group",
            config(json!({"name": "existing", "location": "westeurope"})),
            &no_overrides(),
        )
        .await
        .unwrap_err();

    assert!(matches!(&err, Error::ImportAsExists { id, .. } if *id == group_id("existing")));
    assert!(err.to_string().contains("needs to be imported into the State"));
}

#[tokio::test]
async fn import_adopts_existing_resources() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;
    arm.insert(
        &group_id("adopted"),
        json!({"location": "West Europe", "tags": {"owner": "ops"}}),
    );

    let state = provider
        .import("azurerm_resource_group", &group_id("adopted"), &no_overrides())
        .await
        .unwrap();

    assert_eq!(state.attributes["name"], "adopted");
    assert_eq!(state.attributes["location"], "westeurope");
    assert_eq!(state.attributes["tags"]["owner"], "ops");
}

#[tokio::test]
async fn import_validates_the_id_before_calling_the_api() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;
    let before = arm.requests().len();

    let err = provider
        .import(
            "azurerm_resource_group",
            &format!("/subscriptions/{SUBSCRIPTION}/resourcegroups/lower"),
            &no_overrides(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Id(_)));
    assert_eq!(arm.requests().len(), before);
}

#[tokio::test]
async fn importing_a_missing_resource_fails() {
    let (_arm, provider) = mock_provider(MockOptions::default()).await;

    let err = provider
        .import("azurerm_resource_group", &group_id("nothing"), &no_overrides())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Gone { .. }));
}

#[tokio::test]
async fn non_empty_groups_are_not_deleted() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;
    let group = create_group(&provider, "busy").await;
    let namespace = create_namespace(&provider, "busy", "relay").await;

    let err = provider
        .delete("azurerm_resource_group", group.clone(), &no_overrides())
        .await
        .unwrap_err();

    match &err {
        Error::ResourceGroupNotEmpty { resources, .. } => assert!(resources.contains(&namespace.id)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("prevent_deletion_if_contains_resources"));
    assert!(arm.resource(&group.id).is_some());
}

#[tokio::test]
async fn non_empty_groups_are_deleted_when_the_feature_is_off() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;
    let group = create_group(&provider, "busy").await;
    let namespace = create_namespace(&provider, "busy", "relay").await;

    let mut config = mock_config(&arm);
    config.skip_provider_registration = true;
    config.features.resource_group.prevent_deletion_if_contains_resources = false;
    let permissive = Provider::new(config).unwrap();

    permissive
        .delete("azurerm_resource_group", group.clone(), &no_overrides())
        .await
        .unwrap();

    assert!(arm.resource(&group.id).is_none());
    assert!(arm.resource(&namespace.id).is_none());
}

#[tokio::test]
async fn relay_namespace_and_hybrid_connection() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;
    create_group(&provider, "relay-rg").await;
    let namespace = create_namespace(&provider, "relay-rg", "relay").await;

    assert_eq!(namespace.attributes["sku_name"], "Standard");
    assert_eq!(namespace.attributes["metric_id"], format!("{SUBSCRIPTION}:relay"));

    let hc_config = json!({
        "name": "hc",
        "resource_group_name": "relay-rg",
        "relay_namespace_name": "relay",
    });
    let connection = provider
        .create("azurerm_relay_hybrid_connection", config(hc_config.clone()), &no_overrides())
        .await
        .unwrap();
    assert_eq!(
        connection.id,
        format!("{}/hybridConnections/hc", namespace.id)
    );
    assert_eq!(connection.attributes["requires_client_authorization"], true);

    let mut with_metadata = hc_config;
    with_metadata["user_metadata"] = json!("team=integration");
    let updated = provider
        .update(
            "azurerm_relay_hybrid_connection",
            connection.clone(),
            config(with_metadata.clone()),
            &no_overrides(),
        )
        .await
        .unwrap();
    assert_eq!(updated.attributes["user_metadata"], "team=integration");
    assert_eq!(
        arm.resource(&connection.id).unwrap()["properties"]["userMetadata"],
        "team=integration"
    );

    let mut no_auth = with_metadata;
    no_auth["requires_client_authorization"] = json!(false);
    let plan = provider
        .plan("azurerm_relay_hybrid_connection", Some(&updated), config(no_auth))
        .unwrap();
    assert_eq!(plan, Plan::Replace(vec!["requires_client_authorization".to_string()]));
}

#[tokio::test]
async fn nested_resources_need_their_parent() {
    let (_arm, provider) = mock_provider(MockOptions::default()).await;

    let err = provider
        .create(
            "azurerm_relay_namespace",
            config(json!({
                "name": "orphan",
                "resource_group_name": "missing",
                "location": "westeurope",
                "sku_name": "Standard",
            })),
            &no_overrides(),
        )
        .await
        .unwrap_err();

    assert!(matches!(&err, Error::Request { action: "creating", .. }), "{err}");
    assert!(err
        .to_string()
        .starts_with(&format!("creating {}/providers/Microsoft.Relay/namespaces/orphan", group_id("missing"))));
}

#[tokio::test]
async fn virtual_network_and_subnet() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;
    create_group(&provider, "net").await;

    let vnet_config = json!({
        "name": "vnet",
        "resource_group_name": "net",
        "location": "westeurope",
        "address_space": ["10.0.0.0/16"],
    });
    let vnet = provider
        .create("azurerm_virtual_network", config(vnet_config.clone()), &no_overrides())
        .await
        .unwrap();
    let guid = vnet.attributes["guid"].as_str().unwrap().to_string();
    assert!(!guid.is_empty());
    assert_eq!(vnet.attributes["dns_servers"], json!([]));

    let subnet = provider
        .create(
            "azurerm_subnet",
            config(json!({
                "name": "internal",
                "resource_group_name": "net",
                "virtual_network_name": "vnet",
                "address_prefixes": ["10.0.1.0/24"],
            })),
            &no_overrides(),
        )
        .await
        .unwrap();
    assert_eq!(subnet.id, format!("{}/subnets/internal", vnet.id));
    assert_eq!(subnet.attributes["address_prefixes"], json!(["10.0.1.0/24"]));

    let mut with_dns = vnet_config;
    with_dns["dns_servers"] = json!(["10.0.0.4"]);
    let updated = provider
        .update("azurerm_virtual_network", vnet, config(with_dns), &no_overrides())
        .await
        .unwrap();
    assert_eq!(updated.attributes["dns_servers"], json!(["10.0.0.4"]));
    assert_eq!(updated.attributes["guid"], guid);
    assert!(arm.resource(&subnet.id).is_some());
}

#[tokio::test]
async fn failed_operations_surface_the_service_error() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;
    create_group(&provider, "net").await;
    arm.fail_next_operation("InvalidAddressSpace", "the address space overlaps");

    let err = provider
        .create(
            "azurerm_virtual_network",
            config(json!({
                "name": "vnet",
                "resource_group_name": "net",
                "location": "westeurope",
                "address_space": ["10.0.0.0/16"],
            })),
            &no_overrides(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.sdk_error().and_then(|e| e.code()), Some("InvalidAddressSpace"));
    assert!(err.to_string().contains("the address space overlaps"), "{err}");
}

#[tokio::test]
async fn apply_converges_on_the_configuration() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;
    let desired = |location: &str, env: &str| {
        config(json!({"name": "converge", "location": location, "tags": {"env": env}}))
    };

    let created = provider
        .apply("azurerm_resource_group", None, desired("westeurope", "dev"), &no_overrides())
        .await
        .unwrap();

    let unchanged = provider
        .apply(
            "azurerm_resource_group",
            Some(created.clone()),
            desired("westeurope", "dev"),
            &no_overrides(),
        )
        .await
        .unwrap();
    assert_eq!(unchanged, created);

    let retagged = provider
        .apply(
            "azurerm_resource_group",
            Some(unchanged),
            desired("westeurope", "prod"),
            &no_overrides(),
        )
        .await
        .unwrap();
    assert_eq!(retagged.attributes["tags"]["env"], "prod");

    let moved = provider
        .apply(
            "azurerm_resource_group",
            Some(retagged),
            desired("northeurope", "prod"),
            &no_overrides(),
        )
        .await
        .unwrap();
    assert_eq!(moved.attributes["location"], "northeurope");
    assert_eq!(arm.resource(&moved.id).unwrap()["location"], "northeurope");
}

#[tokio::test]
async fn invalid_configuration_never_reaches_the_api() {
    let (arm, provider) = mock_provider(MockOptions::default()).await;
    let before = arm.requests().len();

    let err = provider
        .create(
            "azurerm_virtual_network",
            config(json!({
                "name": "vnet",
                "resource_group_name": "net",
                "location": "westeurope",
                "address_space": ["not-a-cidr"],
                "subnets": [],
            })),
            &no_overrides(),
        )
        .await
        .unwrap_err();

    match err {
        Error::InvalidConfig { diagnostics, .. } => assert_eq!(diagnostics.errors().count(), 2),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(arm.requests().len(), before);
}
