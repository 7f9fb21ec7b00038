//! Shared helpers for driving the provider against the fake control plane.

use std::time::Duration;

use azurerm_mock::{MockArm, MockOptions};
use azurerm_provider::prelude::*;
use serde_json::{Map, Value};

pub const SUBSCRIPTION: &str = "12345678-1234-9876-4563-123456789012";

/// Provider configuration pointing at `arm` with a static token and fast polling
pub fn mock_config(arm: &MockArm) -> ProviderConfig {
    ProviderConfig::builder()
        .subscription_id(SUBSCRIPTION)
        .access_token(arm.token())
        .resource_manager_endpoint(arm.endpoint())
        .poll_interval(Duration::from_millis(10))
        .build()
}

/// Start a fake ARM and a configured provider for it
pub async fn mock_provider(options: MockOptions) -> (MockArm, Provider) {
    let arm = MockArm::start_with(options)
        .await
        .expect("failed to start fake ARM");

    let provider = Provider::new(mock_config(&arm)).expect("invalid provider configuration");
    provider.configure().await.expect("provider registration failed");

    (arm, provider)
}

pub fn config(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("configuration must be an object")
}

pub fn group_id(name: &str) -> String {
    format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/{name}")
}
