//! Shared helpers for running the SDK against the fake control plane.

use std::{sync::Arc, time::Duration};

use azurerm_mock::{MockArm, MockOptions};
use azurerm_sdk::{Client, RetryOptions, StaticTokenAuthorizer};

pub const SUBSCRIPTION: &str = "12345678-1234-9876-4563-123456789012";

/// Start a fake ARM and a client pointed at it with fast retries and polling
pub async fn mock_client(options: MockOptions) -> (MockArm, Client) {
    let arm = MockArm::start_with(options)
        .await
        .expect("failed to start fake ARM");

    let client = Client::new(
        arm.endpoint(),
        Arc::new(StaticTokenAuthorizer::new(arm.token())),
    )
    .with_poll_interval(Duration::from_millis(10))
    .with_retry(RetryOptions {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
    });

    (arm, client)
}

/// Seed an empty resource group
pub fn seed_group(arm: &MockArm, name: &str) {
    arm.insert(
        &format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/{name}"),
        serde_json::json!({ "location": "westeurope" }),
    );
}
